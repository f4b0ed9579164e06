use logos::Logos;
use wf_core::{Token, TokenKind};

/// Raw logos token. Every byte of valid input belongs to exactly one token, so
/// concatenating the token texts reproduces the source.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    #[regex(r"#[^\n]*")]
    Comment,

    #[regex(r#""[^"\n]*""#)]
    Str,

    #[regex(r#""[^"\n]*"#)]
    UnterminatedStr,

    #[regex(r"[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?")]
    Number,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.\-]*")]
    Word,

    #[token("(")]
    OpenEntity,

    #[token(")")]
    CloseEntity,

    #[token("[")]
    OpenTuple,

    #[token("]")]
    CloseTuple,

    #[regex(r"[ \t\r]+")]
    Space,

    #[token("\n")]
    EndOfLine,
}

/// A lexer error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// Byte range of the erroneous input in the source.
    pub span: std::ops::Range<usize>,
    /// 1-based line of the error.
    pub line: usize,
    /// Human-readable description of the lexer error.
    pub message: String,
}

/// Lex one file into owned tokens tagged with `file` and `include_depth`.
///
/// Lexing continues past errors to collect as many as possible; the caller
/// decides whether any error is fatal.
pub fn lex(source: &str, file: usize, include_depth: u32) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = RawToken::lexer(source);
    let mut line = 1;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice();
        let (kind, text) = match result {
            Ok(RawToken::Comment) => (TokenKind::Comment, slice),
            Ok(RawToken::Str) => (TokenKind::String, &slice[1..slice.len() - 1]),
            Ok(RawToken::UnterminatedStr) => {
                errors.push(LexError {
                    span,
                    line,
                    message: "unterminated string (missing closing \")".to_string(),
                });
                continue;
            }
            Ok(RawToken::Number) => (TokenKind::Number, slice),
            Ok(RawToken::Word) => (TokenKind::Word, slice),
            Ok(RawToken::OpenEntity) => (TokenKind::OpenEntity, slice),
            Ok(RawToken::CloseEntity) => (TokenKind::CloseEntity, slice),
            Ok(RawToken::OpenTuple) => (TokenKind::OpenTuple, slice),
            Ok(RawToken::CloseTuple) => (TokenKind::CloseTuple, slice),
            Ok(RawToken::Space) => (TokenKind::Space, slice),
            Ok(RawToken::EndOfLine) => (TokenKind::EndOfLine, slice),
            Err(()) => {
                errors.push(LexError {
                    span,
                    line,
                    message: format!("unexpected character: {slice:?}"),
                });
                continue;
            }
        };
        tokens.push(
            Token::new(kind, text)
                .with_depth(include_depth)
                .with_line(line)
                .with_origin(file, span),
        );
        if kind == TokenKind::EndOfLine {
            line += 1;
        }
    }

    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = lex(source, 0, 0);
        assert!(errors.is_empty(), "errors: {errors:?}");
        tokens.iter().map(|t| t.kind).collect()
    }

    fn render(tokens: &[Token]) -> String {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn lex_property_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("color \"black\" # paint\n"),
            vec![Word, Space, String, Space, Comment, EndOfLine]
        );
    }

    #[test]
    fn lex_entity_and_tuple() {
        use TokenKind::*;
        assert_eq!(
            kinds("wall(pose [1 -2.5 3e2])"),
            vec![
                Word, OpenEntity, Word, Space, OpenTuple, Number, Space, Number, Space, Number,
                CloseTuple, CloseEntity
            ]
        );
    }

    #[test]
    fn string_text_excludes_quotes() {
        let (tokens, _) = lex("\"bitmaps/cave.png\"", 0, 0);
        assert_eq!(tokens[0].text, "bitmaps/cave.png");
        assert_eq!(tokens[0].to_string(), "\"bitmaps/cave.png\"");
    }

    #[test]
    fn words_may_contain_dots_and_dashes() {
        let (tokens, errors) = lex("ctrl_wander.v2-beta", 0, 0);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Word);
    }

    #[test]
    fn lines_advance_on_newlines() {
        let (tokens, _) = lex("a 1\n\nb 2\n", 0, 0);
        let lines: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn tokens_carry_depth_and_origin() {
        let (tokens, _) = lex("x 1", 4, 2);
        assert_eq!(tokens[2].include_depth, 2);
        let origin = tokens[2].origin.as_ref().unwrap();
        assert_eq!(origin.file, 4);
        assert_eq!(origin.span, 2..3);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let (_, errors) = lex("name \"wall1\nsize 3", 0, 0);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
        assert!(errors[0].message.contains("unterminated string"));
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let (_, errors) = lex("a 1\nb @", 0, 0);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert_eq!(errors[0].span, 6..7);
    }

    #[test]
    fn crlf_is_preserved() {
        let source = "a 1\r\nb 2\r\n";
        let (tokens, errors) = lex(source, 0, 0);
        assert!(errors.is_empty());
        assert_eq!(render(&tokens), source);
    }

    proptest! {
        #[test]
        fn lexing_is_lossless(source in r#"([a-df-z_]{1,6}|[0-9]{1,3}(\.[0-9]{1,2})?|"[a-z ]{0,5}"|#[a-z ]{0,8}|[ \t]{1,3}|\n|[()\[\]]){0,40}"#) {
            let (tokens, errors) = lex(&source, 0, 0);
            prop_assert!(errors.is_empty(), "errors: {errors:?}");
            prop_assert_eq!(render(&tokens), source);
        }
    }
}

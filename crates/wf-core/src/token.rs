use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Stable index of a token in a [`TokenSeq`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub usize);

impl TokenId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// `#` up to (not including) the end of the line.
    Comment,
    /// Bare word: entity types, property names, unquoted values.
    Word,
    /// Numeric literal.
    Number,
    /// Quoted string; the token text excludes the quotes.
    String,
    /// `(`
    OpenEntity,
    /// `)`
    CloseEntity,
    /// `[`
    OpenTuple,
    /// `]`
    CloseTuple,
    /// A run of spaces, tabs, or carriage returns.
    Space,
    /// A single `\n`.
    EndOfLine,
}

impl TokenKind {
    /// Tokens kept only for formatting: whitespace, comments, and line ends.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Comment | Self::Space | Self::EndOfLine)
    }

    /// Tokens that can appear as a property value.
    pub fn is_value(self) -> bool {
        matches!(self, Self::Word | Self::Number | Self::String)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Comment => "comment",
            Self::Word => "word",
            Self::Number => "number",
            Self::String => "string",
            Self::OpenEntity => "'('",
            Self::CloseEntity => "')'",
            Self::OpenTuple => "'['",
            Self::CloseTuple => "']'",
            Self::Space => "space",
            Self::EndOfLine => "end of line",
        };
        write!(f, "{name}")
    }
}

/// Where a token was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOrigin {
    /// Index of the source file in the loader's source map.
    pub file: usize,
    /// Byte range of the token within that file.
    pub span: Range<usize>,
}

/// A single lexical unit. The text is mutable so writes can edit values in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Lexical class.
    pub kind: TokenKind,
    /// Token text. String tokens hold their contents without quotes.
    pub text: String,
    /// 0 for the loaded file, n for a file reached through n nested includes.
    pub include_depth: u32,
    /// 1-based line the token started on (0 for synthesized tokens).
    pub line: usize,
    /// Source location, absent for tokens created at runtime.
    pub origin: Option<TokenOrigin>,
}

impl Token {
    /// Create a synthesized token with no source location.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            include_depth: 0,
            line: 0,
            origin: None,
        }
    }

    /// Set the include depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.include_depth = depth;
        self
    }

    /// Set the line number.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Set the source location.
    pub fn with_origin(mut self, file: usize, span: Range<usize>) -> Self {
        self.origin = Some(TokenOrigin { file, span });
        self
    }
}

/// Writes the token exactly as it appears on disk.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "\"{}\"", self.text),
            _ => f.write_str(&self.text),
        }
    }
}

/// Append-only token arena plus the ordered layout used for saving.
///
/// Ids are arena indices and never move. The layout lists the ids in on-disk
/// order; tokens synthesized at runtime are spliced into it, and tokens that have
/// no place in the file stay in the arena only ("detached").
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenSeq {
    tokens: Vec<Token>,
    layout: Vec<TokenId>,
    /// Layout position of each arena id, `None` while detached.
    #[serde(skip)]
    positions: Vec<Option<usize>>,
}

impl TokenSeq {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token to the arena and the end of the layout.
    pub fn push(&mut self, token: Token) -> TokenId {
        let id = self.alloc(token);
        self.positions[id.0] = Some(self.layout.len());
        self.layout.push(id);
        id
    }

    /// Add a token to the arena without placing it in the layout.
    pub fn alloc(&mut self, token: Token) -> TokenId {
        let id = TokenId(self.tokens.len());
        self.tokens.push(token);
        self.positions.push(None);
        id
    }

    /// Append tokens to the end of the layout.
    pub fn append(&mut self, tokens: impl IntoIterator<Item = Token>) -> Vec<TokenId> {
        tokens.into_iter().map(|t| self.push(t)).collect()
    }

    /// Insert tokens into the layout right before `anchor`.
    ///
    /// If `anchor` is not laid out the tokens are allocated detached.
    pub fn insert_before(
        &mut self,
        anchor: TokenId,
        tokens: impl IntoIterator<Item = Token>,
    ) -> Vec<TokenId> {
        let at = self.position(anchor);
        self.splice_at(at, tokens)
    }

    /// Insert tokens into the layout right after `anchor`.
    ///
    /// If `anchor` is not laid out the tokens are allocated detached.
    pub fn insert_after(
        &mut self,
        anchor: TokenId,
        tokens: impl IntoIterator<Item = Token>,
    ) -> Vec<TokenId> {
        let at = self.position(anchor).map(|p| p + 1);
        self.splice_at(at, tokens)
    }

    fn splice_at(
        &mut self,
        at: Option<usize>,
        tokens: impl IntoIterator<Item = Token>,
    ) -> Vec<TokenId> {
        let ids: Vec<TokenId> = tokens.into_iter().map(|t| self.alloc(t)).collect();
        if let Some(at) = at {
            for pos in self.positions.iter_mut().flatten() {
                if *pos >= at {
                    *pos += ids.len();
                }
            }
            for (offset, id) in ids.iter().enumerate() {
                self.positions[id.0] = Some(at + offset);
            }
            self.layout.splice(at..at, ids.iter().copied());
        }
        ids
    }

    /// Look up a token.
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0)
    }

    /// Look up a token mutably.
    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(id.0)
    }

    /// Token text, if the id is in bounds.
    pub fn text(&self, id: TokenId) -> Option<&str> {
        self.get(id).map(|t| t.text.as_str())
    }

    /// Replace a token's kind and text. Returns `false` if the id is out of bounds.
    pub fn set(&mut self, id: TokenId, kind: TokenKind, text: impl Into<String>) -> bool {
        match self.tokens.get_mut(id.0) {
            Some(token) => {
                token.kind = kind;
                token.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Number of tokens in the arena (laid out or not).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if the arena holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens in the layout.
    pub fn layout_len(&self) -> usize {
        self.layout.len()
    }

    /// Position of a token in the layout.
    pub fn position(&self, id: TokenId) -> Option<usize> {
        self.positions.get(id.0).copied().flatten()
    }

    /// Token at a layout position.
    pub fn id_at(&self, position: usize) -> Option<TokenId> {
        self.layout.get(position).copied()
    }

    /// Returns `true` if the token is part of the layout.
    pub fn is_laid_out(&self, id: TokenId) -> bool {
        self.position(id).is_some()
    }

    /// All tokens in arena order.
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens in layout (on-disk) order.
    pub fn layout(&self) -> impl Iterator<Item = (TokenId, &Token)> + '_ {
        self.layout.iter().map(|&id| (id, &self.tokens[id.0]))
    }

    /// Remove every token.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.layout.clear();
        self.positions.clear();
    }
}

impl FromIterator<Token> for TokenSeq {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        let mut seq = Self::new();
        seq.append(iter);
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(seq: &TokenSeq) -> String {
        seq.layout().map(|(_, t)| t.to_string()).collect()
    }

    fn sample() -> TokenSeq {
        [
            Token::new(TokenKind::Word, "name"),
            Token::new(TokenKind::Space, " "),
            Token::new(TokenKind::String, "wall1"),
            Token::new(TokenKind::EndOfLine, "\n"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn string_tokens_render_quoted() {
        assert_eq!(render(&sample()), "name \"wall1\"\n");
    }

    #[test]
    fn insert_before_keeps_ids_stable() {
        let mut seq = sample();
        let eol = TokenId(3);
        let ids = seq.insert_before(
            eol,
            [
                Token::new(TokenKind::Space, " "),
                Token::new(TokenKind::Comment, "# note"),
            ],
        );
        assert_eq!(ids, vec![TokenId(4), TokenId(5)]);
        assert_eq!(seq.text(TokenId(2)), Some("wall1"));
        assert_eq!(render(&seq), "name \"wall1\" # note\n");
        assert_eq!(seq.position(eol), Some(5));
    }

    #[test]
    fn insert_after_places_tokens_following_anchor() {
        let mut seq = sample();
        seq.insert_after(TokenId(0), [Token::new(TokenKind::Space, "  ")]);
        assert_eq!(render(&seq), "name   \"wall1\"\n");
    }

    #[test]
    fn positions_follow_repeated_splices() {
        let mut seq = sample();
        for i in 0..50 {
            let eol = TokenId(3);
            seq.insert_before(eol, [Token::new(TokenKind::Number, i.to_string())]);
            seq.insert_after(TokenId(0), [Token::new(TokenKind::Space, " ")]);
        }
        for (at, (id, _)) in seq.layout().enumerate() {
            assert_eq!(seq.position(id), Some(at));
        }
        assert_eq!(seq.position(TokenId(3)), Some(seq.layout_len() - 1));
        let lone = seq.alloc(Token::new(TokenKind::Number, "1"));
        assert_eq!(seq.position(lone), None);
        seq.clear();
        assert_eq!(seq.position(TokenId(0)), None);
    }

    #[test]
    fn detached_tokens_are_not_laid_out() {
        let mut seq = sample();
        let lone = seq.alloc(Token::new(TokenKind::Number, "1"));
        assert!(!seq.is_laid_out(lone));
        let more = seq.insert_before(lone, [Token::new(TokenKind::Number, "2")]);
        assert!(!seq.is_laid_out(more[0]));
        assert_eq!(seq.len(), 6);
        assert_eq!(seq.layout_len(), 4);
        assert_eq!(render(&seq), "name \"wall1\"\n");
    }

    #[test]
    fn set_rewrites_kind_and_text() {
        let mut seq = sample();
        assert!(seq.set(TokenId(2), TokenKind::Word, "black"));
        assert_eq!(render(&seq), "name black\n");
        assert!(!seq.set(TokenId(99), TokenKind::Word, "x"));
    }

    #[test]
    fn trivia_and_value_classes() {
        assert!(TokenKind::Space.is_trivia());
        assert!(TokenKind::Comment.is_trivia());
        assert!(!TokenKind::Word.is_trivia());
        assert!(TokenKind::String.is_value());
        assert!(!TokenKind::OpenTuple.is_value());
    }
}

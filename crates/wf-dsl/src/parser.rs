use log::trace;
use wf_core::{
    Anchor, EntityId, EntityStore, Macro, MacroId, MacroTable, PropertyId, Token, TokenId,
    TokenKind, WfError,
};

use crate::config::LoadConfig;
use crate::error::ParseError;

/// Parse a token sequence into `store` and `macros`.
///
/// `tokens` must be in on-disk order, which holds for a freshly loaded sequence.
/// The global entity must already exist; top-level properties attach to it and
/// top-level entities become its children. Macro expansion and entity nesting
/// are bounded by `config`. On error, everything parsed so far stays in the store.
pub fn parse(
    tokens: &[Token],
    store: &mut EntityStore,
    macros: &mut MacroTable,
    config: &LoadConfig,
) -> Result<(), ParseError> {
    Parser {
        tokens,
        store,
        macros,
        max_macro_depth: config.max_macro_depth,
        max_nesting_depth: config.max_nesting_depth,
        expanding: Vec::new(),
        nesting: 0,
    }
    .parse_file()
}

struct Parser<'a> {
    tokens: &'a [Token],
    store: &'a mut EntityStore,
    macros: &'a mut MacroTable,
    max_macro_depth: usize,
    max_nesting_depth: usize,
    /// Macros currently being expanded, innermost last.
    expanding: Vec<MacroId>,
    /// Entity bodies currently open.
    nesting: usize,
}

impl Parser<'_> {
    fn parse_file(&mut self) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let mut i = 0;
        while let Some(j) = self.next_significant(i) {
            i = match tokens[j].kind {
                TokenKind::Word if tokens[j].text == "define" => self.parse_define(j)?,
                TokenKind::Word => self.parse_word(EntityId::GLOBAL, j, false)?,
                _ => return Err(self.unexpected(j, "a statement")),
            };
        }
        Ok(())
    }

    // -- Token helpers --

    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !self.tokens[i].kind.is_trivia())
    }

    /// Next token that is not a `Space`, stopping at line ends and comments.
    fn next_on_line(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| self.tokens[i].kind != TokenKind::Space)
    }

    fn expect(
        &self,
        from: usize,
        kind: TokenKind,
        what: &str,
        after: usize,
    ) -> Result<usize, ParseError> {
        match self.next_significant(from) {
            Some(j) if self.tokens[j].kind == kind => Ok(j),
            Some(j) => Err(self.unexpected(j, what)),
            None => Err(ParseError::new(
                format!("expected {what}, found end of file"),
                self.tokens[after].line,
                Some(TokenId(after)),
            )),
        }
    }

    fn unexpected(&self, at: usize, expected: &str) -> ParseError {
        let token = &self.tokens[at];
        let found = match token.kind {
            TokenKind::Word | TokenKind::Number => format!("'{}'", token.text),
            TokenKind::String => format!("\"{}\"", token.text),
            other => other.to_string(),
        };
        ParseError::new(
            format!("expected {expected}, found {found}"),
            token.line,
            Some(TokenId(at)),
        )
    }

    fn unclosed(&self, open: usize, delimiter: &str) -> ParseError {
        let line = self.tokens[open].line;
        ParseError::new(
            format!("missing {delimiter} to match the one opened on line {line}"),
            line,
            Some(TokenId(open)),
        )
    }

    fn store_error(&self, err: WfError, at: usize) -> ParseError {
        ParseError::new(err.to_string(), self.tokens[at].line, Some(TokenId(at)))
    }

    fn matching_close(&self, open: usize) -> Result<usize, ParseError> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::OpenEntity => depth += 1,
                TokenKind::CloseEntity => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(self.unclosed(open, "')'"))
    }

    // -- Statements --

    /// `define <name> <type> ( ... )`: records the body range without parsing it.
    fn parse_define(&mut self, at: usize) -> Result<usize, ParseError> {
        let tokens = self.tokens;
        let name = self.expect(at + 1, TokenKind::Word, "a macro name after 'define'", at)?;
        let ty = self.expect(name + 1, TokenKind::Word, "an entity type after the macro name", name)?;
        let open = self.expect(ty + 1, TokenKind::OpenEntity, "'(' to start the macro body", ty)?;
        let close = self.matching_close(open)?;

        trace!(
            "macro {} -> {} on line {}",
            tokens[name].text, tokens[ty].text, tokens[at].line
        );
        self.macros.define(Macro {
            name: tokens[name].text.clone(),
            entity_type: tokens[ty].text.clone(),
            line: tokens[at].line,
            start: TokenId(ty),
            end: TokenId(close),
        });
        Ok(close + 1)
    }

    /// A word inside an entity (or at top level): an include directive, a
    /// property, or a nested entity, depending on what follows it.
    fn parse_word(
        &mut self,
        entity: EntityId,
        at: usize,
        inherited: bool,
    ) -> Result<usize, ParseError> {
        let tokens = self.tokens;
        let name = tokens[at].text.as_str();
        if name == "include" {
            return self.parse_include(at);
        }

        let Some(next) = self.next_significant(at + 1) else {
            return Err(ParseError::new(
                format!("expected a value or '(' after '{name}', found end of file"),
                tokens[at].line,
                Some(TokenId(at)),
            ));
        };

        match tokens[next].kind {
            TokenKind::OpenEntity => self.parse_entity(entity, at, next, inherited),
            TokenKind::OpenTuple => self.parse_tuple(entity, at, next, inherited),
            kind if kind.is_value() => {
                let prop = self.add_property(entity, at, inherited)?;
                self.add_value(prop, 0, next)?;
                Ok(next + 1)
            }
            _ => Err(self.unexpected(next, &format!("a value or '(' after '{name}'"))),
        }
    }

    /// `include "<name>"`. The loader only splices a filename that sits on the
    /// same line, so anything else here is an error rather than a property.
    fn parse_include(&self, at: usize) -> Result<usize, ParseError> {
        match self.next_on_line(at + 1) {
            Some(j) if self.tokens[j].kind == TokenKind::String => Ok(j + 1),
            Some(j) if !self.tokens[j].kind.is_trivia() => {
                Err(self.unexpected(j, "a quoted filename after 'include'"))
            }
            _ => Err(ParseError::new(
                "expected a quoted filename on the same line as 'include'",
                self.tokens[at].line,
                Some(TokenId(at)),
            )),
        }
    }

    fn add_property(
        &mut self,
        entity: EntityId,
        at: usize,
        inherited: bool,
    ) -> Result<PropertyId, ParseError> {
        let token = &self.tokens[at];
        let id = self
            .store
            .add_property(entity, &token.text, token.line)
            .map_err(|e| self.store_error(e, at))?;
        if let Some(prop) = self.store.property_mut(id) {
            prop.inherited = inherited;
            prop.name_token = Some(TokenId(at));
        }
        Ok(id)
    }

    fn add_value(&mut self, prop: PropertyId, index: usize, at: usize) -> Result<(), ParseError> {
        self.store
            .add_property_value(prop, index, TokenId(at))
            .map_err(|e| self.store_error(e, at))
    }

    /// `<name> [ <value>* ]`
    fn parse_tuple(
        &mut self,
        entity: EntityId,
        at: usize,
        open: usize,
        inherited: bool,
    ) -> Result<usize, ParseError> {
        let tokens = self.tokens;
        let prop = self.add_property(entity, at, inherited)?;
        let mut index = 0;
        let mut i = open + 1;
        loop {
            let Some(j) = self.next_significant(i) else {
                return Err(self.unclosed(open, "']'"));
            };
            match tokens[j].kind {
                TokenKind::CloseTuple => {
                    if let Some(p) = self.store.property_mut(prop) {
                        p.brackets = Some((TokenId(open), TokenId(j)));
                    }
                    return Ok(j + 1);
                }
                kind if kind.is_value() => {
                    self.add_value(prop, index, j)?;
                    index += 1;
                    i = j + 1;
                }
                TokenKind::CloseEntity => return Err(self.unclosed(open, "']'")),
                _ => return Err(self.unexpected(j, "a tuple value or ']'")),
            }
        }
    }

    /// `<type> ( ... )` where `<type>` is a base type or a macro name.
    fn parse_entity(
        &mut self,
        parent: EntityId,
        at: usize,
        open: usize,
        inherited: bool,
    ) -> Result<usize, ParseError> {
        let tokens = self.tokens;
        let type_name = tokens[at].text.as_str();
        let entity = match self.macros.lookup(type_name) {
            Some(mid) => self.instantiate(parent, mid, type_name, at)?,
            None => self
                .store
                .create_entity(Some(parent), type_name, type_name)
                .map_err(|e| self.store_error(e, at))?,
        };

        let close = self.parse_body(entity, open, inherited)?;
        if let Some(e) = self.store.entity_mut(entity) {
            e.line = tokens[at].line;
            e.anchor = if inherited {
                Anchor::Detached
            } else {
                Anchor::Before(TokenId(close))
            };
        }
        Ok(close + 1)
    }

    /// Statements between `open` and its `)`. Returns the index of the `)`.
    fn parse_body(
        &mut self,
        entity: EntityId,
        open: usize,
        inherited: bool,
    ) -> Result<usize, ParseError> {
        if self.nesting >= self.max_nesting_depth {
            return Err(ParseError::new(
                format!(
                    "entity nesting depth limit ({}) exceeded",
                    self.max_nesting_depth
                ),
                self.tokens[open].line,
                Some(TokenId(open)),
            ));
        }
        self.nesting += 1;
        let result = self.parse_statements(entity, open, inherited);
        self.nesting -= 1;
        result
    }

    fn parse_statements(
        &mut self,
        entity: EntityId,
        open: usize,
        inherited: bool,
    ) -> Result<usize, ParseError> {
        let tokens = self.tokens;
        let mut i = open + 1;
        loop {
            let Some(j) = self.next_significant(i) else {
                return Err(self.unclosed(open, "')'"));
            };
            match tokens[j].kind {
                TokenKind::CloseEntity => return Ok(j),
                TokenKind::Word if tokens[j].text == "define" => {
                    return Err(ParseError::new(
                        "macro definitions are only allowed at top level",
                        tokens[j].line,
                        Some(TokenId(j)),
                    ));
                }
                TokenKind::Word => i = self.parse_word(entity, j, inherited)?,
                _ => return Err(self.unexpected(j, "a property, an entity, or ')'")),
            }
        }
    }

    // -- Macro expansion --

    /// Create a new entity from a macro body. The caller then parses the
    /// invocation's own body into the returned entity.
    fn instantiate(
        &mut self,
        parent: EntityId,
        mid: MacroId,
        invoked: &str,
        site: usize,
    ) -> Result<EntityId, ParseError> {
        let line = self.tokens[site].line;
        if self.expanding.contains(&mid) {
            return Err(ParseError::new(
                format!("macro '{invoked}' expands into itself"),
                line,
                Some(TokenId(site)),
            ));
        }
        if self.expanding.len() >= self.max_macro_depth {
            return Err(ParseError::new(
                format!(
                    "macro expansion depth limit ({}) exceeded by '{invoked}'",
                    self.max_macro_depth
                ),
                line,
                Some(TokenId(site)),
            ));
        }
        let def = self.macros.get(mid).cloned().ok_or_else(|| {
            ParseError::new(format!("unknown macro '{invoked}'"), line, Some(TokenId(site)))
        })?;

        self.expanding.push(mid);
        let result = self.expand(parent, mid, &def, invoked);
        self.expanding.pop();
        result
    }

    fn expand(
        &mut self,
        parent: EntityId,
        mid: MacroId,
        def: &Macro,
        invoked: &str,
    ) -> Result<EntityId, ParseError> {
        let start = def.start.index();
        let open = self.expect(start + 1, TokenKind::OpenEntity, "'(' in macro body", start)?;
        let entity = match self.macros.lookup_before(&def.entity_type, mid) {
            Some(inner) => self.instantiate(parent, inner, invoked, start)?,
            None => self
                .store
                .create_entity(Some(parent), def.entity_type.clone(), invoked)
                .map_err(|e| self.store_error(e, start))?,
        };
        self.parse_body(entity, open, true)?;
        Ok(entity)
    }
}

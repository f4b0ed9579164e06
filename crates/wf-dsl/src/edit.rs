//! Property writes and entity creation, applied to the token sequence so that
//! a later save reproduces them.
//!
//! Existing value tokens are rewritten in place. Anything new is synthesized
//! next to the owning entity's anchor and inherits the anchor's include depth,
//! so edits to included content never reach the saved file. Entities expanded
//! from a macro body have no anchor and refuse every edit.

use wf_core::value::{is_bare_word, is_number_literal};
use wf_core::{
    Anchor, EntityId, EntityStore, PropertyId, Token, TokenId, TokenKind, TokenSeq, WfError,
    WfResult,
};

/// Value to store in one property slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewValue {
    pub kind: TokenKind,
    pub text: String,
}

impl NewValue {
    pub fn string(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::String,
            text: text.into(),
        }
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Number,
            text: text.into(),
        }
    }

    fn token(&self) -> Token {
        Token::new(self.kind, self.text.clone())
    }

    /// The kind to give an existing token when overwriting it with this value.
    /// The token keeps its kind whenever the new text still lexes as that kind.
    fn kind_over(&self, existing: TokenKind) -> TokenKind {
        match existing {
            TokenKind::String => TokenKind::String,
            TokenKind::Word if is_bare_word(&self.text) => TokenKind::Word,
            TokenKind::Number if is_number_literal(&self.text) => TokenKind::Number,
            _ => self.kind,
        }
    }
}

fn space() -> Token {
    Token::new(TokenKind::Space, " ")
}

fn end_of_line() -> Token {
    Token::new(TokenKind::EndOfLine, "\n")
}

/// Filler for tuple slots below the one being written.
fn gap() -> NewValue {
    NewValue::number("0")
}

/// Set slot `index` of property `name` on `entity`, creating or extending the
/// property as needed.
pub(crate) fn write_value(
    tokens: &mut TokenSeq,
    store: &mut EntityStore,
    entity: EntityId,
    name: &str,
    index: usize,
    value: NewValue,
) -> WfResult<()> {
    writable_anchor(store, entity)?;

    let Some(prop) = store.lookup_property(entity, name) else {
        let mut values: Vec<NewValue> = (0..index).map(|_| gap()).collect();
        values.push(value);
        let tuple = index > 0;
        return insert_statement(tokens, store, entity, name, values, tuple).map(|_| ());
    };

    let inherited = store
        .property(prop)
        .map(|p| p.inherited)
        .ok_or(WfError::PropertyNotFound(prop))?;
    let prop = if inherited {
        localize(tokens, store, prop)?
    } else {
        prop
    };
    set_slot(tokens, store, prop, index, value)
}

/// Give an inherited property its own tokens so that writing to it leaves the
/// macro body, and with it every other instance, untouched.
fn localize(
    tokens: &mut TokenSeq,
    store: &mut EntityStore,
    prop: PropertyId,
) -> WfResult<PropertyId> {
    let p = store
        .property(prop)
        .ok_or(WfError::PropertyNotFound(prop))?;
    let (owner, name, tuple) = (p.owner, p.name.clone(), p.brackets.is_some());
    let values: Vec<NewValue> = p
        .values
        .iter()
        .map(|slot| {
            slot.and_then(|id| tokens.get(id))
                .map(|t| NewValue {
                    kind: t.kind,
                    text: t.text.clone(),
                })
                .unwrap_or_else(gap)
        })
        .collect();
    let tuple = tuple || values.len() > 1;
    insert_statement(tokens, store, owner, &name, values, tuple)
}

/// Synthesize `name value` or `name [ v0 v1 ... ]` at the entity's anchor and
/// point the property at the new tokens.
fn insert_statement(
    tokens: &mut TokenSeq,
    store: &mut EntityStore,
    entity: EntityId,
    name: &str,
    values: Vec<NewValue>,
    tuple: bool,
) -> WfResult<PropertyId> {
    let mut stmt = vec![Token::new(TokenKind::Word, name), space()];
    let mut value_offsets = Vec::with_capacity(values.len());
    if tuple {
        stmt.push(Token::new(TokenKind::OpenTuple, "["));
        for value in &values {
            stmt.push(space());
            value_offsets.push(stmt.len());
            stmt.push(value.token());
        }
        stmt.push(space());
        stmt.push(Token::new(TokenKind::CloseTuple, "]"));
    } else {
        for value in &values {
            value_offsets.push(stmt.len());
            stmt.push(value.token());
        }
    }

    let (ids, line) = place(tokens, store, Some(entity), stmt)?;
    let prop = store.add_property(entity, name, line)?;
    for (slot, &offset) in value_offsets.iter().enumerate() {
        store.add_property_value(prop, slot, ids[offset])?;
    }
    if let Some(p) = store.property_mut(prop) {
        p.name_token = Some(ids[0]);
        p.brackets = tuple.then(|| (ids[2], ids[ids.len() - 1]));
    }
    Ok(prop)
}

/// Overwrite or add one slot of a property that already owns its tokens.
fn set_slot(
    tokens: &mut TokenSeq,
    store: &mut EntityStore,
    prop: PropertyId,
    index: usize,
    value: NewValue,
) -> WfResult<()> {
    let p = store
        .property(prop)
        .ok_or(WfError::PropertyNotFound(prop))?;

    if let Some(id) = p.value(index) {
        let kind = tokens
            .get(id)
            .map_or(value.kind, |existing| value.kind_over(existing.kind));
        tokens.set(id, kind, value.text);
        return Ok(());
    }

    // Extend: fill every missing slot up to `index`, each right after the
    // previous value so the on-disk order matches the slot order.
    let brackets = p.brackets;
    let existing = p.values.clone();
    let mut prev = brackets.map(|(open, _)| open).or(p.name_token);
    let depth = prev
        .and_then(|id| tokens.get(id))
        .map_or(0, |t| t.include_depth);

    let mut value = Some(value);
    for slot in 0..=index {
        if let Some(id) = existing.get(slot).copied().flatten() {
            prev = Some(id);
            continue;
        }
        let new = if slot == index {
            value.take().unwrap_or_else(gap)
        } else {
            gap()
        };
        let token = new.token().with_depth(depth);
        let id = match prev {
            Some(after) => tokens.insert_after(after, [space().with_depth(depth), token])[1],
            None => tokens.alloc(token),
        };
        store.add_property_value(prop, slot, id)?;
        prev = Some(id);
    }

    if brackets.is_none() {
        wrap_in_brackets(tokens, store, prop, depth)?;
    }
    Ok(())
}

/// Turn `name v0 v1` into `name [ v0 v1 ]` once a scalar gains a second slot.
fn wrap_in_brackets(
    tokens: &mut TokenSeq,
    store: &mut EntityStore,
    prop: PropertyId,
    depth: u32,
) -> WfResult<()> {
    let p = store
        .property(prop)
        .ok_or(WfError::PropertyNotFound(prop))?;
    let (Some(first), Some(last)) = (p.value(0), p.last_value()) else {
        return Ok(());
    };
    if p.values.len() < 2 {
        return Ok(());
    }
    let open = tokens.insert_before(
        first,
        [
            Token::new(TokenKind::OpenTuple, "[").with_depth(depth),
            space().with_depth(depth),
        ],
    )[0];
    let close = tokens.insert_after(
        last,
        [
            space().with_depth(depth),
            Token::new(TokenKind::CloseTuple, "]").with_depth(depth),
        ],
    )[1];
    if let Some(p) = store.property_mut(prop) {
        p.brackets = Some((open, close));
    }
    Ok(())
}

/// Add an empty `type ( )` block as the last child of `parent`, or at the end
/// of the file for a root entity.
pub(crate) fn create_entity(
    tokens: &mut TokenSeq,
    store: &mut EntityStore,
    entity_type: &str,
    parent: Option<EntityId>,
) -> WfResult<EntityId> {
    let block = vec![
        Token::new(TokenKind::Word, entity_type),
        space(),
        Token::new(TokenKind::OpenEntity, "("),
        space(),
        Token::new(TokenKind::CloseEntity, ")"),
    ];
    let (ids, line) = place(tokens, store, parent, block)?;

    let id = store.create_entity(parent, entity_type, entity_type)?;
    if let Some(e) = store.entity_mut(id) {
        e.line = line;
        e.anchor = Anchor::Before(ids[4]);
    }
    Ok(id)
}

/// Anchor of an entity that can take new content.
fn writable_anchor(store: &EntityStore, entity: EntityId) -> WfResult<Anchor> {
    match store.entity(entity).map(|e| e.anchor) {
        None => Err(WfError::EntityNotFound(entity)),
        Some(Anchor::Detached) => Err(WfError::MacroBodyEntity(entity)),
        Some(anchor) => Ok(anchor),
    }
}

/// Put a statement into the body of `owner`, or at the end of the file when
/// there is no owner. Returns the ids of the statement's tokens (not the
/// surrounding whitespace) and the line it was attributed to.
fn place(
    tokens: &mut TokenSeq,
    store: &EntityStore,
    owner: Option<EntityId>,
    stmt: Vec<Token>,
) -> WfResult<(Vec<TokenId>, usize)> {
    let close = match owner.map(|e| writable_anchor(store, e)).transpose()? {
        Some(Anchor::Before(close)) => Some(close),
        _ => None,
    };
    let (depth, line) = match close {
        Some(close) => tokens
            .get(close)
            .map_or((0, 0), |t| (t.include_depth, t.line)),
        None => (0, last_saved(tokens).map_or(1, |t| t.line + 1)),
    };
    let tag = |t: Token| t.with_depth(depth).with_line(line);
    let len = stmt.len();
    let stmt: Vec<Token> = stmt.into_iter().map(tag).collect();

    let ids: Vec<TokenId> = match close {
        None => {
            if last_saved(tokens).is_some_and(|t| t.kind != TokenKind::EndOfLine) {
                tokens.push(tag(end_of_line()));
            }
            let ids = tokens.append(stmt);
            tokens.push(tag(end_of_line()));
            ids
        }
        Some(close) => match line_start(tokens, close) {
            // `)` on its own line: new statement goes on a line above it,
            // indented one level deeper.
            Some((start, indent)) => {
                let mut all = vec![tag(Token::new(TokenKind::Space, format!("{indent}  ")))];
                all.extend(stmt);
                all.push(tag(end_of_line()));
                tokens.insert_before(start, all)[1..=len].to_vec()
            }
            None => {
                let mut all = stmt;
                all.push(tag(space()));
                let mut ids = tokens.insert_before(close, all);
                ids.truncate(len);
                ids
            }
        },
    };
    Ok((ids, line))
}

/// Last laid-out token that belongs to the top-level file.
fn last_saved(tokens: &TokenSeq) -> Option<&Token> {
    tokens
        .layout()
        .map(|(_, t)| t)
        .filter(|t| t.include_depth == 0)
        .last()
}

/// If only whitespace precedes `close` on its line, the first token of that
/// line and the indentation text.
fn line_start(tokens: &TokenSeq, close: TokenId) -> Option<(TokenId, String)> {
    let mut start = tokens.position(close)?;
    let mut indent = String::new();
    while start > 0 {
        let token = tokens.id_at(start - 1).and_then(|id| tokens.get(id))?;
        match token.kind {
            TokenKind::Space => {
                indent.insert_str(0, &token.text);
                start -= 1;
            }
            TokenKind::EndOfLine => break,
            _ => return None,
        }
    }
    Some((tokens.id_at(start)?, indent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadConfig;
    use crate::lexer::lex;
    use crate::parser::parse;
    use wf_core::MacroTable;

    fn load(source: &str) -> (TokenSeq, EntityStore) {
        let (lexed, errors) = lex(source, 0, 0);
        assert!(errors.is_empty());
        let tokens: TokenSeq = lexed.into_iter().collect();
        let mut store = EntityStore::new();
        let global = store.create_entity(None, "", "").unwrap();
        store.entity_mut(global).unwrap().anchor = Anchor::EndOfFile;
        parse(
            tokens.as_slice(),
            &mut store,
            &mut MacroTable::new(),
            &LoadConfig::default(),
        )
        .unwrap();
        (tokens, store)
    }

    fn render(tokens: &TokenSeq) -> String {
        tokens
            .layout()
            .filter(|(_, t)| t.include_depth == 0)
            .map(|(_, t)| t.to_string())
            .collect()
    }

    #[test]
    fn overwrite_keeps_layout() {
        let (mut tokens, mut store) = load("wall (\n  size   3 # metres\n)\n");
        write_value(&mut tokens, &mut store, EntityId(1), "size", 0, NewValue::number("4.5")).unwrap();
        assert_eq!(render(&tokens), "wall (\n  size   4.5 # metres\n)\n");
    }

    #[test]
    fn overwrite_keeps_bare_word_unquoted() {
        let (mut tokens, mut store) = load("color black\n");
        write_value(&mut tokens, &mut store, EntityId::GLOBAL, "color", 0, NewValue::string("red")).unwrap();
        assert_eq!(render(&tokens), "color red\n");
        write_value(&mut tokens, &mut store, EntityId::GLOBAL, "color", 0, NewValue::string("light red")).unwrap();
        assert_eq!(render(&tokens), "color \"light red\"\n");
    }

    #[test]
    fn new_property_goes_above_closing_line() {
        let (mut tokens, mut store) = load("wall (\n  size 3\n)\n");
        write_value(&mut tokens, &mut store, EntityId(1), "name", 0, NewValue::string("w1")).unwrap();
        assert_eq!(render(&tokens), "wall (\n  size 3\n  name \"w1\"\n)\n");
    }

    #[test]
    fn new_property_inline_block() {
        let (mut tokens, mut store) = load("wall ( size 3 )\n");
        write_value(&mut tokens, &mut store, EntityId(1), "name", 0, NewValue::string("w1")).unwrap();
        assert_eq!(render(&tokens), "wall ( size 3 name \"w1\" )\n");
    }

    #[test]
    fn new_global_property_appends_line() {
        let (mut tokens, mut store) = load("size 3");
        write_value(&mut tokens, &mut store, EntityId::GLOBAL, "speed", 0, NewValue::number("2")).unwrap();
        assert_eq!(render(&tokens), "size 3\nspeed 2\n");
    }

    #[test]
    fn new_tuple_slot_fills_gaps() {
        let (mut tokens, mut store) = load("wall (\n)\n");
        write_value(&mut tokens, &mut store, EntityId(1), "pose", 2, NewValue::number("1.5")).unwrap();
        assert_eq!(render(&tokens), "wall (\n  pose [ 0 0 1.5 ]\n)\n");
    }

    #[test]
    fn extend_existing_tuple() {
        let (mut tokens, mut store) = load("pose [1 2]\n");
        write_value(&mut tokens, &mut store, EntityId::GLOBAL, "pose", 3, NewValue::number("9")).unwrap();
        assert_eq!(render(&tokens), "pose [1 2 0 9]\n");
        let prop = store.lookup_property(EntityId::GLOBAL, "pose").unwrap();
        assert_eq!(store.property(prop).unwrap().values.len(), 4);
    }

    #[test]
    fn extend_scalar_wraps_in_brackets() {
        let (mut tokens, mut store) = load("pose 1\n");
        write_value(&mut tokens, &mut store, EntityId::GLOBAL, "pose", 1, NewValue::number("2")).unwrap();
        assert_eq!(render(&tokens), "pose [ 1 2 ]\n");
    }

    #[test]
    fn extend_empty_tuple() {
        let (mut tokens, mut store) = load("pose []\n");
        write_value(&mut tokens, &mut store, EntityId::GLOBAL, "pose", 0, NewValue::number("7")).unwrap();
        assert_eq!(render(&tokens), "pose [ 7]\n");
    }

    #[test]
    fn inherited_write_is_local_to_instance() {
        let src = "define wall obstacle ( color \"black\" )\nwall (\n)\nwall (\n)\n";
        let (mut tokens, mut store) = load(src);
        write_value(&mut tokens, &mut store, EntityId(1), "color", 0, NewValue::string("red")).unwrap();
        assert_eq!(
            render(&tokens),
            "define wall obstacle ( color \"black\" )\nwall (\n  color \"red\"\n)\nwall (\n)\n"
        );
        let other = store.lookup_property(EntityId(2), "color").unwrap();
        let id = store.property(other).unwrap().value(0).unwrap();
        assert_eq!(tokens.text(id), Some("black"));
        let mine = store.lookup_property(EntityId(1), "color").unwrap();
        assert!(!store.property(mine).unwrap().inherited);
    }

    #[test]
    fn inherited_tuple_is_copied_before_write() {
        let src = "define box model ( size [1 2 3] )\nbox ( )\n";
        let (mut tokens, mut store) = load(src);
        write_value(&mut tokens, &mut store, EntityId(1), "size", 1, NewValue::number("5")).unwrap();
        assert_eq!(
            render(&tokens),
            "define box model ( size [1 2 3] )\nbox ( size [ 1 5 3 ] )\n"
        );
    }

    #[test]
    fn create_entity_under_parent_and_root() {
        let (mut tokens, mut store) = load("world (\n)\n");
        let child = create_entity(&mut tokens, &mut store, "laser", Some(EntityId(1))).unwrap();
        write_value(&mut tokens, &mut store, child, "range", 0, NewValue::number("8")).unwrap();
        let root = create_entity(&mut tokens, &mut store, "light", None).unwrap();
        assert_eq!(store.parent_of(root), None);
        assert_eq!(
            render(&tokens),
            "world (\n  laser ( range 8 )\n)\nlight ( )\n"
        );
    }

    #[test]
    fn macro_body_entity_refuses_edits() {
        let src = "define bot position ( laser ( range 5 ) )\nbot ( )\n";
        let (mut tokens, mut store) = load(src);
        let laser = store.children_of(Some(EntityId(1))).next().unwrap();
        assert_eq!(store.entity(laser).unwrap().anchor, Anchor::Detached);
        let arena = tokens.len();

        for name in ["range", "fov"] {
            let err = write_value(&mut tokens, &mut store, laser, name, 0, NewValue::number("8"));
            assert_eq!(err, Err(WfError::MacroBodyEntity(laser)));
        }
        let err = create_entity(&mut tokens, &mut store, "blob", Some(laser));
        assert_eq!(err, Err(WfError::MacroBodyEntity(laser)));

        assert_eq!(tokens.len(), arena);
        assert_eq!(render(&tokens), src);
        let range = store.lookup_property(laser, "range").unwrap();
        let id = store.property(range).unwrap().value(0).unwrap();
        assert_eq!(tokens.text(id), Some("5"));
    }

    #[test]
    fn write_to_unknown_entity_fails() {
        let (mut tokens, mut store) = load("");
        let err = write_value(&mut tokens, &mut store, EntityId(9), "x", 0, NewValue::number("1"));
        assert_eq!(err, Err(WfError::EntityNotFound(EntityId(9))));
    }
}

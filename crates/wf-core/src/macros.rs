use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::TokenId;

/// Index of a macro in a [`MacroTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroId(pub usize);

impl fmt::Display for MacroId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `define <name> <entity_type> ( ... )` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    /// Name used to invoke the macro.
    pub name: String,
    /// Entity type the macro expands to (may itself be a macro name).
    pub entity_type: String,
    /// Line of the `define` keyword.
    pub line: usize,
    /// First body token: the entity type word.
    pub start: TokenId,
    /// Last body token: the closing `)`.
    pub end: TokenId,
}

/// Named macro definitions. Bodies are token ranges, never copies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MacroTable {
    macros: Vec<Macro>,
    #[serde(skip)]
    by_name: HashMap<String, MacroId>,
}

impl MacroTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a macro. A later definition with the same name shadows earlier ones.
    pub fn define(&mut self, def: Macro) -> MacroId {
        let id = MacroId(self.macros.len());
        self.by_name.insert(def.name.clone(), id);
        self.macros.push(def);
        id
    }

    /// Find the macro currently bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<MacroId> {
        self.by_name.get(name).copied()
    }

    /// Find the latest definition of `name` made before `limit`.
    ///
    /// Used when expanding a macro body so that `define wall wall ( ... )`
    /// extends an earlier `wall` instead of referring to itself.
    pub fn lookup_before(&self, name: &str, limit: MacroId) -> Option<MacroId> {
        self.macros[..limit.0.min(self.macros.len())]
            .iter()
            .rposition(|m| m.name == name)
            .map(MacroId)
    }

    /// Get a macro definition.
    pub fn get(&self, id: MacroId) -> Option<&Macro> {
        self.macros.get(id.0)
    }

    /// Number of definitions, shadowed ones included.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Returns `true` if nothing has been defined.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// All definitions in file order.
    pub fn iter(&self) -> impl Iterator<Item = (MacroId, &Macro)> + '_ {
        self.macros.iter().enumerate().map(|(i, m)| (MacroId(i), m))
    }

    /// Remove all definitions.
    pub fn clear(&mut self) {
        self.macros.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, ty: &str, start: usize) -> Macro {
        Macro {
            name: name.to_string(),
            entity_type: ty.to_string(),
            line: 1,
            start: TokenId(start),
            end: TokenId(start + 5),
        }
    }

    #[test]
    fn define_and_lookup() {
        let mut table = MacroTable::new();
        let id = table.define(def("wall", "obstacle", 4));
        assert_eq!(table.lookup("wall"), Some(id));
        assert_eq!(table.get(id).map(|m| m.entity_type.as_str()), Some("obstacle"));
        assert_eq!(table.lookup("door"), None);
    }

    #[test]
    fn later_definition_shadows() {
        let mut table = MacroTable::new();
        table.define(def("wall", "obstacle", 4));
        let newer = table.define(def("wall", "model", 20));
        assert_eq!(table.lookup("wall"), Some(newer));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn lookup_before_skips_later_definitions() {
        let mut table = MacroTable::new();
        let first = table.define(def("wall", "obstacle", 4));
        let second = table.define(def("wall", "wall", 20));
        assert_eq!(table.lookup_before("wall", second), Some(first));
        assert_eq!(table.lookup_before("wall", first), None);
    }
}

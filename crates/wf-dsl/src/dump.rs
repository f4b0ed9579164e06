//! Plain-text listings of a loaded worldfile's internals, for debugging.

use std::fmt::Write;

use crate::worldfile::WorldFile;

impl WorldFile {
    /// One line per laid-out token: position, include depth, line, kind, text.
    pub fn dump_tokens(&self) -> String {
        let mut out = String::new();
        for (pos, token) in self.tokens().enumerate() {
            let _ = writeln!(
                out,
                "{pos:>5} d{} L{:<4} {:<12} {:?}",
                token.include_depth,
                token.line,
                token.kind.to_string(),
                token.text
            );
        }
        out
    }

    /// One line per entity, indented under its parent.
    pub fn dump_entities(&self) -> String {
        let mut out = String::new();
        let store = self.store();
        for (id, entity) in store.entities() {
            let mut depth = 0;
            let mut parent = entity.parent;
            while let Some(p) = parent {
                depth += 1;
                parent = store.parent_of(p);
            }
            let name = if id.index() == 0 {
                "(global)"
            } else {
                entity.base_type.as_str()
            };
            let _ = write!(out, "{:indent$}{id} {name}", "", indent = depth * 2);
            if entity.immediate_type != entity.base_type {
                let _ = write!(out, " as {}", entity.immediate_type);
            }
            let _ = writeln!(out, " (line {})", entity.line);
        }
        out
    }

    /// One line per macro definition, in definition order.
    pub fn dump_macros(&self) -> String {
        let mut out = String::new();
        for (id, m) in self.macros().iter() {
            let _ = writeln!(
                out,
                "{id} {} -> {} (line {}, tokens {}..={})",
                m.name, m.entity_type, m.line, m.start, m.end
            );
        }
        out
    }

    /// One line per property: owner, name, values, and whether it was read.
    pub fn dump_properties(&self) -> String {
        let mut out = String::new();
        for (_, prop) in self.store().properties() {
            let values: Vec<String> = prop
                .values
                .iter()
                .map(|slot| {
                    slot.and_then(|id| self.token(id))
                        .map_or_else(|| "-".to_string(), ToString::to_string)
                })
                .collect();
            let _ = write!(out, "{}.{} = {}", prop.owner, prop.name, values.join(" "));
            let _ = write!(out, " (line {}", prop.line);
            if prop.inherited {
                out.push_str(", inherited");
            }
            if prop.used {
                out.push_str(", used");
            }
            out.push_str(")\n");
        }
        out
    }
}

use crate::store::{EntityId, PropertyId};

/// Alias for `Result<T, WfError>`.
pub type WfResult<T> = Result<T, WfError>;

/// Errors raised by the worldfile data model and value conversions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WfError {
    /// The requested entity id does not exist in the store.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The requested property id does not exist in the store.
    #[error("property not found: {0}")]
    PropertyNotFound(PropertyId),

    /// A new entity named a parent that has not been created yet.
    #[error("invalid parent {parent}: only {count} entities exist")]
    InvalidParent {
        /// The parent that was requested.
        parent: EntityId,
        /// Number of entities in the store at the time of the call.
        count: usize,
    },

    /// A `unit_length` or `unit_angle` value is not a recognized unit name.
    #[error("unknown {kind} unit: \"{name}\"")]
    UnknownUnit {
        /// Which unit family was being parsed ("length" or "angle").
        kind: &'static str,
        /// The unrecognized unit name.
        name: String,
    },

    /// Stored token text could not be parsed as the requested type.
    #[error("cannot parse \"{text}\" as {expected}")]
    ValueParse {
        /// Human-readable name of the requested type.
        expected: &'static str,
        /// The offending token text.
        text: String,
    },

    /// A color value is neither a known name nor a `#RRGGBB` literal.
    #[error("unknown color: \"{0}\"")]
    ColorParse(String),

    /// The entity was expanded from a macro body and has no text of its own,
    /// so nothing written to it could be saved.
    #[error("entity {0} comes from a macro body and cannot be edited")]
    MacroBodyEntity(EntityId),

    /// A float write was given infinity or NaN, which has no worldfile spelling.
    #[error("cannot write non-finite value {value} to \"{name}\"")]
    NonFinite {
        /// The property being written.
        name: String,
        /// The rejected value, after unit conversion.
        value: f64,
    },
}

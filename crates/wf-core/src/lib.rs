//! Core data model for worldfiles: tokens, entities, properties, macros, and units.
//!
//! This crate holds plain data structures and pure conversion functions. It does
//! no I/O; the `wf-dsl` crate lexes and parses files into these types and exposes
//! the typed accessor API on top of them.

/// Error types used throughout the crate.
pub mod error;
/// Named macro definitions referencing token ranges.
pub mod macros;
/// The entity forest and the flat property table.
pub mod store;
/// Tokens, token ids, and the layout-ordered token sequence.
pub mod token;
/// Length and angle unit conversion.
pub mod units;
/// Conversion of token text into typed values.
pub mod value;

/// Re-export error types.
pub use error::{WfError, WfResult};
/// Re-export macro types.
pub use macros::{Macro, MacroId, MacroTable};
/// Re-export store types.
pub use store::{Anchor, Entity, EntityId, EntityStore, Property, PropertyId};
/// Re-export token types.
pub use token::{Token, TokenId, TokenKind, TokenOrigin, TokenSeq};
/// Re-export unit types.
pub use units::{AngleUnit, LengthUnit, UnitTable};

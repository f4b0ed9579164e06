//! Reading and writing worldfiles.
//!
//! [`WorldFile`] is the entry point: load a file (following its `include`
//! directives and expanding its macros), read typed values out of its entities,
//! write values back, and save. Saving reproduces the original text byte for
//! byte except where values were written.

/// Configuration for loading: search path and recursion limits.
pub mod config;
/// Diagnostics and their terminal rendering.
pub mod diagnostics;
mod dump;
mod edit;
/// Load, parse, and save errors.
pub mod error;
/// The logos-based tokenizer.
pub mod lexer;
/// Tokenization with `include` splicing.
pub mod loader;
/// The recursive-descent parser and macro expander.
pub mod parser;
/// Rendering and atomic writing of the top-level file.
pub mod save;
/// Registry of the files read during a load.
pub mod source;
mod worldfile;

pub use config::LoadConfig;
pub use diagnostics::{Diagnostic, Severity, render_diagnostics};
pub use error::{LoadError, ParseError, SaveError};
pub use source::SourceMap;
pub use worldfile::WorldFile;

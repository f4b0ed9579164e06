use std::fmt;
use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::source::SourceMap;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The file could not be loaded.
    Error,
    /// The file loaded but something in it was ignored or defaulted.
    Warning,
}

/// A message tied to a place in one of the loaded files.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// How serious it is.
    pub severity: Severity,
    /// Source-map index of the file, when known.
    pub file: Option<usize>,
    /// 1-based line, or 0 when there is no location.
    pub line: usize,
    /// Byte range within the file.
    pub span: Range<usize>,
    /// Headline message.
    pub message: String,
    /// Text attached to the highlighted span.
    pub label: Option<String>,
}

impl Diagnostic {
    /// An error with no location yet.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// A warning with no location yet.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            file: None,
            line: 0,
            span: 0..0,
            message: message.into(),
            label: None,
        }
    }

    /// Attach a location.
    pub fn at(mut self, file: Option<usize>, line: usize, span: Range<usize>) -> Self {
        self.file = file;
        self.line = line;
        self.span = span;
        self
    }

    /// Attach a label for the highlighted span.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.line > 0 {
            write!(f, "{prefix}: line {}: {}", self.line, self.message)
        } else {
            write!(f, "{prefix}: {}", self.message)
        }
    }
}

/// Render diagnostics using ariadne for pretty terminal output.
///
/// Diagnostics whose file is not in `sources` fall back to their plain
/// `Display` form.
pub fn render_diagnostics(sources: &SourceMap, diagnostics: &[Diagnostic]) -> String {
    let mut output = Vec::new();

    for diag in diagnostics {
        let Some(file) = diag.file.and_then(|i| sources.get_file(i)) else {
            output.extend_from_slice(format!("{diag}\n").as_bytes());
            continue;
        };

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };
        let color = match diag.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let name = file.path.display().to_string();
        let filename = name.as_str();
        let end = diag.span.end.min(file.text.len());
        let span = diag.span.start.min(end)..end;

        let label_text = diag.label.as_deref().unwrap_or(&diag.message);
        Report::build(kind, (filename, span.clone()))
            .with_message(&diag.message)
            .with_label(
                Label::new((filename, span))
                    .with_message(label_text)
                    .with_color(color),
            )
            .finish()
            .write((filename, Source::from(file.text.as_str())), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::warning("property \"colour\" is never read").at(Some(0), 4, 10..16);
        assert_eq!(d.to_string(), "warning: line 4: property \"colour\" is never read");
        assert_eq!(Diagnostic::error("no filename").to_string(), "error: no filename");
    }

    #[test]
    fn render_produces_output() {
        let mut sources = SourceMap::new();
        let source = "wall (\n  colour \"red\"\n)\n";
        let file = sources.add_file(PathBuf::from("world.cfg"), source.to_string(), 0);
        let diags = vec![
            Diagnostic::warning("property is never read")
                .at(Some(file), 2, 9..15)
                .with_label("unused"),
        ];
        let output = render_diagnostics(&sources, &diags);
        assert!(output.contains("property is never read"));
        assert!(output.contains("world.cfg"));
    }

    #[test]
    fn render_without_source_falls_back_to_display() {
        let sources = SourceMap::new();
        let output = render_diagnostics(&sources, &[Diagnostic::error("boom")]);
        assert_eq!(output, "error: boom\n");
    }
}

use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;
use wf_core::{TokenKind, TokenSeq};

use crate::config::LoadConfig;
use crate::error::LoadError;
use crate::lexer;
use crate::source::SourceMap;

/// Turns a worldfile and everything it includes into one token sequence.
///
/// `include "<file>"` is expanded in place: the included file's tokens follow the
/// directive's string token directly, tagged with `include_depth + 1`.
pub struct Loader<'a> {
    config: &'a LoadConfig,
    sources: &'a mut SourceMap,
    stack: Vec<PathBuf>,
}

impl<'a> Loader<'a> {
    /// Create a loader that registers every file it reads in `sources`.
    pub fn new(config: &'a LoadConfig, sources: &'a mut SourceMap) -> Self {
        Self {
            config,
            sources,
            stack: Vec::new(),
        }
    }

    /// Read and tokenize `path`, appending to `seq`.
    pub fn load_file(&mut self, path: &Path, seq: &mut TokenSeq) -> Result<(), LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.tokenize(path, text, 0, seq)
    }

    /// Tokenize in-memory text as if it had been read from `path`.
    pub fn load_source(
        &mut self,
        path: &Path,
        text: String,
        seq: &mut TokenSeq,
    ) -> Result<(), LoadError> {
        self.tokenize(path, text, 0, seq)
    }

    fn tokenize(
        &mut self,
        path: &Path,
        text: String,
        depth: u32,
        seq: &mut TokenSeq,
    ) -> Result<(), LoadError> {
        self.stack.push(canonical(path));
        let file = self.sources.add_file(path.to_path_buf(), text, depth);
        let (tokens, errors) = match self.sources.get_file(file) {
            Some(source) => lexer::lex(&source.text, file, depth),
            None => (Vec::new(), Vec::new()),
        };

        if let Some(err) = errors.into_iter().next() {
            return Err(LoadError::Lex {
                path: path.to_path_buf(),
                file: Some(file),
                line: err.line,
                span: err.span,
                message: err.message,
            });
        }

        let mut after_include = false;
        for token in tokens {
            let kind = token.kind;
            let is_include = kind == TokenKind::Word && token.text == "include";
            let target = (after_include && kind == TokenKind::String).then(|| {
                let span = token.origin.as_ref().map(|o| o.span.clone()).unwrap_or(0..0);
                (token.text.clone(), token.line, span)
            });
            seq.push(token);

            if let Some((name, line, span)) = target {
                let site = IncludeSite {
                    path,
                    file,
                    line,
                    span,
                };
                self.include(&site, &name, depth, seq)?;
                after_include = false;
            } else if kind != TokenKind::Space {
                after_include = is_include;
            }
        }

        self.stack.pop();
        Ok(())
    }

    fn include(
        &mut self,
        site: &IncludeSite<'_>,
        name: &str,
        depth: u32,
        seq: &mut TokenSeq,
    ) -> Result<(), LoadError> {
        let next_depth = depth + 1;
        if next_depth as usize > self.config.max_include_depth {
            return Err(site.error(format!(
                "include depth limit ({}) exceeded by \"{name}\"",
                self.config.max_include_depth
            )));
        }

        let target = self
            .config
            .resolve(Path::new(name), site.path.parent())
            .ok_or_else(|| site.error(format!("cannot open include file \"{name}\"")))?;

        if self.stack.contains(&canonical(&target)) {
            return Err(site.error(format!(
                "include cycle: \"{name}\" is already being loaded"
            )));
        }

        let text = std::fs::read_to_string(&target)
            .map_err(|e| site.error(format!("cannot read include file \"{name}\": {e}")))?;
        debug!("including {} at depth {next_depth}", target.display());
        self.tokenize(&target, text, next_depth, seq)
    }
}

/// Location of an `include` directive, for error reporting.
struct IncludeSite<'p> {
    path: &'p Path,
    file: usize,
    line: usize,
    span: Range<usize>,
}

impl IncludeSite<'_> {
    fn error(&self, message: String) -> LoadError {
        LoadError::Lex {
            path: self.path.to_path_buf(),
            file: Some(self.file),
            line: self.line,
            span: self.span.clone(),
            message,
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn render(seq: &TokenSeq) -> String {
        seq.layout().map(|(_, t)| t.to_string()).collect()
    }

    #[test]
    fn include_is_spliced_after_directive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("units.inc"), "unit_length \"cm\"\n").unwrap();
        let main = dir.path().join("world.cfg");
        fs::write(&main, "include \"units.inc\"\nsize 3\n").unwrap();

        let config = LoadConfig::default();
        let mut sources = SourceMap::new();
        let mut seq = TokenSeq::new();
        Loader::new(&config, &mut sources)
            .load_file(&main, &mut seq)
            .unwrap();

        assert_eq!(
            render(&seq),
            "include \"units.inc\"unit_length \"cm\"\n\nsize 3\n"
        );
        let depths: Vec<u32> = seq.layout().map(|(_, t)| t.include_depth).collect();
        assert_eq!(depths[..3], [0, 0, 0]);
        assert_eq!(depths[3..7], [1, 1, 1, 1]);
        assert!(depths[7..].iter().all(|&d| d == 0));
        assert_eq!(sources.files().len(), 2);
    }

    #[test]
    fn nested_includes_resolve_against_including_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("inc")).unwrap();
        fs::write(dir.path().join("inc/a.inc"), "include \"b.inc\"\n").unwrap();
        fs::write(dir.path().join("inc/b.inc"), "deep 1\n").unwrap();
        let main = dir.path().join("world.cfg");
        fs::write(&main, "include \"inc/a.inc\"\n").unwrap();

        let config = LoadConfig::default();
        let mut sources = SourceMap::new();
        let mut seq = TokenSeq::new();
        Loader::new(&config, &mut sources)
            .load_file(&main, &mut seq)
            .unwrap();

        let deep = seq
            .layout()
            .find(|(_, t)| t.text == "deep")
            .map(|(_, t)| t.include_depth);
        assert_eq!(deep, Some(2));
    }

    #[test]
    fn missing_include_reports_line() {
        let config = LoadConfig::default();
        let mut sources = SourceMap::new();
        let mut seq = TokenSeq::new();
        let err = Loader::new(&config, &mut sources)
            .load_source(
                Path::new("/nonexistent/world.cfg"),
                "a 1\ninclude \"nope.inc\"\n".to_string(),
                &mut seq,
            )
            .unwrap_err();
        match err {
            LoadError::Lex { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("cannot open include file"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn include_cycle_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.inc"), "include \"b.inc\"\n").unwrap();
        fs::write(dir.path().join("b.inc"), "include \"a.inc\"\n").unwrap();
        let main = dir.path().join("world.cfg");
        fs::write(&main, "include \"a.inc\"\n").unwrap();

        let config = LoadConfig::default();
        let mut sources = SourceMap::new();
        let mut seq = TokenSeq::new();
        let err = Loader::new(&config, &mut sources)
            .load_file(&main, &mut seq)
            .unwrap_err();
        assert!(err.to_string().contains("include cycle"), "{err}");
    }

    #[test]
    fn include_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.inc"), "include \"b.inc\"\n").unwrap();
        fs::write(dir.path().join("b.inc"), "x 1\n").unwrap();
        let main = dir.path().join("world.cfg");
        fs::write(&main, "include \"a.inc\"\n").unwrap();

        let config = LoadConfig::default().with_max_include_depth(1);
        let mut sources = SourceMap::new();
        let mut seq = TokenSeq::new();
        let err = Loader::new(&config, &mut sources)
            .load_file(&main, &mut seq)
            .unwrap_err();
        assert!(err.to_string().contains("include depth limit"), "{err}");
    }

    #[test]
    fn lex_error_aborts_with_line() {
        let config = LoadConfig::default();
        let mut sources = SourceMap::new();
        let mut seq = TokenSeq::new();
        let err = Loader::new(&config, &mut sources)
            .load_source(
                Path::new("world.cfg"),
                "a 1\nb \"open\n".to_string(),
                &mut seq,
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "world.cfg:2: unterminated string (missing closing \")"
        );
    }
}

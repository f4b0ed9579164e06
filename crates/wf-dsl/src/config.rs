use std::path::{Path, PathBuf};

/// Environment variable holding extra directories to search for worldfiles.
pub const SEARCH_PATH_ENV: &str = "WORLDFILE_PATH";

/// Settings for loading worldfiles.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Directories searched for bare filenames, in order.
    pub search_path: Vec<PathBuf>,
    /// Deepest allowed chain of nested `include` directives.
    pub max_include_depth: usize,
    /// Deepest allowed chain of macro expansions.
    pub max_macro_depth: usize,
    /// Deepest allowed nesting of entity bodies, macro bodies included.
    pub max_nesting_depth: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            search_path: Vec::new(),
            max_include_depth: 16,
            max_macro_depth: 64,
            max_nesting_depth: 256,
        }
    }
}

impl LoadConfig {
    /// Default settings with the search path taken from `WORLDFILE_PATH`.
    pub fn from_env() -> Self {
        let search_path = std::env::var_os(SEARCH_PATH_ENV)
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self::default().with_search_path(search_path)
    }

    /// Replace the search path.
    pub fn with_search_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_path = dirs;
        self
    }

    /// Append one directory to the search path.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_path.push(dir.into());
        self
    }

    /// Set the maximum include nesting depth.
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Set the maximum macro expansion depth.
    pub fn with_max_macro_depth(mut self, depth: usize) -> Self {
        self.max_macro_depth = depth;
        self
    }

    /// Set the maximum entity nesting depth.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Find a file by name.
    ///
    /// Absolute paths are used as given. Relative names are tried against
    /// `base_dir` (the including file's directory), then each search directory,
    /// then the current working directory.
    pub fn resolve(&self, name: &Path, base_dir: Option<&Path>) -> Option<PathBuf> {
        if name.is_absolute() {
            return name.is_file().then(|| name.to_path_buf());
        }
        base_dir
            .into_iter()
            .chain(self.search_path.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(name))
            .chain(std::iter::once(name.to_path_buf()))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = LoadConfig::default();
        assert!(config.search_path.is_empty());
        assert_eq!(config.max_include_depth, 16);
        assert_eq!(config.max_macro_depth, 64);
        assert_eq!(config.max_nesting_depth, 256);
    }

    #[test]
    fn config_builder_chain() {
        let config = LoadConfig::default()
            .with_search_dir("/opt/worlds")
            .with_search_dir("/usr/share/worlds")
            .with_max_include_depth(4)
            .with_max_macro_depth(8)
            .with_max_nesting_depth(32);
        assert_eq!(
            config.search_path,
            vec![PathBuf::from("/opt/worlds"), PathBuf::from("/usr/share/worlds")]
        );
        assert_eq!(config.max_include_depth, 4);
        assert_eq!(config.max_macro_depth, 8);
        assert_eq!(config.max_nesting_depth, 32);
    }

    #[test]
    fn resolve_prefers_base_dir_then_search_path() {
        let base = tempfile::tempdir().unwrap();
        let extra = tempfile::tempdir().unwrap();
        std::fs::write(extra.path().join("robots.inc"), "").unwrap();
        std::fs::write(extra.path().join("map.inc"), "").unwrap();
        std::fs::write(base.path().join("map.inc"), "").unwrap();

        let config = LoadConfig::default().with_search_dir(extra.path());
        assert_eq!(
            config.resolve(Path::new("map.inc"), Some(base.path())),
            Some(base.path().join("map.inc"))
        );
        assert_eq!(
            config.resolve(Path::new("robots.inc"), Some(base.path())),
            Some(extra.path().join("robots.inc"))
        );
        assert_eq!(config.resolve(Path::new("missing.inc"), Some(base.path())), None);
    }

    #[test]
    fn resolve_absolute_path_as_given() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("world.cfg");
        std::fs::write(&file, "").unwrap();
        let config = LoadConfig::default();
        assert_eq!(config.resolve(&file, None), Some(file.clone()));
        assert_eq!(config.resolve(&dir.path().join("nope.cfg"), None), None);
    }
}

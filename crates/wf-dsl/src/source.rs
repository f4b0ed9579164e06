use std::path::PathBuf;

/// One file read during a load.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path the file was read from.
    pub path: PathBuf,
    /// Full file contents.
    pub text: String,
    /// Number of `include` hops from the loaded worldfile.
    pub include_depth: u32,
}

/// Every file read during a load, indexed by the `file` field of token origins.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a file. Returns its index.
    pub fn add_file(&mut self, path: PathBuf, text: String, include_depth: u32) -> usize {
        let idx = self.files.len();
        self.files.push(SourceFile {
            path,
            text,
            include_depth,
        });
        idx
    }

    /// Get a file by index.
    pub fn get_file(&self, index: usize) -> Option<&SourceFile> {
        self.files.get(index)
    }

    /// All registered files.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Forget every file.
    pub fn clear(&mut self) {
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_are_indexed_in_registration_order() {
        let mut map = SourceMap::new();
        let a = map.add_file(PathBuf::from("world.cfg"), "a 1".into(), 0);
        let b = map.add_file(PathBuf::from("units.inc"), "b 2".into(), 1);
        assert_eq!((a, b), (0, 1));
        assert_eq!(map.get_file(b).map(|f| f.text.as_str()), Some("b 2"));
        assert_eq!(map.files().len(), 2);
    }
}

use std::io::Write;
use std::path::Path;

use log::debug;
use wf_core::TokenSeq;

use crate::error::SaveError;

/// The text of the top-level file: every laid-out token that did not come from
/// an include, in layout order.
pub fn render(tokens: &TokenSeq) -> String {
    tokens
        .layout()
        .filter(|(_, t)| t.include_depth == 0)
        .map(|(_, t)| t.to_string())
        .collect()
}

/// Replace `path` with `contents`.
///
/// The data goes to a temporary file in the same directory first, which is then
/// renamed over the destination, so a failure leaves the old file intact.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), SaveError> {
    let io_err = |source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("saved {} bytes to {}", contents.len(), path.display());
    Ok(())
}

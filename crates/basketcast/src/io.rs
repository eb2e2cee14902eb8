//! Output helpers

use std::fs;
use std::io;
use std::path::Path;

/// Write `content` to `path` through a sibling temp file and a rename, so a
/// reader never observes a half-written report.
pub fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

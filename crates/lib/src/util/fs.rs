//! Filesystem helpers.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write `content` to `path` so readers observe either the old or the new file.
///
/// Data goes to a uniquely named temp file in the destination directory, is
/// flushed to disk, then renamed over `path`. Parent directories are created.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
  let dir = match path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir,
    _ => Path::new("."),
  };
  fs::create_dir_all(dir)?;

  let mut temp = tempfile::Builder::new().prefix(".plonk-").suffix(".tmp").tempfile_in(dir)?;
  temp.write_all(content)?;
  temp.as_file().sync_all()?;
  temp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

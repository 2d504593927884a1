use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::record::LockFileV1;
use super::{LEGACY_LOCK_VERSION, LOCK_VERSION, LockError, LockRecord};
use crate::consts::LOCK_FILENAME;
use crate::util::fs::atomic_write;

/// Reads and writes the lock file at a fixed path.
///
/// Writes replace the file atomically. Concurrent writers are not
/// coordinated: the last rename wins.
#[derive(Debug, Clone)]
pub struct LockStore {
  path: PathBuf,
}

impl LockStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Store for `plonk.lock` inside `dir`.
  pub fn in_dir(dir: &Path) -> Self {
    Self::new(dir.join(LOCK_FILENAME))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Read the lock file in whichever version it was written.
  ///
  /// Returns `Ok(None)` if the file doesn't exist. The version is sniffed
  /// from the raw document before decoding; a document without one is
  /// treated as version 1 and an empty document as an empty record.
  pub fn read(&self) -> Result<Option<LockRecord>, LockError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(LockError::Read(e)),
    };

    let doc: serde_yaml::Value = serde_yaml::from_str(&content).map_err(LockError::Parse)?;
    if doc.is_null() {
      debug!(path = %self.path.display(), "lock file is empty");
      return Ok(Some(LockRecord::new()));
    }

    let version = match doc.get("version") {
      None => LEGACY_LOCK_VERSION,
      Some(value) => value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| LockError::InvalidVersion(format!("{:?}", value)))?,
    };

    let record = match version {
      LEGACY_LOCK_VERSION => serde_yaml::from_value::<LockFileV1>(doc)
        .map_err(LockError::Parse)?
        .into_record(),
      LOCK_VERSION => serde_yaml::from_value::<LockRecord>(doc).map_err(LockError::Parse)?,
      other => return Err(LockError::UnsupportedVersion(other)),
    };

    debug!(path = %self.path.display(), version, resources = record.resources.len(), "read lock file");
    Ok(Some(record))
  }

  /// Read the lock file, or an empty current-format record if there is none.
  pub fn load(&self) -> Result<LockRecord, LockError> {
    Ok(self.read()?.unwrap_or_default())
  }

  /// Migrate `record` to the current format and write it atomically.
  pub fn write(&self, record: &mut LockRecord) -> Result<(), LockError> {
    if let Some(from) = record.migrate()?
      && from != LOCK_VERSION
    {
      info!(path = %self.path.display(), from, to = LOCK_VERSION, "migrated lock file");
    }

    let content = serde_yaml::to_string(&*record).map_err(LockError::Serialize)?;
    atomic_write(&self.path, content.as_bytes()).map_err(LockError::Write)?;

    debug!(path = %self.path.display(), resources = record.resources.len(), "wrote lock file");
    Ok(())
  }

  /// Record a package as managed.
  pub fn add_package(&self, manager: &str, name: &str, version: &str) -> Result<(), LockError> {
    let mut record = self.load()?;
    record.add_package(manager, name, version);
    self.write(&mut record)
  }

  /// Forget a package. Returns true if it was recorded.
  pub fn remove_package(&self, manager: &str, name: &str) -> Result<bool, LockError> {
    let mut record = self.load()?;
    let removed = record.remove_package(manager, name);
    if removed {
      self.write(&mut record)?;
    }
    Ok(removed)
  }
}

//! The dotfile domain.
//!
//! Every file under the config directory (except `plonk.yaml`, `plonk.lock`
//! and ignored paths) is a desired dotfile. Its destination is the same
//! relative path under `$HOME` with a leading dot, so `zshrc` deploys to
//! `~/.zshrc` and `config/nvim/init.lua` to `~/.config/nvim/init.lua`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use glob::Pattern;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{ApplyOutcome, Resource, ResourceError, already_managed};
use crate::consts::{CONFIG_FILENAME, LOCK_FILENAME};
use crate::lock::ResourceEntry;
use crate::platform::dotfile_destination;
use crate::types::{DriftComparator, DriftError, Domain, Item, ItemState, META_DESTINATION, META_SOURCE};
use crate::util::fs::atomic_write;
use crate::util::hash::hash_file;

pub const RESOURCE_ID: &str = "dotfiles";

pub const DEFAULT_IGNORE_PATTERNS: [&str; 5] = [".DS_Store", ".git", "*.swp", "*.tmp", "*.backup"];

/// Compares a dotfile source with its deployed copy by SHA-256.
#[derive(Debug, Clone)]
pub struct FileComparator {
  pub source: PathBuf,
  pub destination: PathBuf,
}

impl DriftComparator for FileComparator {
  fn compare(&self) -> Result<bool, DriftError> {
    let read = |path: &Path| {
      hash_file(path).map_err(|source| DriftError::Read {
        path: path.to_path_buf(),
        source,
      })
    };
    Ok(read(&self.source)? == read(&self.destination)?)
  }
}

#[derive(Debug)]
pub struct DotfileResource {
  config_dir: PathBuf,
  home_dir: PathBuf,
  ignore: Vec<Pattern>,
  timeout: Duration,
}

impl DotfileResource {
  pub fn new(
    config_dir: impl Into<PathBuf>,
    home_dir: impl Into<PathBuf>,
    ignore_patterns: &[String],
    timeout: Duration,
  ) -> Result<Self, ResourceError> {
    let ignore = ignore_patterns
      .iter()
      .map(|p| {
        Pattern::new(p).map_err(|source| ResourceError::InvalidPattern {
          pattern: p.clone(),
          source,
        })
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self {
      config_dir: config_dir.into(),
      home_dir: home_dir.into(),
      ignore,
      timeout,
    })
  }

  /// True when any component of `relative` matches an ignore pattern.
  fn is_ignored(&self, relative: &Path) -> bool {
    relative.components().any(|c| {
      let part = c.as_os_str().to_string_lossy();
      self.ignore.iter().any(|p| p.matches(&part))
    })
  }

  fn is_reserved(relative: &Path) -> bool {
    relative == Path::new(CONFIG_FILENAME) || relative == Path::new(LOCK_FILENAME)
  }

  fn scan(&self) -> Result<Vec<Item>, ResourceError> {
    if !self.config_dir.is_dir() {
      debug!(path = %self.config_dir.display(), "config directory missing, no dotfiles");
      return Ok(Vec::new());
    }

    let root = self.config_dir.as_path();
    let walker = WalkDir::new(root)
      .min_depth(1)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| !self.is_ignored(e.path().strip_prefix(root).unwrap_or(e.path())));

    let mut items = Vec::new();
    for entry in walker {
      let entry = entry.map_err(|source| ResourceError::Scan {
        path: root.to_path_buf(),
        source,
      })?;
      if !entry.file_type().is_file() {
        continue;
      }
      let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
      if Self::is_reserved(relative) {
        continue;
      }

      let source = entry.path().to_path_buf();
      let destination = dotfile_destination(&self.home_dir, relative);
      let name = relative.to_string_lossy().replace('\\', "/");
      items.push(
        Item::dotfile(name, destination.to_string_lossy())
          .with_metadata(META_SOURCE, source.to_string_lossy())
          .with_comparator(Arc::new(FileComparator { source, destination })),
      );
    }
    Ok(items)
  }

  async fn deploy(&self, cancel: &CancellationToken, item: &Item) -> Result<ResourceEntry, ResourceError> {
    if cancel.is_cancelled() {
      return Err(ResourceError::Cancelled { item: item.name.clone() });
    }
    let source = metadata_path(item, META_SOURCE)?;
    let destination = metadata_path(item, META_DESTINATION)?;

    let copy = {
      let (source, destination) = (source.clone(), destination.clone());
      tokio::task::spawn_blocking(move || copy_file(&source, &destination))
    };

    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(ResourceError::Cancelled { item: item.name.clone() }),
      result = tokio::time::timeout(self.timeout, copy) => match result {
        Err(_) => Err(ResourceError::Timeout { item: item.name.clone(), timeout: self.timeout }),
        Ok(Err(join)) => Err(ResourceError::Io { path: destination.clone(), source: io::Error::other(join) }),
        Ok(Ok(copied)) => copied,
      },
    }?;

    info!(dotfile = %item.name, destination = %destination.display(), "deployed dotfile");
    Ok(ResourceEntry::dotfile(
      &item.name,
      &source.to_string_lossy(),
      &destination.to_string_lossy(),
    ))
  }
}

fn metadata_path(item: &Item, field: &'static str) -> Result<PathBuf, ResourceError> {
  item
    .meta_str(field)
    .filter(|s| !s.is_empty())
    .map(PathBuf::from)
    .ok_or_else(|| ResourceError::MissingMetadata {
      item: item.name.clone(),
      field,
    })
}

/// Atomically replace `destination` with the contents and permissions of `source`.
fn copy_file(source: &Path, destination: &Path) -> Result<(), ResourceError> {
  let io_err = |path: &Path| {
    let path = path.to_path_buf();
    move |source| ResourceError::Io { path, source }
  };
  let content = std::fs::read(source).map_err(io_err(source))?;
  let permissions = std::fs::metadata(source).map_err(io_err(source))?.permissions();
  atomic_write(destination, &content).map_err(io_err(destination))?;
  std::fs::set_permissions(destination, permissions).map_err(io_err(destination))?;
  Ok(())
}

#[async_trait]
impl Resource for DotfileResource {
  fn id(&self) -> &str {
    RESOURCE_ID
  }

  fn domain(&self) -> Domain {
    Domain::Dotfile
  }

  fn desired(&self) -> Result<Vec<Item>, ResourceError> {
    self.scan()
  }

  /// Desired dotfiles whose destination exists. Other files in `$HOME` are
  /// never reported, so dotfiles are never untracked.
  async fn actual(&self, cancel: &CancellationToken) -> Result<Vec<Item>, ResourceError> {
    if cancel.is_cancelled() {
      return Err(ResourceError::Cancelled {
        item: RESOURCE_ID.to_string(),
      });
    }
    Ok(
      self
        .scan()?
        .into_iter()
        .filter(|item| item.meta_str(META_DESTINATION).is_some_and(|d| Path::new(d).exists()))
        .map(|mut item| {
          item.comparator = None;
          item.with_state(ItemState::Untracked)
        })
        .collect(),
    )
  }

  async fn apply(&self, cancel: &CancellationToken, item: &Item) -> Result<ApplyOutcome, ResourceError> {
    if item.domain != Domain::Dotfile {
      return Err(ResourceError::WrongDomain {
        item: item.name.clone(),
        domain: item.domain,
      });
    }
    match item.state {
      ItemState::Missing => Ok(ApplyOutcome::Added(self.deploy(cancel, item).await?)),
      ItemState::Degraded => Ok(ApplyOutcome::Updated(self.deploy(cancel, item).await?)),
      ItemState::Untracked => Ok(ApplyOutcome::Skipped(
        "automatic removal of untracked dotfiles is not supported".to_string(),
      )),
      ItemState::Managed => Ok(already_managed(item)),
    }
  }
}

use std::path::{Path, PathBuf};

use crate::consts::{APP_NAME, CONFIG_DIR_ENV};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
  #[error("{0} is not set")]
  MissingEnv(&'static str),
}

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> Result<PathBuf, PathError> {
  env_path("USERPROFILE").ok_or(PathError::MissingEnv("USERPROFILE"))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> Result<PathBuf, PathError> {
  env_path("HOME").ok_or(PathError::MissingEnv("HOME"))
}

/// Returns the directory holding `plonk.yaml`, `plonk.lock` and dotfile sources.
///
/// `$PLONK_DIR` wins, then `$XDG_CONFIG_HOME/plonk`, then `~/.config/plonk`.
pub fn config_dir() -> Result<PathBuf, PathError> {
  if let Some(dir) = env_path(CONFIG_DIR_ENV) {
    return Ok(dir);
  }
  let config_home = match env_path("XDG_CONFIG_HOME") {
    Some(dir) => dir,
    None => home_dir()?.join(".config"),
  };
  Ok(config_home.join(APP_NAME))
}

/// Where the dotfile source at `relative` (inside the config dir) lives under `home`.
///
/// `zshrc` becomes `~/.zshrc` and `config/nvim/init.lua` becomes `~/.config/nvim/init.lua`.
pub fn dotfile_destination(home: &Path, relative: &Path) -> PathBuf {
  let mut dotted = std::ffi::OsString::from(".");
  dotted.push(relative.as_os_str());
  home.join(dotted)
}

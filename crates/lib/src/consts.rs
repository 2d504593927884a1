//! Global constants shared across the crate.

use std::time::Duration;

pub const APP_NAME: &str = "plonk";

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILENAME: &str = "plonk.yaml";

/// Name of the lock file inside the config directory.
pub const LOCK_FILENAME: &str = "plonk.lock";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "PLONK_DIR";

/// Tool output attached to errors is cut to this many characters.
pub const MAX_ERROR_OUTPUT: usize = 500;

pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

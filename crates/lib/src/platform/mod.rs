//! Host-specific locations.

pub mod paths;

pub use paths::{PathError, config_dir, dotfile_destination, home_dir};

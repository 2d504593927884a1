//! plonk-lib: package and dotfile reconciliation for plonk
//!
//! The crate is organised around one loop, Desired → Actual → Reconcile → Apply:
//! - `types`: the `Item` model shared by every domain, and manager configs
//! - `reconcile`: partitions desired and actual items into states
//! - `managers`: adapters over external package managers
//! - `resource`: the package and dotfile domains
//! - `lock`: the versioned lock file recording what plonk manages
//! - `orchestrator`: drives apply across resources, with hooks
//! - `operations`: direct install/uninstall/upgrade/info/search

pub mod config;
pub mod consts;
pub mod context;
pub mod lock;
pub mod managers;
pub mod operations;
pub mod orchestrator;
pub mod platform;
pub mod reconcile;
pub mod resource;
pub mod types;
pub mod util;

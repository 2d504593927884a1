//! Shared vocabulary for the reconciliation engine, the lock store and the adapters.
//!
//! Everything that more than one layer needs to name lives here so that the
//! lock store, the manager adapters and the reconciler never depend on each
//! other's concrete types.

mod item;
mod manager;

pub use item::*;
pub use manager::*;

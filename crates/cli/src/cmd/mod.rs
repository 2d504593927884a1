mod apply;
mod info;
mod packages;
mod search;
mod status;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use plonk_lib::context::Context;
use plonk_lib::managers::SystemExecutor;

pub use apply::cmd_apply;
pub use info::cmd_info;
pub use packages::{cmd_install, cmd_uninstall, cmd_upgrade};
pub use search::cmd_search;
pub use status::cmd_status;

/// Load configuration and registry from the environment.
fn load_context() -> Result<Context> {
  Context::load(Arc::new(SystemExecutor)).context("Failed to load configuration")
}

/// Run `work` on a fresh runtime. Ctrl-C cancels the token it receives.
fn run<F, Fut, T>(work: F) -> Result<T>
where
  F: FnOnce(CancellationToken) -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupted, cancelling");
        on_signal.cancel();
      }
    });
    work(cancel).await
  })
}

mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{cmd_apply, cmd_info, cmd_install, cmd_search, cmd_status, cmd_uninstall, cmd_upgrade};
use output::print_error;

/// Environment variable holding the log filter. `RUST_LOG` is the fallback.
const LOG_ENV: &str = "PLONK_LOG";

/// plonk - keep packages and dotfiles in the state you declared
#[derive(Parser)]
#[command(name = "plonk")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Install missing packages and deploy dotfiles
  Apply {
    /// Show what would change without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Uninstall packages that are installed but not managed
    #[arg(long)]
    prune: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show managed, missing, drifted and untracked items
  Status {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Install packages and start managing them
  Install {
    /// Packages as `manager:name` or a bare name for the default manager
    #[arg(required = true)]
    specs: Vec<String>,

    #[arg(long)]
    json: bool,
  },

  /// Uninstall packages and stop managing them
  Uninstall {
    #[arg(required = true)]
    specs: Vec<String>,

    #[arg(long)]
    json: bool,
  },

  /// Upgrade managed packages (all of them when none are named)
  Upgrade {
    specs: Vec<String>,

    #[arg(long)]
    json: bool,
  },

  /// Search every available package manager
  Search {
    /// Search term, or `manager:term` to search one manager
    query: String,

    #[arg(long)]
    json: bool,
  },

  /// Show details about a package
  Info {
    spec: String,

    #[arg(long)]
    json: bool,
  },
}

fn init_logging(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    std::env::var(LOG_ENV)
      .or_else(|_| std::env::var("RUST_LOG"))
      .ok()
      .and_then(|directives| EnvFilter::try_new(directives).ok())
      .unwrap_or_else(|| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let result = match cli.command {
    Commands::Apply { dry_run, prune, json } => cmd_apply(dry_run, prune, json),
    Commands::Status { json } => cmd_status(cli.verbose, json),
    Commands::Install { specs, json } => cmd_install(specs, json),
    Commands::Uninstall { specs, json } => cmd_uninstall(specs, json),
    Commands::Upgrade { specs, json } => cmd_upgrade(specs, json),
    Commands::Search { query, json } => cmd_search(&query, json),
    Commands::Info { spec, json } => cmd_info(&spec, json),
  };

  match result {
    Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::from(1)
    }
  }
}

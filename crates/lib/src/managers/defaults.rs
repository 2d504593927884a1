//! Built-in manager configurations.
//!
//! Managers without a compiled adapter are served entirely from these
//! definitions by the generic adapter. User configuration is merged on top.

use std::collections::BTreeMap;

use crate::types::{CommandConfig, ExtractorConfig, ListConfig, ManagerConfig, ParseStrategy};

const UP_TO_DATE: [&str; 2] = ["already up-to-date", "up to date"];

fn list(command: &[&str], parse: ParseStrategy) -> ListConfig {
  ListConfig {
    command: command.iter().map(|c| c.to_string()).collect(),
    parse,
    ..Default::default()
  }
}

fn brew() -> ManagerConfig {
  ManagerConfig {
    binary: "brew".into(),
    description: "Homebrew (macOS/Linux package manager)".into(),
    install_hint: "Visit https://brew.sh for installation instructions".into(),
    list: list(&["brew", "list", "-1"], ParseStrategy::Lines),
    install: CommandConfig::new(["brew", "install", "{{.Package}}"]).with_idempotent(["already installed"]),
    upgrade: CommandConfig::new(["brew", "upgrade", "{{.Package}}"]).with_idempotent(["already up-to-date"]),
    upgrade_all: CommandConfig::new(["brew", "upgrade"]).with_idempotent(["already up-to-date"]),
    uninstall: CommandConfig::new(["brew", "uninstall", "{{.Package}}"]).with_idempotent(["no such keg", "is not installed"]),
    ..Default::default()
  }
}

fn npm() -> ManagerConfig {
  let mut metadata_extractors = BTreeMap::new();
  metadata_extractors.insert(
    "scope".to_string(),
    ExtractorConfig {
      pattern: Some("^(@[^/]+)/".to_string()),
      group: Some(1),
      ..Default::default()
    },
  );
  metadata_extractors.insert("full_name".to_string(), ExtractorConfig::default());

  ManagerConfig {
    binary: "npm".into(),
    description: "npm (Node.js package manager)".into(),
    install_hint: "Install Node.js from https://nodejs.org/ or use brew install node".into(),
    list: ListConfig {
      field: Some("dependencies".into()),
      ..list(&["npm", "list", "-g", "--depth=0", "--json"], ParseStrategy::JsonMap)
    },
    install: CommandConfig::new(["npm", "install", "-g", "{{.Package}}"]).with_idempotent(["already installed"]),
    upgrade: CommandConfig::new(["npm", "update", "-g", "{{.Package}}"]).with_idempotent(UP_TO_DATE),
    upgrade_all: CommandConfig::new(["npm", "update", "-g"]).with_idempotent(UP_TO_DATE),
    uninstall: CommandConfig::new(["npm", "uninstall", "-g", "{{.Package}}"]),
    metadata_extractors,
    ..Default::default()
  }
}

fn cargo() -> ManagerConfig {
  ManagerConfig {
    binary: "cargo".into(),
    description: "Cargo (Rust package manager)".into(),
    install_hint: "Install Rust from https://rustup.rs/".into(),
    list: ListConfig {
      pattern: Some(r"^(\S+) v[^\s:]+.*:$".into()),
      ..list(&["cargo", "install", "--list"], ParseStrategy::Regex)
    },
    install: CommandConfig::new(["cargo", "install", "{{.Package}}"]).with_idempotent(["already exists", "already installed"]),
    upgrade: CommandConfig::new(["cargo", "install", "--force", "{{.Package}}"]).with_idempotent(UP_TO_DATE),
    uninstall: CommandConfig::new(["cargo", "uninstall", "{{.Package}}"]).with_idempotent(["did not match any packages"]),
    ..Default::default()
  }
}

fn pipx() -> ManagerConfig {
  ManagerConfig {
    binary: "pipx".into(),
    description: "pipx (isolated Python applications)".into(),
    install_hint: "Install pipx with brew install pipx or python -m pip install --user pipx".into(),
    list: list(&["pipx", "list", "--short"], ParseStrategy::Lines),
    install: CommandConfig::new(["pipx", "install", "{{.Package}}"]).with_idempotent(["already installed"]),
    upgrade: CommandConfig::new(["pipx", "upgrade", "{{.Package}}"]).with_idempotent(UP_TO_DATE),
    upgrade_all: CommandConfig::new(["pipx", "upgrade-all"]),
    uninstall: CommandConfig::new(["pipx", "uninstall", "{{.Package}}"]).with_idempotent(["not installed"]),
    ..Default::default()
  }
}

fn gem() -> ManagerConfig {
  ManagerConfig {
    binary: "gem".into(),
    description: "gem (Ruby package manager)".into(),
    install_hint: "Install Ruby from https://ruby-lang.org/ or use brew install ruby".into(),
    // Skips the "*** LOCAL GEMS ***" banner some versions print.
    list: ListConfig {
      pattern: Some(r"^([A-Za-z0-9][\w.-]*)\s*$".into()),
      ..list(&["gem", "list", "--local", "--no-versions"], ParseStrategy::Regex)
    },
    install: CommandConfig::new(["gem", "install", "{{.Package}}", "--user-install"]).with_idempotent(["already installed"]),
    upgrade: CommandConfig::new(["gem", "update", "{{.Package}}"]).with_idempotent(UP_TO_DATE),
    upgrade_all: CommandConfig::new(["gem", "update"]).with_idempotent(UP_TO_DATE),
    uninstall: CommandConfig::new(["gem", "uninstall", "{{.Package}}", "-x"]).with_idempotent(["is not installed"]),
    ..Default::default()
  }
}

fn pnpm() -> ManagerConfig {
  ManagerConfig {
    binary: "pnpm".into(),
    description: "pnpm (Node.js package manager)".into(),
    install_hint: "Install pnpm from https://pnpm.io/ or use brew install pnpm".into(),
    list: ListConfig {
      field: Some("name".into()),
      ..list(&["pnpm", "list", "-g", "--depth=0", "--json"], ParseStrategy::Json)
    },
    install: CommandConfig::new(["pnpm", "add", "-g", "{{.Package}}"]).with_idempotent(["already installed"]),
    upgrade: CommandConfig::new(["pnpm", "update", "-g", "{{.Package}}"]).with_idempotent(UP_TO_DATE),
    upgrade_all: CommandConfig::new(["pnpm", "update", "-g"]).with_idempotent(UP_TO_DATE),
    uninstall: CommandConfig::new(["pnpm", "remove", "-g", "{{.Package}}"]),
    ..Default::default()
  }
}

fn conda() -> ManagerConfig {
  ManagerConfig {
    binary: "conda".into(),
    description: "conda (Python/conda package manager)".into(),
    install_hint: "Install conda via the Anaconda or Miniconda distributions".into(),
    list: ListConfig {
      field: Some("name".into()),
      ..list(&["conda", "list", "--json"], ParseStrategy::Json)
    },
    install: CommandConfig::new(["conda", "install", "-y", "{{.Package}}"]).with_idempotent(["already installed"]),
    upgrade: CommandConfig::new(["conda", "update", "-y", "{{.Package}}"]).with_idempotent(UP_TO_DATE),
    upgrade_all: CommandConfig::new(["conda", "update", "-y", "--all"]).with_idempotent(UP_TO_DATE),
    uninstall: CommandConfig::new(["conda", "remove", "-y", "{{.Package}}"]).with_idempotent(["packagesnotfounderror"]),
    ..Default::default()
  }
}

fn uv() -> ManagerConfig {
  ManagerConfig {
    binary: "uv".into(),
    description: "uv (Python package manager)".into(),
    install_hint: "Install uv from https://docs.astral.sh/uv/ or use brew install uv".into(),
    // Tool lines look like "black v24.1.0"; executables follow as "- black".
    list: ListConfig {
      pattern: Some(r"^([^\s-]\S*) v\S+".into()),
      ..list(&["uv", "tool", "list"], ParseStrategy::Regex)
    },
    install: CommandConfig::new(["uv", "tool", "install", "{{.Package}}"]).with_idempotent(["already installed"]),
    upgrade: CommandConfig::new(["uv", "tool", "upgrade", "{{.Package}}"]).with_idempotent(UP_TO_DATE),
    upgrade_all: CommandConfig::new(["uv", "tool", "upgrade", "--all"]).with_idempotent(UP_TO_DATE),
    uninstall: CommandConfig::new(["uv", "tool", "uninstall", "{{.Package}}"]).with_idempotent(["is not installed"]),
    ..Default::default()
  }
}

/// Every built-in manager configuration, keyed by manager name.
pub fn default_configs() -> BTreeMap<String, ManagerConfig> {
  [
    ("brew", brew()),
    ("cargo", cargo()),
    ("conda", conda()),
    ("gem", gem()),
    ("npm", npm()),
    ("pipx", pipx()),
    ("pnpm", pnpm()),
    ("uv", uv()),
  ]
  .into_iter()
  .map(|(name, config)| (name.to_string(), config))
  .collect()
}

pub fn default_config(name: &str) -> Option<ManagerConfig> {
  default_configs().remove(name)
}

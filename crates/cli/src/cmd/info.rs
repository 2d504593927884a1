use anyhow::{Context, Result};

use plonk_lib::operations::info;

use crate::output::{print_json, print_stat, print_success};

pub fn cmd_info(spec: &str, json: bool) -> Result<i32> {
  let ctx = super::load_context()?;
  let spec = spec.to_string();
  let details = super::run(|cancel| async move { info(&ctx, &cancel, &spec).await.context("Info failed") })?;

  if json {
    print_json(&details)?;
    return Ok(0);
  }

  let info = &details.info;
  print_success(&format!("{}:{}", info.manager, info.name));
  if let Some(description) = &info.description {
    print_stat("Description", description);
  }
  if let Some(version) = &info.version {
    print_stat("Version", version);
  }
  if let Some(homepage) = &info.homepage {
    print_stat("Homepage", homepage);
  }
  print_stat("Installed", if info.installed { "yes" } else { "no" });
  print_stat("Managed", if details.managed { "yes" } else { "no" });
  Ok(0)
}

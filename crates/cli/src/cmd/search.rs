use anyhow::{Context, Result};

use plonk_lib::operations::search;

use crate::output::{print_info, print_json, symbols};

/// Search all managers at once, or one with `manager:query`.
pub fn cmd_search(query: &str, json: bool) -> Result<i32> {
  let ctx = super::load_context()?;
  let query = query.to_string();
  let results = super::run(|cancel| async move { search(&ctx, &cancel, &query).await.context("Search failed") })?;

  if json {
    print_json(&results)?;
  } else if results.is_empty() {
    print_info("No packages found");
  } else {
    for result in &results {
      println!("{}:", result.manager);
      for package in &result.packages {
        println!("  {} {}", symbols::INFO, package);
      }
    }
  }
  Ok(0)
}

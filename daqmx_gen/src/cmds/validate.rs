/* Validate and describe commands - schema and solver checks without emission */

use super::common::{load, solve_and_report, Inputs};
use anyhow::Context;
use daqmx_loader::{describe, fingerprint};
use std::fs;
use std::path::PathBuf;

pub fn run_validate(inputs: Inputs, verbose: bool) -> anyhow::Result<()> {
  let catalog = load(&inputs, verbose)?;
  let surface = solve_and_report(&catalog, &inputs.coercion, verbose)?;
  println!(
    "[✓] {} {} is valid ({} functions, fingerprint {})",
    surface.package,
    surface.catalog_version,
    surface.functions.len(),
    surface.fingerprint
  );
  Ok(())
}

/* Print or write the canonical description; reloading it yields an equal catalog */
pub fn run_describe(inputs: Inputs, output: Option<PathBuf>) -> anyhow::Result<()> {
  let catalog = load(&inputs, false)?;
  let text = describe(&catalog)?;
  match output {
    Some(path) => {
      fs::write(&path, &text).with_context(|| format!("failed to write '{}'", path.display()))?;
      println!("[✓] Wrote description to {}", path.display());
      println!("[~] Fingerprint: {}", fingerprint(&catalog)?);
    }
    None => print!("{}", text),
  }
  Ok(())
}

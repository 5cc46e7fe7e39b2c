/* Codegen command - emit bindings, IPC projection, description and IR */

use super::common::{load, solve_and_report, Inputs};
use crate::codegen::generate_all;

/* Execute the codegen command */
pub fn run(inputs: Inputs, verbose: bool) -> anyhow::Result<()> {
  if verbose {
    println!("DAQmx Generator - Code Generation Tool");
    println!("======================================\n");
    println!("[~] Configuration:");
    println!("  Catalog: {}", inputs.catalog.display());
    if let Some(enums) = &inputs.enums {
      println!("  Enum table: {}", enums.display());
    }
    println!("  Output directory: {}", inputs.output_dir.display());
    println!("  Targets: {:?}", inputs.targets);
    if !inputs.coercion.is_empty() {
      println!("  Coercion policies: {}", inputs.coercion.len());
      for (native, policy) in &inputs.coercion {
        println!("    - {}: {:?} / {:?}", native, policy.narrowing, policy.widening);
      }
    }
    println!();
  }

  let catalog = load(&inputs, verbose)?;
  let surface = solve_and_report(&catalog, &inputs.coercion, verbose)?;

  let output_dir = inputs.output_dir.to_string_lossy();
  let written = generate_all(&surface, &catalog, &inputs.targets, &output_dir)?;
  if verbose {
    for path in &written {
      println!("    - {}", path.display());
    }
  }
  Ok(())
}

/* Common steps shared between the codegen, analyze and validate commands */

use crate::error::SolverError;
use crate::solver::solve_function;
use crate::surface::{build_surface_from_catalog, SurfaceCatalog};
use anyhow::Context;
use daqmx_loader::{fingerprint, load_catalog_with_enums, GeneratorConfig, Target};
use daqmx_types::{Catalog, CoercionTable};
use std::path::{Path, PathBuf};

pub const DEFAULT_CATALOG: &str = "catalog/nidaqmx.catalog.yaml";

/* Config file values with command-line overrides applied */
#[derive(Debug, Clone)]
pub struct Inputs {
  pub catalog: PathBuf,
  pub enums: Option<PathBuf>,
  pub output_dir: PathBuf,
  pub targets: Vec<Target>,
  pub coercion: CoercionTable,
}

pub fn resolve_inputs(
  config: Option<&Path>,
  catalog: Option<PathBuf>,
  enums: Option<PathBuf>,
  output_dir: Option<PathBuf>,
  targets: Vec<Target>,
) -> anyhow::Result<Inputs> {
  let config = GeneratorConfig::discover(config).context("failed to load generator config")?;
  let targets = if targets.is_empty() {
    config.targets_or_all()
  } else {
    GeneratorConfig { targets, ..GeneratorConfig::default() }.targets_or_all()
  };
  Ok(Inputs {
    catalog: catalog.or(config.catalog).unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG)),
    enums: enums.or(config.enums),
    output_dir: output_dir.or(config.output_dir).unwrap_or_else(|| PathBuf::from(crate::codegen::OUTPUT_DIR)),
    targets,
    coercion: config.coercion,
  })
}

pub fn load(inputs: &Inputs, verbose: bool) -> anyhow::Result<Catalog> {
  if verbose {
    println!("[~] Loading catalog {}...", inputs.catalog.display());
    if let Some(enums) = &inputs.enums {
      println!("    Enum table: {}", enums.display());
    }
  }
  let catalog = load_catalog_with_enums(&inputs.catalog, inputs.enums.as_deref())
    .with_context(|| format!("failed to load catalog '{}'", inputs.catalog.display()))?;
  if verbose {
    println!(
      "[✓] Loaded {} {}: {} functions, {} enums",
      catalog.catalog.package,
      catalog.catalog.version,
      catalog.functions.len(),
      catalog.enums.len()
    );
  }
  Ok(catalog)
}

/* Solve every function on its own so one report lists all failures */
pub fn check_functions(catalog: &Catalog, coercion: &CoercionTable) -> Vec<SolverError> {
  catalog
    .functions
    .iter()
    .filter_map(|(name, entry)| {
      let symbol = entry.native_symbol(name, &catalog.catalog.symbol_prefix);
      solve_function(name, &symbol, entry, coercion).err()
    })
    .collect()
}

/* Build the surface, printing the solver report when verbose or failing */
pub fn solve_and_report(catalog: &Catalog, coercion: &CoercionTable, verbose: bool) -> anyhow::Result<SurfaceCatalog> {
  let failures = check_functions(catalog, coercion);

  if verbose || !failures.is_empty() {
    println!("\n[~] Size-Relation Solver Results:");
    println!("==================================");
    if failures.is_empty() {
      println!("[✓] All {} functions resolved", catalog.functions.len());
    } else {
      println!("[✗] {} function(s) failed to resolve:", failures.len());
      for failure in &failures {
        println!("  [!] {} ({}): {}", failure.function(), failure.category(), failure);
      }
    }
  }

  if !failures.is_empty() {
    anyhow::bail!("Solving failed. Cannot proceed with emission.");
  }

  let fingerprint = fingerprint(catalog).context("failed to fingerprint catalog")?;
  let surface = build_surface_from_catalog(catalog, coercion, &fingerprint)?;
  if verbose {
    println!(
      "[✓] Surface built: {} functions, {} classes, {} shard groups",
      surface.functions.len(),
      surface.classes.len(),
      surface.shards.len()
    );
    println!("[~] Fingerprint: {}", surface.fingerprint);
  }
  Ok(surface)
}

use crate::error::{LoadError, LoadResult, SchemaError, CATALOG_SCOPE};
use daqmx_types::CoercionTable;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/* Default config file name looked up next to the working directory */
pub const DEFAULT_CONFIG_FILE: &str = "daqmx.yaml";

/* Emission targets */
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Rust,
    Proto,
    Description,
    Ir,
}

impl Target {
    pub fn all() -> Vec<Target> {
        vec![Target::Rust, Target::Proto, Target::Description, Target::Ir]
    }
}

/* Generator configuration. Every field is optional; command-line flags win. */
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /* External enum table merged into the catalog */
    #[serde(default)]
    pub enums: Option<PathBuf>,

    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub targets: Vec<Target>,

    /* Per-native-type policy for coerced buffers */
    #[serde(default)]
    pub coercion: CoercionTable,
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> LoadResult<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        let mut config: GeneratorConfig = serde_yml::from_str(&text)
            .map_err(|e| LoadError::Parse { path: path.to_path_buf(), message: e.to_string() })?;

        /* relative paths are relative to the config file */
        if let Some(base) = path.parent() {
            config.catalog = config.catalog.map(|p| rebase(base, p));
            config.enums = config.enums.map(|p| rebase(base, p));
            config.output_dir = config.output_dir.map(|p| rebase(base, p));
        }

        for key in config.coercion.keys() {
            let known = key
                .parse::<daqmx_types::TypeToken>()
                .map(|t| t.is_integral_scalar())
                .unwrap_or(false);
            if !known {
                return Err(SchemaError::new(
                    CATALOG_SCOPE,
                    format!("coercion.{}", key),
                    "coercion policies are keyed by integral native element types",
                )
                .into());
            }
        }

        debug!("loaded generator config {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else `daqmx.yaml` when present, else defaults.
    pub fn discover(path: Option<&Path>) -> LoadResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(Path::new(DEFAULT_CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn targets_or_all(&self) -> Vec<Target> {
        if self.targets.is_empty() {
            Target::all()
        } else {
            let mut targets = self.targets.clone();
            targets.sort();
            targets.dedup();
            targets
        }
    }
}

fn rebase(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqmx_types::Narrowing;
    use std::io::Write;

    #[test]
    fn loads_config_relative_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daqmx.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "catalog: catalog/nidaqmx.yaml\noutput-dir: out\ntargets: [proto, rust, proto]\ncoercion:\n  int16: {{ narrowing: saturate, widening: sign-extend }}"
        )
        .unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.catalog, Some(dir.path().join("catalog/nidaqmx.yaml")));
        assert_eq!(config.output_dir, Some(dir.path().join("out")));
        assert_eq!(config.targets_or_all(), vec![Target::Rust, Target::Proto]);
        assert_eq!(config.coercion["int16"].narrowing, Narrowing::Saturate);
    }

    #[test]
    fn rejects_policies_for_non_integral_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daqmx.yaml");
        std::fs::write(&path, "coercion:\n  float64: { narrowing: wrap, widening: zero-extend }\n").unwrap();
        assert!(matches!(GeneratorConfig::load(&path), Err(LoadError::Schema(_))));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daqmx.yaml");
        std::fs::write(&path, "output: somewhere\n").unwrap();
        assert!(matches!(GeneratorConfig::load(&path), Err(LoadError::Parse { .. })));
    }
}

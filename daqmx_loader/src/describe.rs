use crate::error::{LoadError, LoadResult};
use daqmx_types::Catalog;
use sha2::{Digest, Sha256};

/// Canonical YAML self-description: functions and enums in key order, fields in
/// declaration order, default-valued fields elided. Reloading the output yields
/// an equal catalog.
pub fn describe(catalog: &Catalog) -> LoadResult<String> {
    serde_yml::to_string(catalog).map_err(|e| LoadError::Describe(e.to_string()))
}

/// Hex SHA-256 of the canonical description.
pub fn fingerprint(catalog: &Catalog) -> LoadResult<String> {
    let canonical = describe(catalog)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

//! Catalog File Loading and Validation
//!
//! This crate loads the native function catalog from disk, merges external enum
//! tables, verifies its shape and produces the canonical self-description and
//! fingerprint stamped into generated artifacts.

pub mod config;
pub mod describe;
pub mod error;
pub mod file;
pub mod validate;

// Re-export commonly used items at the crate root
pub use config::{GeneratorConfig, Target, DEFAULT_CONFIG_FILE};
pub use describe::{describe, fingerprint};
pub use error::{LoadError, LoadResult, SchemaError, CATALOG_SCOPE};
pub use file::{load_catalog, load_catalog_with_enums, load_enum_table, merge_enum_table, parse_catalog, SourceFormat};
pub use validate::{validate_catalog, validate_function};

// Re-export daqmx_types for convenience
pub use daqmx_types;

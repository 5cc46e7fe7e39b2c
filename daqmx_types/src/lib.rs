//! DAQmx Catalog Types
//!
//! Pure data structures describing the native function catalog: the type
//! lexicon, function and parameter entries, size and adaptor expressions, and
//! attribute kinds. No file I/O or code generation lives here.

pub mod attribute;
pub mod catalog;
pub mod coercion;
pub mod expr;
pub mod lexicon;

// Re-export commonly used types at the crate root
pub use attribute::*;
pub use catalog::*;
pub use coercion::*;
pub use expr::*;
pub use lexicon::*;

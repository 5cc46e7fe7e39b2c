use crate::codegen::rust_gen::{emit_bindings, emit_ffi, emit_types, RUNTIME_SOURCE};
use crate::error::{GenError, GenResult};
use crate::surface::SurfaceCatalog;
use std::fs;
use std::path::{Path, PathBuf};

pub struct RustCodeGenerator {
  options: RustCodeGeneratorOptions,
}

pub struct RustCodeGeneratorOptions {
  pub output_dir: String,
  /* ffi and types only when false */
  pub emit_bindings: bool,
}

impl Default for RustCodeGeneratorOptions {
  fn default() -> Self {
    Self { output_dir: ".".to_string(), emit_bindings: true }
  }
}

impl RustCodeGenerator {
  pub fn new(options: RustCodeGeneratorOptions) -> Self {
    Self { options }
  }

  /// File name and contents of every emitted module. Identical surfaces render
  /// to identical bytes.
  pub fn render(&self, surface: &SurfaceCatalog) -> Vec<(String, String)> {
    let mut files = Vec::new();
    files.push(("mod.rs".to_string(), self.emit_root(surface)));
    files.push(("runtime.rs".to_string(), RUNTIME_SOURCE.trim_start().to_string()));
    files.push(("ffi.rs".to_string(), emit_ffi(surface)));
    files.push(("types.rs".to_string(), emit_types(surface)));
    if self.options.emit_bindings {
      files.push(("bindings.rs".to_string(), emit_bindings(surface)));
    }
    files
  }

  pub fn emit_code(self, surface: &SurfaceCatalog) -> GenResult<Vec<PathBuf>> {
    let dir = Path::new(&self.options.output_dir).join("rust");
    fs::create_dir_all(&dir).map_err(|err| emit_error(&dir, err))?;

    let mut written = Vec::new();
    for (name, contents) in self.render(surface) {
      let path = dir.join(&name);
      fs::write(&path, contents).map_err(|err| emit_error(&path, err))?;
      written.push(path);
    }
    Ok(written)
  }

  fn emit_root(&self, surface: &SurfaceCatalog) -> String {
    let mut output = String::new();
    output.push_str(&format!(
      "// Generated from {} {} (catalog fingerprint {}). Do not edit.\n\n",
      surface.package, surface.catalog_version, surface.fingerprint
    ));
    output.push_str("pub mod runtime;\n");
    output.push_str("pub mod ffi;\n");
    output.push_str("pub mod types;\n");
    if self.options.emit_bindings {
      output.push_str("pub mod bindings;\n");
    }
    output.push('\n');
    output.push_str("pub use runtime::{CVIAbsoluteTime, DaqmxError, Outcome, Subscription, TaskHandle};\n");
    output.push_str("pub use types::*;\n");
    if self.options.emit_bindings {
      output.push_str("pub use bindings::*;\n");
    }
    output
  }
}

pub(crate) fn emit_error(path: &Path, err: std::io::Error) -> GenError {
  GenError::Emit { path: path.display().to_string(), message: err.to_string() }
}

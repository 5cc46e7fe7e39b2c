pub mod proto;
pub mod rust;
pub mod rust_gen;
pub mod shared;

use crate::error::{GenError, GenResult};
use crate::surface::SurfaceCatalog;
use daqmx_loader::{describe, Target};
use daqmx_types::Catalog;
use std::fs;
use std::path::{Path, PathBuf};

pub const OUTPUT_DIR: &str = "generated";
pub const DESCRIPTION_FILE: &str = "catalog.description.yaml";
pub const SURFACE_JSON_FILE: &str = "surface.json";
pub const SURFACE_PROTOBUF_FILE: &str = "surface.pb";

/* Emit every requested target under `output_dir`. Nothing is written for a
 * target until the surface has been built, so a solver failure leaves no
 * partial output behind. */
pub fn generate_all(
    surface: &SurfaceCatalog,
    catalog: &Catalog,
    targets: &[Target],
    output_dir: &str,
) -> GenResult<Vec<PathBuf>> {
    println!("[*] Starting code generation...");
    fs::create_dir_all(output_dir).map_err(|err| rust::emit_error(Path::new(output_dir), err))?;
    let mut written = Vec::new();

    for target in targets {
        match target {
            Target::Rust => {
                let rust_options = rust::RustCodeGeneratorOptions {
                    output_dir: output_dir.to_string(),
                    emit_bindings: true,
                };
                let files = rust::RustCodeGenerator::new(rust_options).emit_code(surface)?;
                println!("[✓] Generated Rust bindings: {}/rust ({} files)", output_dir, files.len());
                written.extend(files);
            }
            Target::Proto => {
                let proto_options = proto::ProtoCodeGeneratorOptions {
                    output_dir: output_dir.to_string(),
                    package: None,
                };
                let path = proto::ProtoCodeGenerator::new(proto_options).emit_code(surface)?;
                println!("[✓] Generated IPC projection: {}", path.display());
                written.push(path);
            }
            Target::Description => {
                let path = Path::new(output_dir).join(DESCRIPTION_FILE);
                let text = describe(catalog)?;
                fs::write(&path, text).map_err(|err| rust::emit_error(&path, err))?;
                println!("[✓] Generated catalog description: {}", path.display());
                written.push(path);
            }
            Target::Ir => {
                let json_path = Path::new(output_dir).join(SURFACE_JSON_FILE);
                let json = shared::surface_to_json(surface).map_err(|err| encode_error(&json_path, err))?;
                fs::write(&json_path, json).map_err(|err| rust::emit_error(&json_path, err))?;

                let pb_path = Path::new(output_dir).join(SURFACE_PROTOBUF_FILE);
                let bytes = shared::surface_to_protobuf(surface).map_err(|err| encode_error(&pb_path, err))?;
                fs::write(&pb_path, bytes).map_err(|err| rust::emit_error(&pb_path, err))?;
                println!("[✓] Generated surface IR: {} and {}", json_path.display(), pb_path.display());
                written.push(json_path);
                written.push(pb_path);
            }
        }
    }

    println!("[✓] Code generation complete!");
    Ok(written)
}

fn encode_error(path: &Path, err: impl std::fmt::Display) -> GenError {
    GenError::Emit { path: path.display().to_string(), message: err.to_string() }
}

use daqmx_gen::codegen::proto::{ProtoCodeGenerator, ProtoCodeGeneratorOptions};
use daqmx_gen::codegen::rust::{RustCodeGenerator, RustCodeGeneratorOptions};
use daqmx_gen::codegen::{generate_all, DESCRIPTION_FILE, SURFACE_JSON_FILE, SURFACE_PROTOBUF_FILE};
use daqmx_gen::{build_surface_from_catalog, GenError, SurfaceCatalog};
use daqmx_loader::{fingerprint, load_catalog, GeneratorConfig, Target};
use daqmx_types::Catalog;
use std::fs;
use std::path::Path;

fn sample() -> (Catalog, SurfaceCatalog) {
    let config = GeneratorConfig::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("../daqmx.yaml")).unwrap();
    let catalog = load_catalog(&config.catalog.clone().unwrap()).unwrap();
    let fp = fingerprint(&catalog).unwrap();
    let surface = build_surface_from_catalog(&catalog, &config.coercion, &fp).unwrap();
    (catalog, surface)
}

fn rust_files(surface: &SurfaceCatalog) -> Vec<(String, String)> {
    RustCodeGenerator::new(RustCodeGeneratorOptions::default()).render(surface)
}

fn file<'a>(files: &'a [(String, String)], name: &str) -> &'a str {
    files
        .iter()
        .find(|(file, _)| file == name)
        .map(|(_, contents)| contents.as_str())
        .unwrap_or_else(|| panic!("{} was not emitted", name))
}

#[test]
fn rust_emission_is_byte_identical() {
    let (_, surface) = sample();
    let first = rust_files(&surface);
    let second = rust_files(&sample().1);
    assert_eq!(first, second);

    let names: Vec<&str> = first.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["mod.rs", "runtime.rs", "ffi.rs", "types.rs", "bindings.rs"]);
    assert!(file(&first, "mod.rs").contains(&surface.fingerprint));
}

#[test]
fn ffi_keeps_native_order() {
    let (_, surface) = sample();
    let files = rust_files(&surface);
    let ffi = file(&files, "ffi.rs");

    let write = ffi
        .lines()
        .find(|line| line.contains("pub fn DAQmxWriteAnalogF64("))
        .expect("WriteAnalogF64 declaration");
    let task = write.find("taskHandle").unwrap();
    let count = write.find("numSampsPerChan").unwrap();
    let samples = write.find("writeArray").unwrap();
    let reserved = write.find("reserved").unwrap();
    assert!(task < count && count < samples && samples < reserved, "{}", write);

    /* shards share one declaration */
    assert_eq!(ffi.matches("pub fn DAQmxGetChanAttribute(").count(), 1);
    assert!(ffi.contains("pub fn DAQmxSetDigitalPowerUpStates("));
}

#[test]
fn bindings_expose_the_surface() {
    let (_, surface) = sample();
    let files = rust_files(&surface);
    let bindings = file(&files, "bindings.rs");

    assert!(bindings.contains("pub struct Task {\n  handle: TaskHandle,\n}"));
    assert!(bindings.contains("pub fn create_task(session_name: Option<&str>) -> Result<Outcome<Task>, DaqmxError>"));
    assert!(bindings.contains("pub fn write_analog_f64("));
    assert!(bindings.contains("pub fn set_digital_power_up_states("));
    assert!(bindings.contains("pub fn register_every_n_samples_event("));
    assert!(bindings.contains("pub fn get_chan_attribute("));
    /* hidden sizes never reach a signature */
    let write = bindings
        .lines()
        .find(|line| line.contains("pub fn write_analog_f64("))
        .unwrap_or_default();
    assert!(!write.contains("num_samps_per_chan"), "{}", write);
}

#[test]
fn emitted_rust_parses() {
    let (_, surface) = sample();
    for (name, contents) in rust_files(&surface) {
        if let Err(err) = syn::parse_file(&contents) {
            panic!("{} does not parse: {}", name, err);
        }
    }
}

#[test]
fn streams_end_on_delivery_failure() {
    let (_, surface) = sample();
    let files = rust_files(&surface);
    let bindings = file(&files, "bindings.rs");
    let runtime = file(&files, "runtime.rs");

    /* undecodable enum values close the stream instead of returning a bare failure */
    assert!(bindings.contains("Err(err) => return sink.fail(err),"));
    assert!(!bindings.contains("Err(_) => return -1,"));
    assert!(runtime.contains("pub fn fail(&self, err: DaqmxError) -> i32 {"));
    assert!(runtime.contains("let warning = check_status(self.sink.function, status, self.error_info)?;"));
    assert!(bindings.contains("Subscription::new(sink, records, extended_error_info, Box::new(move || "));
}

#[test]
fn computed_sizes_carry_no_enclosing_parens() {
    let (_, surface) = sample();
    let files = rust_files(&surface);
    let bindings = file(&files, "bindings.rs");
    let line = bindings
        .lines()
        .find(|line| line.contains("computed_size(\"CalculateReversePolyCoeff\""))
        .expect("computed size of reverseCoeffs");
    assert!(line.contains("\"reverseCoeffs\", if "), "{}", line);
}

#[test]
fn proto_projection_is_stable() {
    let (_, surface) = sample();
    let generator = || ProtoCodeGenerator::new(ProtoCodeGeneratorOptions { output_dir: ".".into(), package: None });
    let text = generator().render(&surface);
    assert_eq!(text, generator().render(&surface));

    assert!(text.contains("service Nidaqmx {"));
    let register = text
        .lines()
        .find(|line| line.contains("rpc RegisterEveryNSamplesEvent("))
        .expect("stream rpc");
    assert!(register.contains("returns (stream "), "{}", register);
    assert!(text.contains("message DigitalPowerUpChannelsAndState {"));
}

#[test]
fn generate_all_writes_every_target() {
    let (catalog, surface) = sample();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("generated");
    let out_str = out.to_str().unwrap();

    let written = generate_all(&surface, &catalog, &Target::all(), out_str).unwrap();
    assert_eq!(written.len(), 5 + 1 + 1 + 2);
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert!(out.join("rust").join("bindings.rs").exists());
    assert!(out.join(DESCRIPTION_FILE).exists());
    assert!(out.join(SURFACE_JSON_FILE).exists());
    assert!(out.join(SURFACE_PROTOBUF_FILE).exists());

    /* a second run over the same surface reproduces every byte */
    let again = dir.path().join("again");
    generate_all(&surface, &catalog, &Target::all(), again.to_str().unwrap()).unwrap();
    for path in &written {
        let relative = path.strip_prefix(&out).unwrap();
        assert_eq!(fs::read(path).unwrap(), fs::read(again.join(relative)).unwrap(), "{}", relative.display());
    }
}

#[test]
fn unwritable_output_is_an_emit_error() {
    let (catalog, surface) = sample();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("occupied");
    fs::write(&blocker, "not a directory").unwrap();

    let err = generate_all(&surface, &catalog, &[Target::Proto], blocker.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, GenError::Emit { .. }), "{}", err);
}

/* Scripted native library shared by the runtime tests */

#![allow(dead_code)]

use daqmx_gen::{build_surface_from_catalog, SurfaceCatalog};
use daqmx_loader::{fingerprint, load_catalog, GeneratorConfig};
use daqmx_reflect::{Invoker, InvokerConfig, NativeArg, NativeLibrary, Scalar, TaskHandle, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TASK_HANDLE: u64 = 0x7a5c;

type Handler = Box<dyn Fn(&mut [NativeArg]) -> i32 + Send + Sync>;

/// One recorded native call, arguments as they were after the call returned.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub symbol: String,
    pub args: Vec<NativeArg>,
}

/* Unscripted symbols succeed without touching their arguments */
#[derive(Default)]
pub struct ScriptedLibrary {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedLibrary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, symbol: &str, handler: impl Fn(&mut [NativeArg]) -> i32 + Send + Sync + 'static) {
        self.handlers.lock().insert(symbol.to_string(), Box::new(handler));
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, symbol: &str) -> Vec<Vec<NativeArg>> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.symbol == symbol)
            .map(|call| call.args.clone())
            .collect()
    }

    /// Answer extended-error-info requests with `text`, two-call style.
    pub fn error_info(&self, text: &'static str) {
        self.on("DAQmxGetExtendedErrorInfo", move |args| match args[0].as_buffer_mut() {
            Some(buffer) => {
                buffer.write_text(text);
                0
            }
            None => text.len() as i32 + 1,
        });
    }
}

impl NativeLibrary for ScriptedLibrary {
    fn invoke(&self, symbol: &str, args: &mut [NativeArg]) -> i32 {
        let status = match self.handlers.lock().get(symbol) {
            Some(handler) => handler(args),
            None => 0,
        };
        self.calls.lock().push(Invocation {
            symbol: symbol.to_string(),
            args: args.to_vec(),
        });
        status
    }
}

pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

/// Surface Catalog of the sample catalog, built with the workspace config.
pub fn sample_surface() -> SurfaceCatalog {
    let config = GeneratorConfig::load(&workspace_root().join("daqmx.yaml")).expect("load daqmx.yaml");
    let catalog_path = config.catalog.clone().expect("config names a catalog");
    let catalog = load_catalog(&catalog_path).expect("load sample catalog");
    let fp = fingerprint(&catalog).expect("fingerprint");
    build_surface_from_catalog(&catalog, &config.coercion, &fp).expect("solve sample catalog")
}

pub fn invoker(library: &Arc<ScriptedLibrary>) -> Invoker {
    Invoker::new(sample_surface(), library.clone())
}

pub fn invoker_with(library: &Arc<ScriptedLibrary>, config: InvokerConfig) -> Invoker {
    Invoker::with_config(sample_surface(), library.clone(), config)
}

/// Create a task whose native handle is `TASK_HANDLE`.
pub fn create_task(library: &Arc<ScriptedLibrary>, invoker: &Invoker) -> TaskHandle {
    library.on("DAQmxCreateTask", |args| {
        args[1].store(Scalar::UInt(TASK_HANDLE));
        0
    });
    invoker
        .create("CreateTask", &daqmx_reflect::args([("sessionName", Value::from("ai"))]))
        .expect("create task")
        .strict()
        .expect("no warning")
}

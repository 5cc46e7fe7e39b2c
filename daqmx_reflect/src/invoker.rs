/* Runtime interpreter over the Surface Catalog.
 *
 * Each call follows the emitted binding step for step: resolve inputs and
 * defaults, derive hidden sizes, allocate output buffers from their size plans,
 * marshal one native argument per slot, invoke, classify the status and read the
 * outputs back. Two-call buffers are discovered by a preflight with a null buffer
 * and a zero size. */

use crate::errors::{DaqmxError, DaqmxResult, Outcome, WarningPolicy};
use crate::handle::{Releaser, TaskHandle};
use crate::marshal::{buffer_value, check_enum, literal_value, native_buffer, native_scalar, resolve_inputs, scalar_value};
use crate::native::{Buffer, Callback, NativeArg, NativeLibrary, RawHandle, Scalar};
use crate::value::{Args, Outputs, Value};
use daqmx_gen::solver::COALESCE;
use daqmx_gen::{OutputKind, Placement, SizePlan, SlotSource, SurfaceCatalog, SurfaceFunction};
use daqmx_types::{AdaptorExpr, EnumTable, Literal, ScalarType, TypeToken};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/* Configuration for the invoker */
#[derive(Debug, Clone, Copy)]
pub struct InvokerConfig {
    pub warning_policy: WarningPolicy,
    /* Fetch the extended error info text for native errors and warnings */
    pub fetch_error_info: bool,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            warning_policy: WarningPolicy::Carry,
            fetch_error_info: true,
        }
    }
}

/* Cheap to clone; clones share the catalog, the library and the token counter */
#[derive(Clone)]
pub struct Invoker {
    surface: Arc<SurfaceCatalog>,
    library: Arc<dyn NativeLibrary>,
    config: InvokerConfig,
    tokens: Arc<AtomicU64>,
}

/* Native arguments of one invocation and where each slot landed */
pub(crate) struct Marshalled {
    pub args: Vec<NativeArg>,
    pub index: BTreeMap<String, usize>,
}

pub(crate) struct Execution {
    pub outputs: Outputs,
    pub native: Marshalled,
}

/* Callback and token handed to a stream-response registration */
pub(crate) struct Registration {
    pub callback: Callback,
    pub token: u64,
}

impl Invoker {
    pub fn new(surface: SurfaceCatalog, library: Arc<dyn NativeLibrary>) -> Self {
        Self::with_config(surface, library, InvokerConfig::default())
    }

    pub fn with_config(surface: SurfaceCatalog, library: Arc<dyn NativeLibrary>, config: InvokerConfig) -> Self {
        Self {
            surface: Arc::new(surface),
            library,
            config,
            tokens: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn surface(&self) -> &SurfaceCatalog {
        &self.surface
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    pub(crate) fn library(&self) -> &Arc<dyn NativeLibrary> {
        &self.library
    }

    pub(crate) fn next_token(&self) -> u64 {
        self.tokens.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn lookup(&self, function: &str) -> DaqmxResult<&SurfaceFunction> {
        self.surface.function(function).ok_or_else(|| DaqmxError::UnknownFunction {
            function: function.to_string(),
        })
    }

    /// Call a module-level or static function.
    pub fn call(&self, function: &str, args: &Args) -> DaqmxResult<Outcome<Outputs>> {
        let function = self.lookup(function)?;
        if let Placement::Instance { class, .. } = &function.placement {
            return Err(wrong_receiver(function, format!("a {} handle", class), "no receiver"));
        }
        check_plain_call(function)?;
        Ok(self.execute(function, None, args, None)?.map(|exec| exec.outputs))
    }

    /// Call an instance method on `handle`.
    pub fn call_on(&self, handle: &TaskHandle, function: &str, args: &Args) -> DaqmxResult<Outcome<Outputs>> {
        let function = self.lookup(function)?;
        check_receiver(function, handle)?;
        check_plain_call(function)?;
        if function.releases_handle {
            return Err(wrong_receiver(function, "release", "call_on"));
        }
        Ok(self.execute(function, Some(handle.raw()), args, None)?.map(|exec| exec.outputs))
    }

    /// Invoke a factory or init method. The caller owns the returned handle.
    pub fn create(&self, function: &str, args: &Args) -> DaqmxResult<Outcome<TaskHandle>> {
        let function = self.lookup(function)?;
        let Placement::Factory { class } = &function.placement else {
            return Err(wrong_receiver(function, "a factory", placement_label(&function.placement)));
        };
        let handle_output = match &function.init {
            Some(init) => Some(init.handle_output.as_str()),
            None => function.outputs.iter().find(|o| o.kind == OutputKind::Handle).map(|o| o.name.as_str()),
        };

        let outcome = self.execute(function, None, args, None)?;
        let raw = handle_output
            .and_then(|name| outcome.value.outputs.get(name))
            .and_then(Value::as_u64)
            .ok_or_else(|| DaqmxError::invalid_argument(&function.name, "factory produced no handle"))?;
        debug!("{} created {} handle {:#x}", function.name, class, raw);

        let releaser = self.releaser_for(class);
        Ok(outcome.map(|_| TaskHandle::new(raw, class, releaser)))
    }

    /* Releasing functions that take nothing but the receiver can run on drop */
    fn releaser_for(&self, class: &str) -> Option<Releaser> {
        let name = self.surface.class(class)?.releaser.as_ref()?;
        let function = self.surface.function(name)?;
        if function.slots.len() != 1 {
            return None;
        }
        Some(Releaser {
            library: Arc::clone(&self.library),
            function: name.clone(),
            symbol: function.native_symbol.clone(),
        })
    }

    /// Invoke the releasing function, consuming the handle. Ownership ends with
    /// the call whatever its status.
    pub fn release(&self, mut handle: TaskHandle, function: &str, args: &Args) -> DaqmxResult<Outcome<()>> {
        let function = self.lookup(function)?;
        check_receiver(function, &handle)?;
        if !function.releases_handle {
            return Err(wrong_receiver(function, "a releasing function", "a plain method"));
        }
        handle.disarm();
        Ok(self.execute(function, Some(handle.raw()), args, None)?.map(|_| ()))
    }

    /// Fetch the text describing the most recent native error.
    pub fn extended_error_info(&self) -> DaqmxResult<String> {
        let Some(name) = &self.surface.error_info else {
            return Ok(String::new());
        };
        let function = self.lookup(name)?;
        let outcome = self.execute(function, None, &Args::new(), None)?;
        let text = outcome.value.outputs.values().find_map(|v| v.as_str().map(str::to_string));
        Ok(text.unwrap_or_default())
    }

    fn error_message(&self, function: &SurfaceFunction) -> String {
        if !self.config.fetch_error_info || self.surface.error_info.as_deref() == Some(function.name.as_str()) {
            return String::new();
        }
        match self.extended_error_info() {
            Ok(text) => text,
            Err(err) => {
                warn!("{}: extended error info unavailable: {}", function.name, err);
                String::new()
            }
        }
    }

    fn native_error(&self, function: &SurfaceFunction, status: i32) -> DaqmxError {
        warn!("{} failed with status {}", function.native_symbol, status);
        DaqmxError::NativeError {
            function: function.name.clone(),
            code: status,
            message: self.error_message(function),
        }
    }

    /* Negative statuses fail; positive ones are warnings, carried or promoted */
    pub(crate) fn check_status(&self, function: &SurfaceFunction, status: i32) -> DaqmxResult<Option<DaqmxError>> {
        if status < 0 {
            return Err(self.native_error(function, status));
        }
        if status == 0 {
            return Ok(None);
        }
        let warning = DaqmxError::NativeWarning {
            function: function.name.clone(),
            code: status,
            message: self.error_message(function),
        };
        match self.config.warning_policy {
            WarningPolicy::Carry => Ok(Some(warning)),
            WarningPolicy::Promote => Err(warning),
        }
    }

    pub(crate) fn execute(
        &self,
        function: &SurfaceFunction,
        receiver: Option<RawHandle>,
        args: &Args,
        registration: Option<&Registration>,
    ) -> DaqmxResult<Outcome<Execution>> {
        let name = function.name.as_str();
        let inputs = resolve_inputs(function, &self.surface.enums, args)?;

        let records: &[Value] = match &function.compound {
            Some(compound) => {
                let list = match inputs.get(&compound.param) {
                    Some(value) => value.as_list().ok_or_else(|| {
                        DaqmxError::invalid_argument(name, format!("'{}' must be a list of records", compound.param))
                    })?,
                    None => &[],
                };
                if list.len() > compound.max_length {
                    return Err(DaqmxError::TooManyElements {
                        function: name.to_string(),
                        max: compound.max_length,
                        actual: list.len(),
                    });
                }
                list
            }
            None => &[],
        };

        let mut env = integral_env(function, &inputs);
        derive_lengths(function, &inputs, &mut env)?;
        let lengths = buffer_lengths(function, &env)?;

        let two_call = function.size_plans.values().any(|plan| matches!(plan, SizePlan::TwoCall { .. }));
        let plan = CallPlan {
            function,
            enums: &self.surface.enums,
            receiver,
            inputs: &inputs,
            records,
            env: &env,
            lengths: &lengths,
            registration,
        };

        let (mut native, status) = if two_call {
            let mut preflight = plan.marshal(Some(0))?;
            let status = self.library.invoke(&function.native_symbol, &mut preflight.args);
            if status < 0 {
                return Err(self.native_error(function, status));
            }
            let required = match status {
                0 => discovered_from_slot(function, &preflight),
                positive => positive as usize,
            };
            debug!("{}: preflight reports {} elements", name, required);
            if required == 0 {
                (preflight, 0)
            } else {
                let mut second = plan.marshal(Some(required))?;
                let status = self.library.invoke(&function.native_symbol, &mut second.args);
                (second, status)
            }
        } else {
            let mut marshalled = plan.marshal(None)?;
            let status = self.library.invoke(&function.native_symbol, &mut marshalled.args);
            (marshalled, status)
        };
        debug!("{} returned {}", function.native_symbol, status);

        let warning = self.check_status(function, status)?;
        let mut outputs = read_outputs(function, &mut native)?;
        if let Some(adaptor) = &function.adaptor {
            let value = adaptor_value(&adaptor.expression, &inputs, function, receiver);
            outputs.insert(adaptor.name.clone(), value);
        }

        Ok(Outcome {
            value: Execution { outputs, native },
            warning,
        })
    }
}

fn wrong_receiver(function: &SurfaceFunction, expected: impl Into<String>, actual: impl Into<String>) -> DaqmxError {
    DaqmxError::WrongReceiver {
        function: function.name.clone(),
        expected: expected.into(),
        actual: actual.into(),
    }
}

fn placement_label(placement: &Placement) -> String {
    match placement {
        Placement::Module => "a module function".to_string(),
        Placement::Instance { class, .. } => format!("a {} method", class),
        Placement::Factory { class } => format!("a {} factory", class),
        Placement::Static { class } => format!("a {} static", class),
    }
}

pub(crate) fn check_receiver(function: &SurfaceFunction, handle: &TaskHandle) -> DaqmxResult<()> {
    match &function.placement {
        Placement::Instance { class, .. } if class == handle.class() => Ok(()),
        Placement::Instance { class, .. } => Err(wrong_receiver(
            function,
            format!("a {} handle", class),
            format!("a {} handle", handle.class()),
        )),
        other => Err(wrong_receiver(function, placement_label(other), "a handle")),
    }
}

fn check_plain_call(function: &SurfaceFunction) -> DaqmxResult<()> {
    if function.stream.is_some() {
        return Err(wrong_receiver(function, "subscribe", "a plain call"));
    }
    if function.is_factory() {
        return Err(wrong_receiver(function, "create", "a plain call"));
    }
    Ok(())
}

/* Integral scalar inputs, the operands of size expressions */
fn integral_env(function: &SurfaceFunction, inputs: &IndexMap<String, Value>) -> BTreeMap<String, i64> {
    function
        .inputs
        .iter()
        .filter(|input| input.ty.is_integral_scalar())
        .filter_map(|input| Some((input.name.clone(), inputs.get(&input.name)?.as_i64()?)))
        .collect()
}

fn input_len(value: Option<&Value>) -> usize {
    match value {
        Some(Value::List(items)) => items.len(),
        Some(Value::Str(text)) => text.len(),
        _ => 0,
    }
}

/* Hidden sizes are the shared length of the buffers they describe */
fn derive_lengths(
    function: &SurfaceFunction,
    inputs: &IndexMap<String, Value>,
    env: &mut BTreeMap<String, i64>,
) -> DaqmxResult<()> {
    for slot in &function.slots {
        let SlotSource::LengthOf { buffers } = &slot.source else {
            continue;
        };
        let lengths: Vec<usize> = buffers.iter().map(|b| input_len(inputs.get(b))).collect();
        let first = lengths.first().copied().unwrap_or(0);
        if lengths.iter().any(|&len| len != first) {
            return Err(DaqmxError::invalid_size(
                &function.name,
                &slot.name,
                format!("buffers sized together have lengths {:?}", lengths),
            ));
        }
        let fits = match slot.ty {
            TypeToken::Scalar(ScalarType::Int32) => i32::try_from(first).is_ok(),
            _ => u32::try_from(first).is_ok(),
        };
        if !fits {
            return Err(DaqmxError::invalid_size(
                &function.name,
                &slot.name,
                format!("{} does not fit the size slot", first),
            ));
        }
        env.insert(slot.name.clone(), first as i64);
    }
    Ok(())
}

/* Element counts of caller-sized, computed and fixed output buffers */
fn buffer_lengths(function: &SurfaceFunction, env: &BTreeMap<String, i64>) -> DaqmxResult<BTreeMap<String, usize>> {
    let name = function.name.as_str();
    let mut lengths = BTreeMap::new();
    for slot in function.slots.iter().filter(|s| s.source == SlotSource::Output) {
        if let Some(len) = slot.ty.fixed_len() {
            lengths.insert(slot.name.clone(), len as usize);
            continue;
        }
        let computed = match function.plan(&slot.name) {
            Some(SizePlan::CallerSized { size_param, .. }) => env.get(size_param).copied().unwrap_or(0),
            Some(SizePlan::ExprComputed { expression, .. }) => expression
                .evaluate(env)
                .map_err(|err| DaqmxError::invalid_size(name, &slot.name, err.to_string()))?,
            _ => continue,
        };
        let len = usize::try_from(computed)
            .map_err(|_| DaqmxError::invalid_size(name, &slot.name, format!("length {} is negative", computed)))?;
        lengths.insert(slot.name.clone(), len);
    }
    Ok(lengths)
}

/* A zero preflight status leaves the required length in a by-pointer size slot */
fn discovered_from_slot(function: &SurfaceFunction, preflight: &Marshalled) -> usize {
    function
        .slots
        .iter()
        .filter(|slot| matches!(slot.source, SlotSource::DiscoveredSize { .. }))
        .filter_map(|slot| preflight.index.get(&slot.name))
        .filter_map(|&idx| match &preflight.args[idx] {
            NativeArg::Out(scalar) => scalar.as_i64(),
            _ => None,
        })
        .filter_map(|len| usize::try_from(len).ok())
        .max()
        .unwrap_or(0)
}

struct CallPlan<'a> {
    function: &'a SurfaceFunction,
    enums: &'a EnumTable,
    receiver: Option<RawHandle>,
    inputs: &'a IndexMap<String, Value>,
    records: &'a [Value],
    env: &'a BTreeMap<String, i64>,
    lengths: &'a BTreeMap<String, usize>,
    registration: Option<&'a Registration>,
}

impl CallPlan<'_> {
    fn name(&self) -> &str {
        &self.function.name
    }

    /* `discovered` is the two-call length: Some(0) for the preflight */
    fn marshal(&self, discovered: Option<usize>) -> DaqmxResult<Marshalled> {
        let mut args = Vec::with_capacity(self.function.slots.len());
        let mut index = BTreeMap::new();
        let mut expanded = false;

        for slot in &self.function.slots {
            let arg = match &slot.source {
                SlotSource::Receiver => match self.receiver {
                    Some(raw) => NativeArg::Handle(raw),
                    None => return Err(DaqmxError::invalid_argument(self.name(), "no receiver handle")),
                },
                SlotSource::Argument => self.argument(slot, self.inputs.get(&slot.name))?,
                SlotSource::Hardcoded { value } => self.hardcoded(slot, value)?,
                SlotSource::LengthOf { .. } => {
                    let len = Scalar::Int(self.env.get(&slot.name).copied().unwrap_or(0));
                    if slot.pointer {
                        NativeArg::Out(len)
                    } else {
                        NativeArg::Scalar(len)
                    }
                }
                SlotSource::DiscoveredSize { .. } => {
                    let len = Scalar::Int(discovered.unwrap_or(0) as i64);
                    if slot.pointer {
                        NativeArg::Out(len)
                    } else {
                        NativeArg::Scalar(len)
                    }
                }
                SlotSource::Output => self.output(slot, discovered),
                SlotSource::Callback => match self.registration {
                    Some(registration) => NativeArg::Callback(Arc::clone(&registration.callback)),
                    None => NativeArg::Null,
                },
                SlotSource::CallbackToken => match self.registration {
                    Some(registration) => NativeArg::Token(registration.token),
                    None => NativeArg::Null,
                },
                SlotSource::Repeating { .. } => {
                    /* the whole run is expanded once, one column group per element */
                    if !expanded {
                        expanded = true;
                        self.expand_repeating(&mut args)?;
                    }
                    continue;
                }
            };
            index.insert(slot.name.clone(), args.len());
            args.push(arg);
        }
        Ok(Marshalled { args, index })
    }

    fn argument(&self, slot: &daqmx_gen::NativeSlot, value: Option<&Value>) -> DaqmxResult<NativeArg> {
        let name = self.name();
        let arg = match (&slot.ty, value) {
            (TypeToken::Scalar(ScalarType::TaskHandle), Some(value)) => {
                let raw = value
                    .as_u64()
                    .ok_or_else(|| DaqmxError::invalid_argument(name, format!("'{}' expects a handle", slot.name)))?;
                NativeArg::Handle(raw)
            }
            (TypeToken::Scalar(scalar), value) => {
                let native = match value {
                    Some(value) => native_scalar(name, &slot.name, *scalar, value)?,
                    None => Scalar::zero(*scalar),
                };
                if slot.pointer {
                    NativeArg::Out(native)
                } else {
                    NativeArg::Scalar(native)
                }
            }
            (ty, value) if ty.is_string() => {
                let text = match value {
                    Some(value) => value.as_str().ok_or_else(|| {
                        DaqmxError::invalid_argument(name, format!("'{}' expects a string", slot.name))
                    })?,
                    None => "",
                };
                if text.contains('\0') {
                    return Err(DaqmxError::invalid_argument(
                        name,
                        format!("{:?} contains an interior NUL", text),
                    ));
                }
                NativeArg::Str(text.to_string())
            }
            (TypeToken::Buffer { element, .. } | TypeToken::FixedArray { element, .. }, Some(value)) => {
                let items = value
                    .as_list()
                    .ok_or_else(|| DaqmxError::invalid_argument(name, format!("'{}' expects a list", slot.name)))?;
                if let Some(fixed) = slot.ty.fixed_len() {
                    if items.len() != fixed as usize {
                        return Err(DaqmxError::invalid_size(
                            name,
                            &slot.name,
                            format!("expected {} elements, got {}", fixed, items.len()),
                        ));
                    }
                }
                NativeArg::Buffer(native_buffer(name, &slot.name, *element, slot.coercion, items)?)
            }
            _ => NativeArg::Null,
        };
        Ok(arg)
    }

    fn hardcoded(&self, slot: &daqmx_gen::NativeSlot, literal: &Literal) -> DaqmxResult<NativeArg> {
        if literal.is_null() {
            return Ok(NativeArg::Null);
        }
        self.argument(slot, Some(&literal_value(literal)))
    }

    fn output(&self, slot: &daqmx_gen::NativeSlot, discovered: Option<usize>) -> NativeArg {
        match &slot.ty {
            TypeToken::Scalar(ScalarType::TaskHandle) => NativeArg::HandleOut(0),
            TypeToken::Scalar(scalar) => NativeArg::Out(Scalar::zero(*scalar)),
            TypeToken::Buffer { element, .. } | TypeToken::FixedArray { element, .. } => {
                let len = match self.function.plan(&slot.name) {
                    Some(SizePlan::TwoCall { .. }) => discovered.filter(|&n| n > 0),
                    _ => self.lengths.get(&slot.name).copied(),
                };
                len.and_then(|n| Buffer::zeroed(*element, n))
                    .map(NativeArg::Buffer)
                    .unwrap_or(NativeArg::Null)
            }
            TypeToken::CallbackPtr(_) | TypeToken::Compound => NativeArg::Null,
        }
    }

    fn expand_repeating(&self, args: &mut Vec<NativeArg>) -> DaqmxResult<()> {
        let name = self.name();
        let columns: Vec<(&daqmx_gen::NativeSlot, &str)> = self
            .function
            .slots
            .iter()
            .filter_map(|slot| match &slot.source {
                SlotSource::Repeating { field } => Some((slot, field.as_str())),
                _ => None,
            })
            .collect();

        for (position, element) in self.records.iter().enumerate() {
            let record = element.as_record().ok_or_else(|| {
                DaqmxError::invalid_argument(name, format!("element {} is a {}, not a record", position, element.kind_name()))
            })?;
            for &(slot, field) in &columns {
                let value = record.get(field).ok_or_else(|| {
                    DaqmxError::invalid_argument(name, format!("element {} has no '{}'", position, field))
                })?;
                if let Some(enum_name) = &slot.enum_name {
                    check_enum(name, self.enums, enum_name, value)?;
                }
                args.push(self.argument(slot, Some(value))?);
            }
        }

        /* unused groups up to the maximum carry null strings and zero values */
        let max_length = self.function.compound.as_ref().map_or(0, |c| c.max_length);
        for _ in self.records.len()..max_length {
            for &(slot, _) in &columns {
                args.push(match &slot.ty {
                    TypeToken::Scalar(scalar) => NativeArg::Scalar(Scalar::zero(*scalar)),
                    _ => NativeArg::Null,
                });
            }
        }
        Ok(())
    }
}

/* Outputs in surface order. By-pointer caller-sized buffers are cut to the
 * count the native side wrote back. */
fn read_outputs(function: &SurfaceFunction, native: &mut Marshalled) -> DaqmxResult<Outputs> {
    let name = function.name.as_str();
    let mut outputs = Outputs::new();
    for output in &function.outputs {
        let (Some(&idx), Some(slot)) = (native.index.get(&output.name), function.slot(&output.name)) else {
            continue;
        };

        if let Some(SizePlan::CallerSized { size_param, by_ptr: true, .. }) = function.plan(&output.name) {
            let written = native
                .index
                .get(size_param)
                .and_then(|&size_idx| native.args[size_idx].as_i64())
                .and_then(|n| usize::try_from(n).ok());
            if let (Some(written), Some(buffer)) = (written, native.args[idx].as_buffer_mut()) {
                buffer.truncate(written);
            }
        }

        let value = match (&native.args[idx], &slot.ty) {
            (NativeArg::HandleOut(raw), _) => Value::UInt(*raw),
            (NativeArg::Out(scalar), TypeToken::Scalar(ty)) => {
                scalar_value(name, *ty, output.enum_name.as_deref(), *scalar)?
            }
            (NativeArg::Buffer(buffer), _) => buffer_value(buffer, slot.coercion),
            /* two-call buffer the preflight reported as empty */
            (NativeArg::Null, ty) if ty.is_string() => Value::Str(String::new()),
            (NativeArg::Null, _) => Value::List(Vec::new()),
            (other, ty) => {
                return Err(DaqmxError::invalid_argument(
                    name,
                    format!("native slot {:?} cannot be read as '{}'", other, ty),
                ))
            }
        };
        outputs.insert(output.name.clone(), value);
    }
    Ok(outputs)
}

/* Adaptor constructions become lists of their evaluated arguments */
fn adaptor_value(
    expr: &AdaptorExpr,
    inputs: &IndexMap<String, Value>,
    function: &SurfaceFunction,
    receiver: Option<RawHandle>,
) -> Value {
    match expr {
        AdaptorExpr::Param(name) => match inputs.get(name) {
            Some(value) => value.clone(),
            None => match (function.receiver_slot(), receiver) {
                (Some(slot), Some(raw)) if &slot.name == name => Value::UInt(raw),
                _ => Value::Unit,
            },
        },
        AdaptorExpr::Str(text) => Value::Str(text.clone()),
        AdaptorExpr::Call { callee, args } if callee == COALESCE => {
            let mut values = args.iter().map(|arg| adaptor_value(arg, inputs, function, receiver));
            let first = values.next().unwrap_or(Value::Unit);
            let empty = matches!(&first, Value::Str(text) if text.is_empty()) || first == Value::Unit;
            match (empty, values.next()) {
                (true, Some(second)) => second,
                _ => first,
            }
        }
        AdaptorExpr::Call { args, .. } => {
            Value::List(args.iter().map(|arg| adaptor_value(arg, inputs, function, receiver)).collect())
        }
    }
}

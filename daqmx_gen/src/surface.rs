//! Surface Catalog: the caller-facing projection of the resolved catalog.
//!
//! Every emitter (Rust bindings, IPC proto, IR dumps) and the runtime
//! interpreter read this model and nothing else. Building it is a pure function
//! of the catalog and the coercion table.

use crate::collapser::{collapse, GroupState};
use crate::error::SolverError;
use crate::ipc::{project_ipc, IpcProjection};
use crate::naming::{rust_ident, snake_case};
use crate::placement::{place, Placement};
use crate::shards::{group_shards, ShardGroup, ShardMembership};
use crate::solver::{solve, AdaptorBinding, ResolvedCatalog, ResolvedFunction, SizePlan};
use crate::stream::{project_stream, StreamBinding};
use daqmx_types::{
    coerced_surface_element, Catalog, CallingConvention, CoercionPolicy, CoercionTable, Direction, EnumTable,
    Literal, Parameter, TypeToken,
};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Bumped whenever the serialized surface shape changes.
pub const SURFACE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SurfaceCatalog {
    pub version: u32,
    pub package: String,
    pub catalog_version: String,
    pub fingerprint: String,
    pub symbol_prefix: String,
    /* catalog key of the two-call extended error text function, when present */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,
    pub enums: EnumTable,
    pub classes: BTreeMap<String, SurfaceClass>,
    pub functions: BTreeMap<String, SurfaceFunction>,
    /* keyed by native symbol */
    pub shards: BTreeMap<String, ShardGroup>,
}

impl SurfaceCatalog {
    pub fn function(&self, name: &str) -> Option<&SurfaceFunction> {
        self.functions.get(name)
    }

    pub fn class(&self, name: &str) -> Option<&SurfaceClass> {
        self.classes.get(name)
    }

    pub fn module_functions(&self) -> impl Iterator<Item = &SurfaceFunction> {
        self.functions.values().filter(|f| f.placement == Placement::Module)
    }

    /* Shard group by native symbol or by its unprefixed name */
    pub fn shard_group(&self, name: &str) -> Option<&ShardGroup> {
        self.shards.get(name).or_else(|| self.shards.values().find(|g| g.name == name))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct SurfaceClass {
    pub name: String,
    pub factories: Vec<String>,
    pub methods: Vec<String>,
    pub statics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releaser: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SurfaceFunction {
    pub name: String,
    pub native_symbol: String,
    pub calling_convention: CallingConvention,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub method_name: String,
    pub placement: Placement,
    pub returns: TypeToken,
    /* native call order, never reordered */
    pub slots: Vec<NativeSlot>,
    pub inputs: Vec<SurfaceInput>,
    pub outputs: Vec<SurfaceOutput>,
    pub size_plans: BTreeMap<String, SizePlan>,
    pub evaluation_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound: Option<CompoundBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptor: Option<AdaptorBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardMembership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<InitBinding>,
    #[serde(default)]
    pub releases_handle: bool,
    pub ipc: IpcProjection,
}

impl SurfaceFunction {
    pub fn input(&self, name: &str) -> Option<&SurfaceInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&SurfaceOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn slot(&self, name: &str) -> Option<&NativeSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn plan(&self, buffer: &str) -> Option<&SizePlan> {
        self.size_plans.get(buffer)
    }

    pub fn receiver_slot(&self) -> Option<&NativeSlot> {
        self.slots.iter().find(|s| s.source == SlotSource::Receiver)
    }

    pub fn is_factory(&self) -> bool {
        matches!(self.placement, Placement::Factory { .. })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct NativeSlot {
    pub name: String,
    pub native_name: String,
    /* native type token */
    pub ty: TypeToken,
    pub direction: Direction,
    #[serde(default)]
    pub pointer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coercion: Option<CoercionPolicy>,
    pub source: SlotSource,
}

/* Where the value of a native slot comes from at call time */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SlotSource {
    /// The receiver's owned handle
    Receiver,
    /// The surface input of the same name
    Argument,
    /// A stipulated constant; never on the surface
    Hardcoded { value: Literal },
    /// Measured length of the named input buffers
    LengthOf { buffers: Vec<String> },
    /// Zero on preflight, then the discovered length of `buffer`
    DiscoveredSize { buffer: String },
    /// Returned to the caller
    Output,
    /// Registration callback, bound by the stream projection
    Callback,
    /// Opaque token passed back to every callback
    CallbackToken,
    /// One column of the collapsed compound
    Repeating { field: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SurfaceInput {
    pub name: String,
    pub ident: String,
    /* surface type: coerced buffers are widened to 32 bits */
    pub ty: TypeToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    Value,
    Buffer,
    /// Count of elements written into a caller-sized buffer
    Companion,
    /// A newly created handle owned by the caller
    Handle,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SurfaceOutput {
    pub name: String,
    pub ident: String,
    pub ty: TypeToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    pub kind: OutputKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RecordField {
    pub name: String,
    pub ident: String,
    pub ty: TypeToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
}

impl RecordField {
    pub fn from_param(param: &Parameter) -> Self {
        Self {
            name: param.name.clone(),
            ident: rust_ident(&param.name),
            ty: param.ty.clone(),
            enum_name: param.enum_name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CompoundBinding {
    /* the list-of-record surface parameter */
    pub param: String,
    pub record: String,
    pub fields: Vec<RecordField>,
    pub max_length: usize,
    pub direction: Direction,
    pub state: GroupState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct InitBinding {
    pub session_name_param: String,
    pub handle_output: String,
}

/* ============================================================================
   Builder
   ============================================================================ */

/// Solve and project a catalog in one step.
pub fn build_surface_from_catalog(
    catalog: &Catalog,
    coercion: &CoercionTable,
    fingerprint: &str,
) -> Result<SurfaceCatalog, SolverError> {
    let resolved = solve(catalog, coercion)?;
    build_surface(&resolved, fingerprint)
}

pub fn build_surface(resolved: &ResolvedCatalog, fingerprint: &str) -> Result<SurfaceCatalog, SolverError> {
    let meta = &resolved.catalog.catalog;
    let (shards, memberships) = group_shards(resolved)?;

    let mut functions = BTreeMap::new();
    for (name, function) in &resolved.functions {
        let mut surface = build_function(function, &meta.symbol_prefix)?;
        surface.shard = memberships.get(name).cloned();
        functions.insert(name.clone(), surface);
    }

    let classes = collect_classes(&functions);
    let error_info = resolved
        .catalog
        .functions
        .contains_key(&meta.error_info_function)
        .then(|| meta.error_info_function.clone());

    info!(
        "surface: {} functions, {} classes, {} shard groups",
        functions.len(),
        classes.len(),
        shards.len()
    );

    Ok(SurfaceCatalog {
        version: SURFACE_VERSION,
        package: meta.package.clone(),
        catalog_version: meta.version.clone(),
        fingerprint: fingerprint.to_string(),
        symbol_prefix: meta.symbol_prefix.clone(),
        error_info,
        enums: resolved.catalog.enums.clone(),
        classes,
        functions,
        shards,
    })
}

pub fn build_function(function: &ResolvedFunction, symbol_prefix: &str) -> Result<SurfaceFunction, SolverError> {
    let name = function.name.as_str();
    let entry = &function.entry;
    let placement = place(name, entry)?;
    let receiver = match &placement {
        Placement::Instance { .. } => entry.handle_candidates().first().copied(),
        _ => None,
    };

    let mut slots = Vec::with_capacity(entry.parameters.len());
    for (idx, param) in entry.parameters.iter().enumerate() {
        if param.repeated_var_args {
            /* surface-only; unpacked into the repeating slots */
            continue;
        }
        let source = slot_source(function, param, Some(idx) == receiver);
        slots.push(NativeSlot {
            name: param.name.clone(),
            native_name: param.native_name().to_string(),
            ty: param.ty.clone(),
            direction: param.direction,
            pointer: param.pointer,
            enum_name: param.enum_name.clone(),
            coercion: function.coercion.get(&param.name).copied(),
            source,
        });
    }

    let collapsed = collapse(name, entry, &mut slots)?;
    if collapsed.state == GroupState::HasRepeatingRun {
        debug!("{}: repeating run has no compound companion; left un-collapsed", name);
    }

    let stream = project_stream(name, entry, symbol_prefix)?;
    let inputs = surface_inputs(entry, &slots, collapsed.compound.as_ref());
    let outputs = surface_outputs(function, &slots);

    let init = if entry.init_method {
        let session = entry.session_name_param().ok_or_else(|| SolverError::SessionParity {
            function: name.to_string(),
            reason: "init method declares no session name".into(),
        })?;
        let handle = outputs.iter().find(|o| o.kind == OutputKind::Handle).ok_or_else(|| {
            SolverError::SessionParity {
                function: name.to_string(),
                reason: "init method returns no handle".into(),
            }
        })?;
        Some(InitBinding { session_name_param: session.name.clone(), handle_output: handle.name.clone() })
    } else {
        None
    };

    let mut surface = SurfaceFunction {
        name: name.to_string(),
        native_symbol: function.native_symbol.clone(),
        calling_convention: entry.calling_convention,
        description: entry.description.clone(),
        method_name: snake_case(name),
        placement,
        returns: entry.returns.clone(),
        slots,
        inputs,
        outputs,
        size_plans: function.plans.clone(),
        evaluation_order: function.evaluation_order.clone(),
        compound: collapsed.compound,
        stream,
        adaptor: function.adaptor.clone(),
        shard: None,
        init,
        releases_handle: entry.releases_handle,
        ipc: IpcProjection::default(),
    };

    check_visibility(entry, &surface)?;
    surface.ipc = project_ipc(entry, &surface)?;
    Ok(surface)
}

fn slot_source(function: &ResolvedFunction, param: &Parameter, is_receiver: bool) -> SlotSource {
    if is_receiver {
        return SlotSource::Receiver;
    }
    if let Some(value) = &param.hardcoded_value {
        return SlotSource::Hardcoded { value: value.clone() };
    }
    if param.callback_params.is_some() {
        return SlotSource::Callback;
    }
    if param.callback_token {
        return SlotSource::CallbackToken;
    }
    if function.hidden_sizes.contains(&param.name) {
        let buffers = function.buffers_sized_by(&param.name);
        let two_call = buffers
            .iter()
            .find(|b| matches!(function.plans.get(*b), Some(SizePlan::TwoCall { .. })));
        return match two_call {
            Some(buffer) => SlotSource::DiscoveredSize { buffer: buffer.clone() },
            None => SlotSource::LengthOf { buffers },
        };
    }
    match param.direction {
        Direction::In => SlotSource::Argument,
        Direction::Out => SlotSource::Output,
    }
}

/* Surface type of a parameter: coerced buffers use 32-bit elements */
pub fn surface_type(param: &Parameter) -> TypeToken {
    match (&param.ty, param.coerced) {
        (TypeToken::Buffer { element, is_const }, true) => {
            TypeToken::Buffer { element: coerced_surface_element(*element), is_const: *is_const }
        }
        (ty, _) => ty.clone(),
    }
}

/* Required inputs in declaration order, then optional ones in declaration order.
 * The compound list takes the place of its declaration. */
fn surface_inputs(
    entry: &daqmx_types::FunctionEntry,
    slots: &[NativeSlot],
    compound: Option<&CompoundBinding>,
) -> Vec<SurfaceInput> {
    let mut inputs: Vec<SurfaceInput> = Vec::new();
    for param in &entry.parameters {
        let visible = if param.repeated_var_args {
            compound.map(|c| c.param == param.name).unwrap_or(false)
        } else {
            slots
                .iter()
                .any(|s| s.name == param.name && s.source == SlotSource::Argument)
        };
        if !visible {
            continue;
        }
        inputs.push(SurfaceInput {
            name: param.name.clone(),
            ident: rust_ident(&param.name),
            ty: surface_type(param),
            enum_name: param.enum_name.clone(),
            default: param.default.clone(),
            optional: param.is_optional(),
            description: param.description.clone(),
        });
    }

    let (required, optional): (Vec<_>, Vec<_>) = inputs.into_iter().partition(|i| !i.optional);
    required.into_iter().chain(optional).collect()
}

fn surface_outputs(function: &ResolvedFunction, slots: &[NativeSlot]) -> Vec<SurfaceOutput> {
    let companions: Vec<&str> = function
        .plans
        .values()
        .filter_map(|plan| match plan {
            SizePlan::CallerSized { companion: Some(companion), .. } => Some(companion.as_str()),
            _ => None,
        })
        .collect();

    let mut outputs = Vec::new();
    for slot in slots.iter().filter(|s| s.source == SlotSource::Output) {
        let Some(param) = function.entry.param(&slot.name) else {
            continue;
        };
        let kind = if param.ty.is_handle() {
            OutputKind::Handle
        } else if param.ty.is_buffer() {
            OutputKind::Buffer
        } else if companions.contains(&param.name.as_str()) {
            OutputKind::Companion
        } else {
            OutputKind::Value
        };
        outputs.push(SurfaceOutput {
            name: param.name.clone(),
            ident: rust_ident(&param.name),
            ty: surface_type(param),
            enum_name: param.enum_name.clone(),
            kind,
            description: param.description.clone(),
        });
    }
    outputs
}

/* Nothing the caller sees may be dropped from the IPC projection */
fn check_visibility(entry: &daqmx_types::FunctionEntry, surface: &SurfaceFunction) -> Result<(), SolverError> {
    let visible = surface
        .inputs
        .iter()
        .map(|i| i.name.as_str())
        .chain(surface.outputs.iter().map(|o| o.name.as_str()));
    for name in visible {
        if let Some(param) = entry.param(name) {
            if !param.include_in_proto {
                return Err(SolverError::VisibilityConflict {
                    function: surface.name.clone(),
                    parameter: param.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn collect_classes(functions: &BTreeMap<String, SurfaceFunction>) -> BTreeMap<String, SurfaceClass> {
    let mut classes: BTreeMap<String, SurfaceClass> = BTreeMap::new();
    for function in functions.values() {
        let Some(class_name) = function.placement.class() else {
            continue;
        };
        let class = classes.entry(class_name.to_string()).or_insert_with(|| SurfaceClass {
            name: class_name.to_string(),
            ..SurfaceClass::default()
        });
        match &function.placement {
            Placement::Factory { .. } => class.factories.push(function.name.clone()),
            Placement::Instance { .. } if function.releases_handle => {
                class.releaser = Some(function.name.clone());
                class.methods.push(function.name.clone());
            }
            Placement::Instance { .. } => class.methods.push(function.name.clone()),
            Placement::Static { .. } => class.statics.push(function.name.clone()),
            Placement::Module => {}
        }
    }
    classes
}

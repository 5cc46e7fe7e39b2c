use crate::error::SolverError;
use crate::naming::snake_case;
use crate::surface::{surface_type, SlotSource, SurfaceFunction};
use daqmx_types::{FunctionEntry, Parameter, ScalarType, TypeToken};
use serde_derive::{Deserialize, Serialize};

pub const SESSION_TYPE: &str = "nidevice_grpc.Session";
pub const INIT_BEHAVIOR_TYPE: &str = "nidevice_grpc.SessionInitializationBehavior";
pub const INITIALIZATION_BEHAVIOR: &str = "initialization_behavior";
pub const NEW_SESSION_INITIALIZED: &str = "new_session_initialized";
pub const STATUS: &str = "status";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct IpcField {
    pub name: String,
    pub proto_type: String,
    #[serde(default)]
    pub repeated: bool,
    /* catalog parameter this field carries; synthetic fields have none */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /* catalog enum backing `proto_type` when it names an enum */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_source: Option<String>,
}

impl IpcField {
    fn synthetic(name: &str, proto_type: &str) -> Self {
        Self { name: name.to_string(), proto_type: proto_type.to_string(), repeated: false, source: None, enum_source: None }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct IpcProjection {
    pub rpc: String,
    pub request: String,
    pub response: String,
    #[serde(default)]
    pub streaming: bool,
    pub request_fields: Vec<IpcField>,
    pub response_fields: Vec<IpcField>,
}

impl IpcProjection {
    pub fn request_field(&self, name: &str) -> Option<&IpcField> {
        self.request_fields.iter().find(|f| f.name == name)
    }

    pub fn response_field(&self, name: &str) -> Option<&IpcField> {
        self.response_fields.iter().find(|f| f.name == name)
    }
}

/* Request: in-parameters in native order, minus anything the binding fills in
 * itself. Response: status first, then the outputs. */
pub fn project_ipc(entry: &FunctionEntry, surface: &SurfaceFunction) -> Result<IpcProjection, SolverError> {
    let mut request_fields = Vec::new();
    let mut response_fields = vec![IpcField::synthetic(STATUS, "sint32")];

    for param in &entry.parameters {
        if !param.include_in_proto || param.is_hardcoded() {
            continue;
        }
        if param.repeated_var_args {
            let Some(compound) = surface.compound.as_ref().filter(|c| c.param == param.name) else {
                continue;
            };
            request_fields.push(IpcField {
                name: snake_case(&param.name),
                proto_type: compound.record.clone(),
                repeated: true,
                source: Some(param.name.clone()),
                enum_source: None,
            });
            continue;
        }
        let carried = surface
            .slot(&param.name)
            .map(|slot| matches!(slot.source, SlotSource::Receiver | SlotSource::Argument | SlotSource::Output))
            .unwrap_or(false);
        if !carried {
            continue;
        }
        let field = field_for(param);
        if param.is_in() {
            request_fields.push(field);
        } else {
            response_fields.push(field);
        }
    }

    if let Some(stream) = &surface.stream {
        for record_field in &stream.fields {
            let param = entry
                .callback_param()
                .and_then(|cb| cb.callback_params.as_ref())
                .and_then(|params| params.iter().find(|p| p.name == record_field.name));
            if let Some(param) = param {
                response_fields.push(field_for(param));
            }
        }
    }

    if let Some(init) = &surface.init {
        let parity = |reason: String| SolverError::SessionParity { function: surface.name.clone(), reason };
        if surface.input(&init.session_name_param).is_none() {
            return Err(parity(format!("'{}' is not a surface input", init.session_name_param)));
        }
        if !request_fields.iter().any(|f| f.source.as_deref() == Some(init.session_name_param.as_str())) {
            return Err(parity(format!("'{}' is not in the IPC request", init.session_name_param)));
        }
        request_fields.push(IpcField::synthetic(INITIALIZATION_BEHAVIOR, INIT_BEHAVIOR_TYPE));
        response_fields.push(IpcField::synthetic(NEW_SESSION_INITIALIZED, "bool"));
    }

    Ok(IpcProjection {
        rpc: surface.name.clone(),
        request: format!("{}Request", surface.name),
        response: format!("{}Response", surface.name),
        streaming: surface.stream.is_some(),
        request_fields,
        response_fields,
    })
}

/* IPC enum type of an enum-tagged parameter: its grpc_type alias when given */
pub fn ipc_enum_name(param: &Parameter) -> Option<String> {
    param
        .enum_name
        .as_ref()
        .map(|enum_name| param.grpc_type.clone().unwrap_or_else(|| enum_name.clone()))
}

fn field_for(param: &Parameter) -> IpcField {
    let (proto_type, repeated) = match (&surface_type(param), ipc_enum_name(param)) {
        (TypeToken::Scalar(_), Some(enum_type)) => (enum_type, false),
        (TypeToken::Buffer { .. } | TypeToken::FixedArray { .. }, Some(enum_type)) => (enum_type, true),
        (TypeToken::Scalar(scalar), None) => (scalar.proto_type().to_string(), false),
        (TypeToken::Buffer { element: ScalarType::Char, .. }, None) => ("string".to_string(), false),
        (TypeToken::Buffer { element: ScalarType::UInt8, .. }, None)
        | (TypeToken::FixedArray { element: ScalarType::UInt8, .. }, None) => ("bytes".to_string(), false),
        (TypeToken::Buffer { element, .. } | TypeToken::FixedArray { element, .. }, None) => {
            (element.proto_type().to_string(), true)
        }
        (TypeToken::CallbackPtr(_), _) => ("fixed64".to_string(), false),
        (TypeToken::Compound, _) => (param.grpc_type.clone().unwrap_or_else(|| "bytes".to_string()), true),
    };
    IpcField {
        name: snake_case(&param.name),
        proto_type,
        repeated,
        source: Some(param.name.clone()),
        enum_source: param.enum_name.clone(),
    }
}

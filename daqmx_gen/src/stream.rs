/* Stream-response projection.
 *
 * A registration function hands the native library a callback pointer and an opaque
 * token. On the surface the callback slot disappears: registration yields a
 * subscription, and each native invocation of the callback becomes one record
 * built from `callback_params` (minus the token), delivered in native order. */

use crate::error::SolverError;
use crate::naming::callback_stem;
use crate::surface::RecordField;
use daqmx_types::{FunctionEntry, ScalarType, TypeToken};
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct StreamBinding {
    pub callback_param: String,
    pub callback_type: String,
    pub token_param: String,
    pub record: String,
    /* every callback argument in native order, token included */
    pub arguments: Vec<RecordField>,
    pub token_index: usize,
    /* record fields: the arguments minus the token */
    pub fields: Vec<RecordField>,
}

pub fn project_stream(
    function: &str,
    entry: &FunctionEntry,
    symbol_prefix: &str,
) -> Result<Option<StreamBinding>, SolverError> {
    let invalid = |reason: String| SolverError::InvalidStream { function: function.to_string(), reason };

    let callbacks: Vec<_> = entry.parameters.iter().filter(|p| p.callback_params.is_some()).collect();
    if !entry.stream_response {
        if let Some(callback) = callbacks.first() {
            return Err(invalid(format!("'{}' declares callback_params outside a stream response", callback.name)));
        }
        return Ok(None);
    }

    let callback = match callbacks.as_slice() {
        [one] => *one,
        [] => return Err(invalid("no parameter declares callback_params".into())),
        _ => return Err(invalid("more than one callback parameter".into())),
    };
    let TypeToken::CallbackPtr(callback_type) = &callback.ty else {
        return Err(invalid(format!("'{}' is not a callback pointer", callback.name)));
    };
    let token = entry
        .parameters
        .iter()
        .find(|p| p.callback_token && p.callback_params.is_none())
        .ok_or_else(|| invalid("registration declares no callback_token parameter".into()))?;

    let params = callback.callback_params.as_deref().unwrap_or(&[]);
    let tokens: Vec<usize> = params
        .iter()
        .enumerate()
        .filter(|(_, p)| p.callback_token)
        .map(|(idx, _)| idx)
        .collect();
    let token_index = match tokens.as_slice() {
        [one] => *one,
        _ => return Err(invalid("callback must carry exactly one token argument".into())),
    };

    let mut fields = Vec::new();
    for (idx, param) in params.iter().enumerate() {
        if idx == token_index {
            continue;
        }
        let scalar = matches!(param.ty, TypeToken::Scalar(s) if s != ScalarType::Void);
        if !scalar && !param.ty.is_string() {
            return Err(invalid(format!("callback argument '{}' of type '{}' cannot be a record field", param.name, param.ty)));
        }
        fields.push(RecordField::from_param(param));
    }
    if fields.is_empty() {
        return Err(invalid("callback carries nothing but its token".into()));
    }

    Ok(Some(StreamBinding {
        callback_param: callback.name.clone(),
        callback_type: callback_type.clone(),
        token_param: token.name.clone(),
        record: format!("{}Record", callback_stem(callback_type, symbol_prefix)),
        arguments: params.iter().map(RecordField::from_param).collect(),
        token_index,
        fields,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTER: &str = r#"
calling_convention: StdCall
stream_response: true
returns: int32
parameters:
  - { name: task, cvi_name: taskHandle, direction: in, type: TaskHandle }
  - { name: everyNSamplesEventType, direction: in, type: int32 }
  - { name: nSamples, direction: in, type: uInt32 }
  - name: callbackFunction
    direction: in
    type: DAQmxEveryNSamplesEventCallbackPtr
    include_in_proto: false
    callback_params:
      - { name: task, direction: out, type: TaskHandle }
      - { name: everyNSamplesEventType, direction: out, type: int32 }
      - { name: nSamples, direction: out, type: uInt32 }
      - { name: callbackData, direction: out, type: void, pointer: true, callback_token: true }
  - { name: callbackData, direction: in, type: void, pointer: true, callback_token: true, include_in_proto: false }
"#;

    #[test]
    fn callback_becomes_record_without_token() {
        let entry: FunctionEntry = serde_yml::from_str(REGISTER).unwrap();
        let stream = project_stream("RegisterEveryNSamplesEvent", &entry, "DAQmx").unwrap().unwrap();
        assert_eq!(stream.record, "EveryNSamplesEventRecord");
        assert_eq!(stream.token_param, "callbackData");
        assert_eq!(stream.token_index, 3);
        let fields: Vec<_> = stream.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["task", "everyNSamplesEventType", "nSamples"]);
        assert_eq!(stream.arguments.len(), 4);
    }

    #[test]
    fn missing_token_is_rejected() {
        let yaml = REGISTER.replace(
            "  - { name: callbackData, direction: in, type: void, pointer: true, callback_token: true, include_in_proto: false }\n",
            "",
        );
        let entry: FunctionEntry = serde_yml::from_str(&yaml).unwrap();
        assert!(matches!(
            project_stream("RegisterEveryNSamplesEvent", &entry, "DAQmx"),
            Err(SolverError::InvalidStream { .. })
        ));
    }
}

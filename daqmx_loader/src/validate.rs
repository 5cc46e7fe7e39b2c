/* Catalog shape checks.
 *
 * Every check reports the first offending function by name. Functions are visited in
 * key order so that the reported error is stable across runs. Cross-function checks
 * (attribute shards) and expression parsing belong to the solver. */

use crate::error::SchemaError;
use daqmx_types::{
    Catalog, Direction, ExprKind, FunctionEntry, Parameter, ScalarType, SizeSpec, TypeToken,
};
use std::collections::BTreeSet;

pub fn validate_catalog(catalog: &Catalog) -> Result<(), SchemaError> {
    for (name, entry) in &catalog.functions {
        validate_function(name, entry)?;
        /* an enum tag without a table entry leaves the surface nothing to check against */
        for param in &entry.parameters {
            if let Some(enum_name) = &param.enum_name {
                if !catalog.enums.contains_key(enum_name) {
                    return Err(SchemaError::new(
                        name.as_str(),
                        field(param, "enum"),
                        format!("enum '{}' is not defined in the enum table", enum_name),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn field(param: &Parameter, attr: &str) -> String {
    if attr.is_empty() {
        format!("parameters.{}", param.name)
    } else {
        format!("parameters.{}.{}", param.name, attr)
    }
}

pub fn validate_function(name: &str, entry: &FunctionEntry) -> Result<(), SchemaError> {
    let err = |field: String, reason: String| SchemaError::new(name, field, reason);

    if !matches!(entry.returns, TypeToken::Scalar(s) if s != ScalarType::TaskHandle) {
        return Err(err("returns".into(), format!("'{}' is not a scalar result type", entry.returns)));
    }

    let mut seen = BTreeSet::new();
    for param in &entry.parameters {
        if !seen.insert(param.name.as_str()) {
            return Err(err(field(param, ""), "duplicate parameter name".into()));
        }
    }

    for param in &entry.parameters {
        validate_parameter(name, entry, param)?;
    }

    validate_handle(name, entry)?;
    validate_repeating(name, entry)?;
    validate_callbacks(name, entry)?;
    validate_init_method(name, entry)?;

    if entry.releases_handle && entry.handle_parameter.is_none() {
        return Err(err("releases_handle".into(), "requires a handle_parameter".into()));
    }
    if entry.is_python_factory && entry.python_class_name.is_none() {
        return Err(err("is_python_factory".into(), "a factory must name its python_class_name".into()));
    }
    if let Some(cname) = &entry.cname {
        if cname.trim().is_empty() {
            return Err(err("cname".into(), "must not be empty".into()));
        }
    }

    Ok(())
}

fn validate_parameter(name: &str, entry: &FunctionEntry, param: &Parameter) -> Result<(), SchemaError> {
    let err = |attr: &str, reason: String| SchemaError::new(name, field(param, attr), reason);

    if param.name.trim().is_empty() {
        return Err(SchemaError::new(name, "parameters", "parameter name must not be empty"));
    }

    if let Some(asserted) = param.is_list {
        if asserted != param.is_list() {
            return Err(err("is_list", format!("contradicts type '{}'", param.ty)));
        }
    }

    if param.enum_name.is_some() {
        let integral = param.ty.element().map(|e| e.is_integral()).unwrap_or(false);
        if !integral {
            return Err(err("enum", format!("enum-tagged parameter has non-integral type '{}'", param.ty)));
        }
    }

    match &param.ty {
        TypeToken::Scalar(ScalarType::Void) if !param.pointer => {
            return Err(err("type", "void is only valid with pointer: true".into()));
        }
        TypeToken::Compound if !param.repeated_var_args => {
            return Err(err("type", "compound lists must be declared repeated_var_args".into()));
        }
        _ => {}
    }

    if param.repeated_var_args {
        if param.ty != TypeToken::Compound {
            return Err(err("repeated_var_args", "requires type 'compound[]'".into()));
        }
        match param.max_length {
            Some(max) if max > 0 => {}
            Some(max) => return Err(err("max_length", format!("must be a positive integer, got {}", max))),
            None => return Err(err("max_length", "repeated_var_args requires a declared maximum".into())),
        }
    } else if let Some(max) = param.max_length {
        if max <= 0 {
            return Err(err("max_length", format!("must be a positive integer, got {}", max)));
        }
    }

    if param.coerced {
        let narrow = matches!(param.ty.element(), Some(e) if e.is_integral() && e.width() < 4);
        if !param.ty.is_buffer() || !narrow {
            return Err(err("coerced", format!("only narrow integral buffers may be coerced, not '{}'", param.ty)));
        }
    }

    if let Some(hardcoded) = &param.hardcoded_value {
        if hardcoded.is_null() && !(param.pointer || param.ty.is_buffer()) {
            return Err(err("hardcoded_value", "nullptr is only valid for pointers and buffers".into()));
        }
    }

    validate_size(name, entry, param)
}

/* Variable-length buffers carry exactly one size. NUL-terminated input strings,
 * hard-wired null buffers and fixed-width arrays carry none; compounds are bounded
 * by max_length instead. */
fn validate_size(name: &str, entry: &FunctionEntry, param: &Parameter) -> Result<(), SchemaError> {
    let err = |reason: String| SchemaError::new(name, field(param, "size"), reason);
    let null_buffer = param.hardcoded_value.as_ref().map(|v| v.is_null()).unwrap_or(false);
    let input_string = param.ty.is_string() && param.direction == Direction::In;
    let needs_size = matches!(param.ty, TypeToken::Buffer { .. }) && !null_buffer && !input_string;

    let size = match (&param.size, needs_size) {
        (None, false) => return Ok(()),
        (None, true) => return Err(err(format!("buffer of type '{}' has no size specification", param.ty))),
        (Some(_), false) => return Err(err(format!("type '{}' does not take a size specification", param.ty))),
        (Some(size), true) => size,
    };

    if let SizeSpec::IviDance(_) = size {
        if param.direction != Direction::Out {
            return Err(err("ivi-dance sizing is only valid for out buffers".into()));
        }
    }

    let referents = match size {
        SizeSpec::CustomCode(source) => match ExprKind::parse(source) {
            Ok(expr) => expr.referenced_names(),
            /* unparsable expressions are reported by the solver */
            Err(_) => return Ok(()),
        },
        other => BTreeSet::from([other.value().to_string()]),
    };

    for referent in referents {
        let peer = entry
            .param_index_by_any_name(&referent)
            .map(|idx| &entry.parameters[idx])
            .ok_or_else(|| err(format!("'{}' does not name a parameter of this function", referent)))?;
        if peer.name == param.name {
            return Err(err("a buffer cannot size itself".into()));
        }

        match size {
            SizeSpec::CustomCode(_) => {
                if peer.direction != Direction::In || !peer.ty.is_integral_scalar() {
                    return Err(err(format!("expression operand '{}' must be an integral in-parameter", referent)));
                }
            }
            _ => {
                if !peer.ty.is_size_type() {
                    return Err(err(format!("size parameter '{}' must be uInt32 or int32, not '{}'", referent, peer.ty)));
                }
            }
        }

        match size {
            SizeSpec::Len(_) if param.direction == Direction::In && peer.direction != Direction::In => {
                return Err(err(format!("len-derived size '{}' of an in buffer must be an in-parameter", referent)));
            }
            SizeSpec::PassedIn(_) | SizeSpec::IviDance(_)
                if param.direction == Direction::Out && peer.direction != Direction::In =>
            {
                return Err(err(format!("size '{}' of an out buffer must be an in-parameter", referent)));
            }
            _ => {}
        }
    }

    Ok(())
}

fn validate_handle(name: &str, entry: &FunctionEntry) -> Result<(), SchemaError> {
    let Some(handle) = &entry.handle_parameter else {
        return Ok(());
    };
    match entry.handle_candidates().len() {
        1 => Ok(()),
        0 => Err(SchemaError::new(
            name,
            "handle_parameter",
            format!("no in-parameter is named '{}'", handle.cvi_name),
        )),
        n => Err(SchemaError::new(
            name,
            "handle_parameter",
            format!("{} in-parameters are named '{}'", n, handle.cvi_name),
        )),
    }
}

/* Repeating arguments form one contiguous run sharing a direction and are never
 * size referents. A run declaring max_length must agree with its compound. */
fn validate_repeating(name: &str, entry: &FunctionEntry) -> Result<(), SchemaError> {
    let positions: Vec<usize> = entry
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| p.repeating_argument)
        .map(|(idx, _)| idx)
        .collect();

    let compounds: Vec<&Parameter> = entry.parameters.iter().filter(|p| p.repeated_var_args).collect();
    if compounds.len() > 1 {
        return Err(SchemaError::new(name, field(compounds[1], "repeated_var_args"), "only one compound list per function"));
    }

    let Some((&first, &last)) = positions.first().zip(positions.last()) else {
        return Ok(());
    };

    if last - first + 1 != positions.len() {
        let gap = (first..=last)
            .find(|idx| !entry.parameters[*idx].repeating_argument)
            .map(|idx| entry.parameters[idx].name.clone())
            .unwrap_or_default();
        return Err(SchemaError::new(
            name,
            "parameters",
            format!("repeating arguments must be consecutive; '{}' interrupts the run", gap),
        ));
    }

    let direction = entry.parameters[first].direction;
    let size_referents: BTreeSet<String> = entry
        .parameters
        .iter()
        .filter_map(|p| p.size.as_ref())
        .filter_map(|s| s.referents().ok())
        .flatten()
        .collect();

    let mut declared_max: Option<i64> = None;
    for &idx in &positions {
        let member = &entry.parameters[idx];
        if member.direction != direction {
            return Err(SchemaError::new(name, field(member, "direction"), "repeating arguments must share a direction"));
        }
        if member.ty.is_buffer() && !member.ty.is_string() {
            return Err(SchemaError::new(name, field(member, "type"), "repeating arguments must be scalars or strings"));
        }
        if size_referents.contains(&member.name) || size_referents.contains(member.native_name()) {
            return Err(SchemaError::new(name, field(member, ""), "a size parameter cannot repeat"));
        }
        if let Some(max) = member.max_length {
            match declared_max {
                Some(prev) if prev != max => {
                    return Err(SchemaError::new(name, field(member, "max_length"), "repeating arguments disagree on cardinality"));
                }
                _ => declared_max = Some(max),
            }
        }
    }

    if let (Some(run_max), Some(compound)) = (declared_max, compounds.first()) {
        if compound.max_length != Some(run_max) {
            return Err(SchemaError::new(
                name,
                field(compound, "max_length"),
                format!("compound maximum differs from the repeating run's cardinality {}", run_max),
            ));
        }
    }

    Ok(())
}

fn validate_callbacks(name: &str, entry: &FunctionEntry) -> Result<(), SchemaError> {
    let callbacks: Vec<&Parameter> = entry.parameters.iter().filter(|p| p.callback_params.is_some()).collect();

    for callback in &callbacks {
        if !entry.stream_response {
            return Err(SchemaError::new(name, field(callback, "callback_params"), "callback_params requires stream_response"));
        }
        if !matches!(callback.ty, TypeToken::CallbackPtr(_)) {
            return Err(SchemaError::new(name, field(callback, "type"), "callback_params must sit on a callback pointer"));
        }
    }

    if entry.stream_response {
        if callbacks.len() != 1 {
            return Err(SchemaError::new(name, "stream_response", "requires exactly one parameter with callback_params"));
        }
        if entry.callback_token_param().is_none() {
            return Err(SchemaError::new(name, "stream_response", "requires a callback_token parameter"));
        }
    } else if let Some(token) = entry.callback_token_param() {
        return Err(SchemaError::new(name, field(token, "callback_token"), "callback_token requires stream_response"));
    }

    Ok(())
}

/* Session identity must come from one named string input in every projection */
fn validate_init_method(name: &str, entry: &FunctionEntry) -> Result<(), SchemaError> {
    let session_params: Vec<&Parameter> = entry.parameters.iter().filter(|p| p.is_session_name).collect();

    if !entry.init_method {
        if let Some(param) = session_params.first() {
            return Err(SchemaError::new(name, field(param, "is_session_name"), "only init methods name a session"));
        }
        return Ok(());
    }

    match session_params.as_slice() {
        [param] => {
            if param.direction != Direction::In || !param.ty.is_string() {
                return Err(SchemaError::new(name, field(param, "is_session_name"), "session name must be a string in-parameter"));
            }
            if param.is_hardcoded() || !param.include_in_proto {
                return Err(SchemaError::new(name, field(param, "is_session_name"), "session name must be visible in every projection"));
            }
            Ok(())
        }
        [] => Err(SchemaError::new(name, "init_method", "init methods must declare one is_session_name parameter")),
        _ => Err(SchemaError::new(name, "init_method", "more than one is_session_name parameter")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> FunctionEntry {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn buffer_without_size_is_rejected() {
        let e = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: data, direction: in, type: "const float64[]" }
"#,
        );
        let err = validate_function("WriteThing", &e).unwrap_err();
        assert_eq!(err.function, "WriteThing");
        assert_eq!(err.field, "parameters.data.size");
    }

    #[test]
    fn size_referent_must_exist_and_be_32_bit() {
        let missing = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: data, direction: in, type: "const float64[]", size: { mechanism: len, value: count } }
"#,
        );
        assert!(validate_function("F", &missing).unwrap_err().reason.contains("count"));

        let wide = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: count, direction: in, type: uInt64 }
  - { name: data, direction: in, type: "const float64[]", size: { mechanism: len, value: count } }
"#,
        );
        assert!(validate_function("F", &wide).unwrap_err().reason.contains("uInt32 or int32"));
    }

    #[test]
    fn ivi_dance_requires_out_buffer() {
        let e = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: bufferSize, direction: in, type: uInt32 }
  - { name: value, direction: in, type: "float64[]", size: { mechanism: ivi-dance, value: bufferSize } }
"#,
        );
        assert!(validate_function("F", &e).unwrap_err().reason.contains("ivi-dance"));
    }

    #[test]
    fn enum_tag_needs_integral_type() {
        let e = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: rate, direction: in, type: float64, enum: Edge }
"#,
        );
        assert_eq!(validate_function("F", &e).unwrap_err().field, "parameters.rate.enum");
    }

    #[test]
    fn handle_must_match_exactly_one_in_parameter() {
        let e = entry(
            r#"
calling_convention: StdCall
returns: int32
handle_parameter: { cvi_name: taskHandle, accessor: self._handle }
parameters:
  - { name: task, direction: in, type: TaskHandle }
"#,
        );
        assert_eq!(validate_function("F", &e).unwrap_err().field, "handle_parameter");
    }

    #[test]
    fn repeating_run_must_be_consecutive() {
        let e = entry(
            r#"
calling_convention: Cdecl
returns: int32
parameters:
  - { name: deviceName, direction: in, type: "const char[]" }
  - { name: channelName, direction: in, type: "const char[]", repeating_argument: true }
  - { name: n, direction: in, type: uInt32 }
  - { name: state, direction: in, type: int32, repeating_argument: true }
"#,
        );
        let err = validate_function("F", &e).unwrap_err();
        assert!(err.reason.contains("consecutive"), "{}", err);
    }

    #[test]
    fn compound_requires_positive_maximum() {
        let e = entry(
            r#"
calling_convention: Cdecl
returns: int32
parameters:
  - { name: states, direction: in, type: "compound[]", repeated_var_args: true, max_length: 0 }
"#,
        );
        assert_eq!(validate_function("F", &e).unwrap_err().field, "parameters.states.max_length");
    }

    #[test]
    fn callback_params_require_stream_response_and_token() {
        let e = entry(
            r#"
calling_convention: StdCall
returns: int32
stream_response: true
parameters:
  - name: callbackFunction
    direction: in
    type: DAQmxDoneEventCallbackPtr
    callback_params:
      - { name: status, direction: out, type: int32 }
"#,
        );
        assert!(validate_function("F", &e).unwrap_err().reason.contains("callback_token"));
    }

    #[test]
    fn init_method_declares_one_session_name() {
        let e = entry(
            r#"
calling_convention: StdCall
returns: int32
init_method: true
parameters:
  - { name: sessionName, direction: in, type: "const char[]" }
  - { name: task, direction: out, type: TaskHandle }
"#,
        );
        assert_eq!(validate_function("F", &e).unwrap_err().field, "init_method");
    }
}

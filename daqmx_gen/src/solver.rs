/* Size-relation solver.
 *
 * Turns every sized buffer of a function into a plan the emitters and the runtime
 * follow verbatim:
 *
 *   len               -> LenDerived    (size slot hidden, filled from the buffer length)
 *   passed-in[-by-ptr]-> CallerSized   (size stays on the surface, companion reports count)
 *   ivi-dance         -> TwoCall       (preflight with a null buffer, then retrieve)
 *   custom-code       -> ExprComputed  (expression over bound in-parameters)
 *
 * The solver is a pure function of the catalog and the coercion table. */

use crate::dependency::SizeGraph;
use crate::error::SolverError;
use daqmx_types::{
    AdaptorExpr, Catalog, CoercionPolicy, CoercionTable, Direction, ExprKind, FunctionEntry, Parameter, SizeSpec,
    TypeToken,
};
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/* Built-in adaptor callee: first argument unless it is empty */
pub const COALESCE: &str = "coalesce";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "plan", rename_all = "kebab-case")]
pub enum SizePlan {
    LenDerived {
        size_param: String,
    },
    CallerSized {
        size_param: String,
        by_ptr: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        companion: Option<String>,
    },
    TwoCall {
        size_param: String,
    },
    ExprComputed {
        source: String,
        expression: ExprKind,
        operands: Vec<String>,
    },
}

impl SizePlan {
    pub fn kind(&self) -> &'static str {
        match self {
            SizePlan::LenDerived { .. } => "len-derived",
            SizePlan::CallerSized { .. } => "caller-sized",
            SizePlan::TwoCall { .. } => "two-call",
            SizePlan::ExprComputed { .. } => "expr-computed",
        }
    }

    pub fn size_param(&self) -> Option<&str> {
        match self {
            SizePlan::LenDerived { size_param }
            | SizePlan::CallerSized { size_param, .. }
            | SizePlan::TwoCall { size_param } => Some(size_param),
            SizePlan::ExprComputed { .. } => None,
        }
    }

    /* LenDerived and TwoCall sizes are filled in by the binding */
    pub fn hides_size(&self) -> bool {
        matches!(self, SizePlan::LenDerived { .. } | SizePlan::TwoCall { .. })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AdaptorBinding {
    pub name: String,
    pub data_type: String,
    pub expression: AdaptorExpr,
    pub operands: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFunction {
    pub name: String,
    pub native_symbol: String,
    pub entry: FunctionEntry,
    /* keyed by buffer parameter name */
    pub plans: BTreeMap<String, SizePlan>,
    pub evaluation_order: Vec<String>,
    pub hidden_sizes: BTreeSet<String>,
    pub coercion: BTreeMap<String, CoercionPolicy>,
    pub adaptor: Option<AdaptorBinding>,
}

impl ResolvedFunction {
    pub fn plan(&self, buffer: &str) -> Option<&SizePlan> {
        self.plans.get(buffer)
    }

    /* Buffers whose size slot is `size_param` */
    pub fn buffers_sized_by(&self, size_param: &str) -> Vec<String> {
        self.entry
            .parameters
            .iter()
            .filter(|p| self.plans.get(&p.name).and_then(SizePlan::size_param) == Some(size_param))
            .map(|p| p.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCatalog {
    pub catalog: Catalog,
    pub functions: BTreeMap<String, ResolvedFunction>,
}

pub fn solve(catalog: &Catalog, coercion: &CoercionTable) -> Result<ResolvedCatalog, SolverError> {
    let mut functions = BTreeMap::new();
    for (name, entry) in &catalog.functions {
        let native_symbol = entry.native_symbol(name, &catalog.catalog.symbol_prefix);
        let resolved = solve_function(name, &native_symbol, entry, coercion)?;
        functions.insert(name.clone(), resolved);
    }
    debug!("solved {} functions", functions.len());
    Ok(ResolvedCatalog { catalog: catalog.clone(), functions })
}

pub fn solve_function(
    name: &str,
    native_symbol: &str,
    entry: &FunctionEntry,
    coercion: &CoercionTable,
) -> Result<ResolvedFunction, SolverError> {
    let (graph, unresolved) = SizeGraph::from_entry(entry);
    if let Some((buffer, referent)) = unresolved.into_iter().next() {
        return Err(SolverError::UnresolvedSize {
            function: name.to_string(),
            parameter: buffer,
            reason: format!("'{}' does not name a parameter", referent),
        });
    }

    if let Some(cycle) = graph.detect_cycles().into_iter().next() {
        return Err(SolverError::CyclicSizing { function: name.to_string(), cycle: cycle.cycle });
    }
    let evaluation_order = graph.topological_sort().ok_or_else(|| SolverError::CyclicSizing {
        function: name.to_string(),
        cycle: Vec::new(),
    })?;

    let mut plans = BTreeMap::new();
    for (idx, param) in entry.parameters.iter().enumerate() {
        if let Some(plan) = plan_for(name, entry, idx, param)? {
            debug!("{}: {} -> {}", name, param.name, plan.kind());
            plans.insert(param.name.clone(), plan);
        }
    }

    check_shared_sizes(name, entry, &plans)?;

    let hidden_sizes = plans
        .values()
        .filter(|plan| plan.hides_size())
        .filter_map(|plan| plan.size_param().map(str::to_string))
        .collect();

    let mut policies = BTreeMap::new();
    for param in entry.parameters.iter().filter(|p| p.coerced) {
        let native_type = param.ty.element().map(|e| e.token().to_string()).unwrap_or_else(|| param.ty.to_string());
        let policy = coercion.get(&native_type).ok_or_else(|| SolverError::MissingCoercionPolicy {
            function: name.to_string(),
            parameter: param.name.clone(),
            native_type: native_type.clone(),
        })?;
        policies.insert(param.name.clone(), *policy);
    }

    let adaptor = match &entry.adaptor_parameter {
        Some(adaptor) => Some(resolve_adaptor(name, entry, adaptor)?),
        None => None,
    };

    Ok(ResolvedFunction {
        name: name.to_string(),
        native_symbol: native_symbol.to_string(),
        entry: entry.clone(),
        plans,
        evaluation_order,
        hidden_sizes,
        coercion: policies,
        adaptor,
    })
}

/* Buffers that never take a size: NUL-terminated input strings, hard-wired null
 * buffers and fixed-width arrays. */
fn needs_size(param: &Parameter) -> bool {
    let null_buffer = param.hardcoded_value.as_ref().map(|v| v.is_null()).unwrap_or(false);
    let input_string = param.ty.is_string() && param.is_in();
    matches!(param.ty, TypeToken::Buffer { .. }) && !null_buffer && !input_string
}

fn plan_for(name: &str, entry: &FunctionEntry, idx: usize, param: &Parameter) -> Result<Option<SizePlan>, SolverError> {
    let unresolved = |reason: String| SolverError::UnresolvedSize {
        function: name.to_string(),
        parameter: param.name.clone(),
        reason,
    };

    let Some(size) = &param.size else {
        if needs_size(param) {
            return Err(unresolved(format!("buffer of type '{}' has no size specification", param.ty)));
        }
        return Ok(None);
    };

    let referent = |value: &str| -> Result<String, SolverError> {
        entry
            .param_index_by_any_name(value)
            .map(|i| entry.parameters[i].name.clone())
            .ok_or_else(|| unresolved(format!("'{}' does not name a parameter", value)))
    };

    let plan = match size {
        SizeSpec::Len(value) => {
            if param.is_out() {
                return Err(unresolved("len sizing measures a caller buffer; out buffers have none".into()));
            }
            SizePlan::LenDerived { size_param: referent(value)? }
        }
        SizeSpec::PassedIn(value) | SizeSpec::PassedInByPtr(value) => SizePlan::CallerSized {
            size_param: referent(value)?,
            by_ptr: matches!(size, SizeSpec::PassedInByPtr(_)),
            companion: if param.is_out() { companion_after(entry, idx) } else { None },
        },
        SizeSpec::IviDance(value) => {
            if !param.is_out() {
                return Err(unresolved("ivi-dance discovery is only defined for out buffers".into()));
            }
            SizePlan::TwoCall { size_param: referent(value)? }
        }
        SizeSpec::CustomCode(source) => {
            let invalid = |reason: String| SolverError::InvalidExpression {
                function: name.to_string(),
                parameter: param.name.clone(),
                expression: source.clone(),
                reason,
            };
            let parsed = ExprKind::parse(source).map_err(|e| invalid(e.to_string()))?;
            let expression = canonicalize(&parsed, entry).map_err(|ident| invalid(format!("undefined identifier '{}'", ident)))?;
            let operands: Vec<String> = expression.referenced_names().into_iter().collect();
            for operand in &operands {
                let peer = entry.param(operand).ok_or_else(|| invalid(format!("undefined identifier '{}'", operand)))?;
                if peer.direction != Direction::In || !peer.ty.is_integral_scalar() {
                    return Err(invalid(format!("operand '{}' is not an integral in-parameter", operand)));
                }
            }
            SizePlan::ExprComputed { source: source.clone(), expression, operands }
        }
    };

    Ok(Some(plan))
}

/* The first out integral scalar declared after the buffer reports how many
 * elements were actually written. */
fn companion_after(entry: &FunctionEntry, idx: usize) -> Option<String> {
    entry.parameters[idx + 1..]
        .iter()
        .find(|p| p.is_out() && p.ty.is_integral_scalar() && !p.ty.is_handle())
        .map(|p| p.name.clone())
}

/* Rewrites identifiers that use native names to the surface parameter name. */
fn canonicalize(expr: &ExprKind, entry: &FunctionEntry) -> Result<ExprKind, String> {
    Ok(match expr {
        ExprKind::Literal(value) => ExprKind::Literal(*value),
        ExprKind::ParamRef(ident) => {
            let idx = entry.param_index_by_any_name(ident).ok_or_else(|| ident.clone())?;
            ExprKind::ParamRef(entry.parameters[idx].name.clone())
        }
        ExprKind::Unary { op, operand } => ExprKind::Unary { op: *op, operand: Box::new(canonicalize(operand, entry)?) },
        ExprKind::Binary { op, left, right } => ExprKind::Binary {
            op: *op,
            left: Box::new(canonicalize(left, entry)?),
            right: Box::new(canonicalize(right, entry)?),
        },
        ExprKind::Ternary { condition, then_branch, else_branch } => ExprKind::Ternary {
            condition: Box::new(canonicalize(condition, entry)?),
            then_branch: Box::new(canonicalize(then_branch, entry)?),
            else_branch: Box::new(canonicalize(else_branch, entry)?),
        },
    })
}

/* A size slot may serve several buffers only when every one of them is
 * len-derived in the same direction; the runtime then requires equal lengths. */
fn check_shared_sizes(name: &str, entry: &FunctionEntry, plans: &BTreeMap<String, SizePlan>) -> Result<(), SolverError> {
    let mut users: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for param in &entry.parameters {
        if let Some(size_param) = plans.get(&param.name).and_then(SizePlan::size_param) {
            users.entry(size_param).or_default().push(param.name.as_str());
        }
    }

    for (size_param, buffers) in users.into_iter().filter(|(_, b)| b.len() > 1) {
        let directions: BTreeSet<Direction> =
            buffers.iter().filter_map(|b| entry.param(b)).map(|p| p.direction).collect();
        let all_len = buffers.iter().all(|b| matches!(plans.get(*b), Some(SizePlan::LenDerived { .. })));
        if !all_len || directions.len() != 1 {
            return Err(SolverError::SharedSizeConflict {
                function: name.to_string(),
                size_param: size_param.to_string(),
                buffers: buffers.iter().map(|b| b.to_string()).collect(),
            });
        }
    }
    Ok(())
}

fn resolve_adaptor(
    name: &str,
    entry: &FunctionEntry,
    adaptor: &daqmx_types::AdaptorParameter,
) -> Result<AdaptorBinding, SolverError> {
    let invalid = |reason: String| SolverError::InvalidExpression {
        function: name.to_string(),
        parameter: adaptor.name.clone(),
        expression: adaptor.expression.clone(),
        reason,
    };

    let expression = AdaptorExpr::parse(&adaptor.expression).map_err(|e| invalid(e.to_string()))?;
    check_coalesce_arity(&expression).map_err(invalid)?;

    let operands: Vec<String> = expression.referenced_names().into_iter().collect();
    for operand in &operands {
        match entry.param(operand) {
            Some(peer) if peer.is_in() => {}
            Some(_) => return Err(invalid(format!("'{}' is not an in-parameter", operand))),
            None => return Err(invalid(format!("undefined identifier '{}'", operand))),
        }
    }

    Ok(AdaptorBinding {
        name: adaptor.name.clone(),
        data_type: adaptor.data_type.clone(),
        expression,
        operands,
        description: adaptor.description.clone(),
    })
}

fn check_coalesce_arity(expr: &AdaptorExpr) -> Result<(), String> {
    if let AdaptorExpr::Call { callee, args } = expr {
        if callee == COALESCE && args.len() != 2 {
            return Err(format!("{} takes two arguments, got {}", COALESCE, args.len()));
        }
        for arg in args {
            check_coalesce_arity(arg)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqmx_types::{Narrowing, Widening};

    fn entry(yaml: &str) -> FunctionEntry {
        serde_yml::from_str(yaml).unwrap()
    }

    fn solve_one(yaml: &str) -> Result<ResolvedFunction, SolverError> {
        solve_function("Subject", "DAQmxSubject", &entry(yaml), &CoercionTable::new())
    }

    #[test]
    fn caller_sized_output_finds_companion() {
        let resolved = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: numSampsPerChan, direction: in, type: int32 }
  - { name: readArray, direction: out, type: "float64[]", size: { mechanism: passed-in, value: arraySizeInSamps } }
  - { name: arraySizeInSamps, direction: in, type: uInt32 }
  - { name: sampsPerChanRead, direction: out, type: int32 }
"#,
        )
        .unwrap();
        assert_eq!(
            resolved.plan("readArray"),
            Some(&SizePlan::CallerSized {
                size_param: "arraySizeInSamps".into(),
                by_ptr: false,
                companion: Some("sampsPerChanRead".into()),
            })
        );
        assert!(resolved.hidden_sizes.is_empty());
    }

    #[test]
    fn passed_in_by_ptr_is_marked() {
        let resolved = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: data, direction: out, type: "uInt8[]", size: { mechanism: passed-in-by-ptr, value: arraySize } }
  - { name: arraySize, direction: in, type: uInt32, pointer: true }
"#,
        )
        .unwrap();
        assert!(matches!(resolved.plan("data"), Some(SizePlan::CallerSized { by_ptr: true, companion: None, .. })));
    }

    #[test]
    fn two_call_hides_size() {
        let resolved = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: errorString, direction: out, type: "char[]", size: { mechanism: ivi-dance, value: bufferSize } }
  - { name: bufferSize, direction: in, type: uInt32 }
"#,
        )
        .unwrap();
        assert_eq!(resolved.plan("errorString"), Some(&SizePlan::TwoCall { size_param: "bufferSize".into() }));
        assert!(resolved.hidden_sizes.contains("bufferSize"));
    }

    #[test]
    fn expression_operands_accept_native_names() {
        let resolved = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: order, cvi_name: reversePolyOrder, direction: in, type: int32 }
  - { name: coeffs, direction: out, type: "float64[]", size: { mechanism: custom-code, value: "reversePolyOrder + 1" } }
"#,
        )
        .unwrap();
        match resolved.plan("coeffs") {
            Some(SizePlan::ExprComputed { operands, expression, .. }) => {
                assert_eq!(operands, &vec!["order".to_string()]);
                assert_eq!(expression.to_c_string(), "(order+1)");
            }
            other => panic!("unexpected plan {:?}", other),
        }
        assert_eq!(resolved.evaluation_order, vec!["order".to_string(), "coeffs".to_string()]);
    }

    #[test]
    fn undefined_expression_identifier_is_rejected() {
        let err = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: coeffs, direction: out, type: "float64[]", size: { mechanism: custom-code, value: "order + 1" } }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::InvalidExpression { .. }));
        assert_eq!(err.function(), "Subject");
    }

    #[test]
    fn shared_len_size_is_accepted_but_mixed_sharing_is_not() {
        let shared = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: n, direction: in, type: int32 }
  - { name: frequency, direction: in, type: "const float64[]", size: { mechanism: len, value: n } }
  - { name: dutyCycle, direction: in, type: "const float64[]", size: { mechanism: len, value: n } }
"#,
        )
        .unwrap();
        assert_eq!(shared.buffers_sized_by("n"), vec!["frequency".to_string(), "dutyCycle".to_string()]);

        let err = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: n, direction: in, type: int32 }
  - { name: input, direction: in, type: "const float64[]", size: { mechanism: len, value: n } }
  - { name: output, direction: out, type: "float64[]", size: { mechanism: passed-in, value: n } }
"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SolverError::SharedSizeConflict {
                function: "Subject".into(),
                size_param: "n".into(),
                buffers: vec!["input".into(), "output".into()],
            }
        );
    }

    #[test]
    fn cycles_are_reported_even_without_validation() {
        let err = solve_one(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: a, direction: out, type: "int32[]", size: { mechanism: passed-in, value: b } }
  - { name: b, direction: out, type: "int32[]", size: { mechanism: passed-in, value: a } }
"#,
        )
        .unwrap_err();
        match err {
            SolverError::CyclicSizing { cycle, .. } => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn coerced_buffers_need_a_policy() {
        let yaml = r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: n, direction: in, type: int32 }
  - { name: data, direction: in, type: "const int16[]", coerced: true, size: { mechanism: len, value: n } }
"#;
        let err = solve_one(yaml).unwrap_err();
        assert_eq!(
            err,
            SolverError::MissingCoercionPolicy {
                function: "Subject".into(),
                parameter: "data".into(),
                native_type: "int16".into(),
            }
        );

        let mut table = CoercionTable::new();
        table.insert("int16".into(), CoercionPolicy { narrowing: Narrowing::Saturate, widening: Widening::SignExtend });
        let resolved = solve_function("Subject", "DAQmxSubject", &entry(yaml), &table).unwrap();
        assert_eq!(resolved.coercion["data"].narrowing, Narrowing::Saturate);
    }

    #[test]
    fn adaptor_operands_must_be_in_parameters() {
        let err = solve_one(
            r#"
calling_convention: StdCall
returns: int32
adaptor_parameter: { name: channel, data_type: AIChannel, expression: "AIChannel(task, coalesce(alias, missing))" }
parameters:
  - { name: task, direction: in, type: TaskHandle }
  - { name: alias, direction: in, type: "const char[]" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::InvalidExpression { ref parameter, .. } if parameter == "channel"));
    }
}

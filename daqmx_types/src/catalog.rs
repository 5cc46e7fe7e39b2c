use crate::expr::{ExprError, ExprKind};
use crate::lexicon::TypeToken;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_SYMBOL_PREFIX: &str = "DAQmx";
pub const DEFAULT_ERROR_INFO_FUNCTION: &str = "GetExtendedErrorInfo";

/* ============================================================================
   Serde helpers
   ============================================================================ */

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_symbol_prefix() -> String {
    DEFAULT_SYMBOL_PREFIX.to_string()
}

fn is_default_symbol_prefix(value: &String) -> bool {
    value == DEFAULT_SYMBOL_PREFIX
}

fn default_error_info_function() -> String {
    DEFAULT_ERROR_INFO_FUNCTION.to_string()
}

fn is_default_error_info_function(value: &String) -> bool {
    value == DEFAULT_ERROR_INFO_FUNCTION
}

/* ============================================================================
   Catalog
   ============================================================================ */

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CatalogMetadata {
    pub package: String,
    pub version: String,
    #[serde(default = "default_symbol_prefix", skip_serializing_if = "is_default_symbol_prefix")]
    pub symbol_prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /* Symbol (catalog key) of the two-call extended error text function */
    #[serde(default = "default_error_info_function", skip_serializing_if = "is_default_error_info_function")]
    pub error_info_function: String,
}

impl Default for CatalogMetadata {
    fn default() -> Self {
        Self {
            package: String::new(),
            version: String::new(),
            symbol_prefix: default_symbol_prefix(),
            description: String::new(),
            error_info_function: default_error_info_function(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct EnumDef {
    pub values: Vec<EnumValue>,
}

impl EnumDef {
    pub fn contains(&self, value: i64) -> bool {
        self.values.iter().any(|v| v.value == value)
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }
}

pub type EnumTable = BTreeMap<String, EnumDef>;

/// The complete, immutable function catalog. Functions are keyed by name and
/// iterate in sorted order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    pub catalog: CatalogMetadata,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enums: EnumTable,
    pub functions: BTreeMap<String, FunctionEntry>,
}

impl Catalog {
    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    pub fn native_symbol(&self, name: &str) -> Option<String> {
        self.functions
            .get(name)
            .map(|entry| entry.native_symbol(name, &self.catalog.symbol_prefix))
    }
}

/* ============================================================================
   Function entries
   ============================================================================ */

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallingConvention {
    StdCall,
    Cdecl,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandleParameter {
    /* native-side parameter name */
    pub cvi_name: String,
    /* logical accessor on the receiver, e.g. `self._handle` */
    pub accessor: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AdaptorParameter {
    pub name: String,
    pub data_type: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FunctionEntry {
    pub calling_convention: CallingConvention,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub returns: TypeToken,
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_parameter: Option<HandleParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptor_parameter: Option<AdaptorParameter>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_python_factory: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub init_method: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub stream_response: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub releases_handle: bool,
}

impl FunctionEntry {
    /* Exported symbol targeted by this entry: the cname override or the key,
     * joined with the symbol prefix unless already carried. */
    pub fn native_symbol(&self, key: &str, prefix: &str) -> String {
        let base = self.cname.as_deref().unwrap_or(key);
        if base.starts_with(prefix) {
            base.to_string()
        } else {
            format!("{}{}", prefix, base)
        }
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /* Size referents and expressions name peers by surface name or native name */
    pub fn param_index_by_any_name(&self, name: &str) -> Option<usize> {
        self.param_index(name)
            .or_else(|| self.parameters.iter().position(|p| p.native_name() == name))
    }

    /* In-parameters whose native name matches the handle's declared identifier */
    pub fn handle_candidates(&self) -> Vec<usize> {
        match &self.handle_parameter {
            Some(handle) => self
                .parameters
                .iter()
                .enumerate()
                .filter(|(_, p)| p.direction == Direction::In && p.native_name() == handle.cvi_name)
                .map(|(idx, _)| idx)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn session_name_param(&self) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.is_session_name)
    }

    pub fn callback_token_param(&self) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.callback_token)
    }

    pub fn callback_param(&self) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.callback_params.is_some())
    }
}

/* ============================================================================
   Parameters
   ============================================================================ */

/* YAML scalar used by `default` and `hardcoded_value` */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Str(s) if s == "nullptr" || s == "NULL")
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Bool(b) => Some(*b as i64),
            Literal::Int(v) => Some(*v),
            Literal::Float(_) | Literal::Str(_) => None,
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "mechanism", content = "value", rename_all = "kebab-case")]
pub enum SizeSpec {
    Len(String),
    PassedIn(String),
    PassedInByPtr(String),
    IviDance(String),
    CustomCode(String),
}

impl SizeSpec {
    pub fn mechanism(&self) -> &'static str {
        match self {
            SizeSpec::Len(_) => "len",
            SizeSpec::PassedIn(_) => "passed-in",
            SizeSpec::PassedInByPtr(_) => "passed-in-by-ptr",
            SizeSpec::IviDance(_) => "ivi-dance",
            SizeSpec::CustomCode(_) => "custom-code",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            SizeSpec::Len(v)
            | SizeSpec::PassedIn(v)
            | SizeSpec::PassedInByPtr(v)
            | SizeSpec::IviDance(v)
            | SizeSpec::CustomCode(v) => v,
        }
    }

    /* Peer parameter names this specification depends on */
    pub fn referents(&self) -> Result<BTreeSet<String>, ExprError> {
        match self {
            SizeSpec::CustomCode(source) => Ok(ExprKind::parse(source)?.referenced_names()),
            other => Ok(BTreeSet::from([other.value().to_string()])),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Parameter {
    pub name: String,
    pub direction: Direction,
    #[serde(rename = "type")]
    pub ty: TypeToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvi_name: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_list: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardcoded_value: Option<Literal>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub include_in_proto: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub repeating_argument: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub repeated_var_args: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_compound_type: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_params: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub callback_token: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_session_name: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub coerced: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pointer: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Parameter {
    /* Name as declared by the native prototype */
    pub fn native_name(&self) -> &str {
        self.cvi_name.as_deref().unwrap_or(&self.name)
    }

    /* Buffers, fixed arrays and compound lists all take a size */
    pub fn is_list(&self) -> bool {
        self.ty.is_buffer() || self.ty == TypeToken::Compound
    }

    pub fn is_optional(&self) -> bool {
        self.optional || self.default.is_some()
    }

    pub fn is_hardcoded(&self) -> bool {
        self.hardcoded_value.is_some()
    }

    pub fn is_in(&self) -> bool {
        self.direction == Direction::In
    }

    pub fn is_out(&self) -> bool {
        self.direction == Direction::Out
    }
}

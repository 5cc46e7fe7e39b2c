use crate::lexicon::ScalarType;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/* What to do with a surface value that does not fit the native element type */
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Narrowing {
    Saturate,
    Wrap,
    Reject,
}

/* How native elements are widened back to the 32-bit surface type */
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Widening {
    SignExtend,
    ZeroExtend,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CoercionPolicy {
    pub narrowing: Narrowing,
    pub widening: Widening,
}

/// Policy table keyed by native element token (`int16`, `uInt16`, `uInt8`, ...).
pub type CoercionTable = BTreeMap<String, CoercionPolicy>;

/* Surface element used for a coerced buffer of `native` elements */
pub fn coerced_surface_element(native: ScalarType) -> ScalarType {
    if native.is_signed() {
        ScalarType::Int32
    } else {
        ScalarType::UInt32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_reads_kebab_case() {
        let table: CoercionTable = serde_yml::from_str(
            "int16: { narrowing: saturate, widening: sign-extend }\nuInt8: { narrowing: reject, widening: zero-extend }\n",
        )
        .unwrap();
        assert_eq!(table["int16"].narrowing, Narrowing::Saturate);
        assert_eq!(table["uInt8"].widening, Widening::ZeroExtend);
        assert_eq!(coerced_surface_element(ScalarType::UInt16), ScalarType::UInt32);
        assert_eq!(coerced_surface_element(ScalarType::Int16), ScalarType::Int32);
    }
}

use crate::error::SolverError;
use crate::naming::upper_camel;
use crate::surface::{CompoundBinding, NativeSlot, RecordField, SlotSource};
use daqmx_types::{Direction, FunctionEntry, ScalarType, TypeToken};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Classification of a function's repeating arguments.
///
/// `Unclassified -> HasRepeatingRun -> HasCompoundCompanion -> Collapsed`. A run
/// without a compound sibling stops at `HasRepeatingRun` and stays un-collapsed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GroupState {
    Unclassified,
    HasRepeatingRun,
    HasCompoundCompanion,
    Collapsed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collapse {
    pub state: GroupState,
    pub compound: Option<CompoundBinding>,
}

/// Fold the repeating run of `entry` into its compound list. Run members become
/// `Repeating` slots; everything else is left untouched, so collapsing an already
/// collapsed slot list changes nothing.
pub fn collapse(function: &str, entry: &FunctionEntry, slots: &mut [NativeSlot]) -> Result<Collapse, SolverError> {
    let invalid = |reason: String| SolverError::InvalidRepeatingGroup { function: function.to_string(), reason };
    let mut state = GroupState::Unclassified;

    let run: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| entry.param(&slot.name).map(|p| p.repeating_argument).unwrap_or(false))
        .map(|(idx, _)| idx)
        .collect();
    let compound = entry.parameters.iter().find(|p| p.repeated_var_args);

    let Some((&first, &last)) = run.first().zip(run.last()) else {
        if let Some(compound) = compound {
            return Err(invalid(format!("compound '{}' has no repeating run to collapse", compound.name)));
        }
        return Ok(Collapse { state, compound: None });
    };

    if last - first + 1 != run.len() {
        return Err(invalid("repeating arguments are not contiguous".into()));
    }

    let directions: BTreeSet<Direction> = run.iter().map(|&idx| slots[idx].direction).collect();
    if directions.len() != 1 {
        return Err(invalid("repeating arguments mix directions".into()));
    }
    let direction = slots[first].direction;

    let size_referents: BTreeSet<String> = entry
        .parameters
        .iter()
        .filter_map(|p| p.size.as_ref())
        .filter_map(|size| size.referents().ok())
        .flatten()
        .filter_map(|referent| entry.param_index_by_any_name(&referent))
        .map(|idx| entry.parameters[idx].name.clone())
        .collect();
    for &idx in &run {
        let slot = &slots[idx];
        if size_referents.contains(&slot.name) {
            return Err(invalid(format!("'{}' is a size parameter and cannot repeat", slot.name)));
        }
        let column_type = matches!(slot.ty, TypeToken::Scalar(s) if s != ScalarType::TaskHandle && s != ScalarType::Void)
            || slot.ty.is_string();
        if !column_type {
            return Err(invalid(format!("'{}' of type '{}' cannot be a record field", slot.name, slot.ty)));
        }
    }

    state = advance(function, state, GroupState::HasRepeatingRun);

    let Some(compound) = compound else {
        return Ok(Collapse { state, compound: None });
    };

    let max_length = match compound.max_length {
        Some(max) if max > 0 => max as usize,
        Some(max) => return Err(invalid(format!("maximum cardinality must be positive, got {}", max))),
        None => return Err(invalid(format!("compound '{}' declares no maximum cardinality", compound.name))),
    };
    for &idx in &run {
        if let Some(member_max) = entry.param(&slots[idx].name).and_then(|p| p.max_length) {
            if member_max as usize != max_length {
                return Err(invalid(format!(
                    "'{}' declares {} elements but '{}' declares {}",
                    slots[idx].name, member_max, compound.name, max_length
                )));
            }
        }
    }
    if compound.direction != direction {
        return Err(invalid(format!("compound '{}' and its run differ in direction", compound.name)));
    }

    state = advance(function, state, GroupState::HasCompoundCompanion);

    let mut fields = Vec::with_capacity(run.len());
    for &idx in &run {
        let slot = &mut slots[idx];
        slot.source = SlotSource::Repeating { field: slot.name.clone() };
        if let Some(param) = entry.param(&slot.name) {
            fields.push(RecordField::from_param(param));
        }
    }

    state = advance(function, state, GroupState::Collapsed);

    Ok(Collapse {
        state,
        compound: Some(CompoundBinding {
            param: compound.name.clone(),
            record: compound.grpc_type.clone().unwrap_or_else(|| upper_camel(&compound.name)),
            fields,
            max_length,
            direction,
            state,
        }),
    })
}

fn advance(function: &str, from: GroupState, to: GroupState) -> GroupState {
    debug!("{}: repeating group {:?} -> {:?}", function, from, to);
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqmx_types::FunctionEntry;

    fn slots_for(entry: &FunctionEntry) -> Vec<NativeSlot> {
        entry
            .parameters
            .iter()
            .filter(|p| !p.repeated_var_args)
            .map(|p| NativeSlot {
                name: p.name.clone(),
                native_name: p.native_name().to_string(),
                ty: p.ty.clone(),
                direction: p.direction,
                pointer: p.pointer,
                enum_name: p.enum_name.clone(),
                coercion: None,
                source: SlotSource::Argument,
            })
            .collect()
    }

    const POWER_UP: &str = r#"
calling_convention: Cdecl
returns: int32
parameters:
  - { name: deviceName, direction: in, type: "const char[]" }
  - { name: channelNames, direction: in, type: "const char[]", repeating_argument: true, include_in_proto: false }
  - { name: state, direction: in, type: int32, enum: PowerUpStates, repeating_argument: true, include_in_proto: false }
  - { name: powerUpStates, direction: in, type: "compound[]", repeated_var_args: true, is_compound_type: true, max_length: 96, grpc_type: DigitalPowerUpChannelsAndState }
"#;

    #[test]
    fn run_with_compound_collapses() {
        let entry: FunctionEntry = serde_yml::from_str(POWER_UP).unwrap();
        let mut slots = slots_for(&entry);
        let collapsed = collapse("SetDigitalPowerUpStates", &entry, &mut slots).unwrap();

        assert_eq!(collapsed.state, GroupState::Collapsed);
        let compound = collapsed.compound.unwrap();
        assert_eq!(compound.record, "DigitalPowerUpChannelsAndState");
        assert_eq!(compound.max_length, 96);
        let names: Vec<_> = compound.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["channelNames", "state"]);

        assert_eq!(slots[0].source, SlotSource::Argument);
        assert_eq!(slots[1].source, SlotSource::Repeating { field: "channelNames".into() });
        assert_eq!(slots[2].source, SlotSource::Repeating { field: "state".into() });
    }

    #[test]
    fn collapsing_twice_is_a_no_op() {
        let entry: FunctionEntry = serde_yml::from_str(POWER_UP).unwrap();
        let mut slots = slots_for(&entry);
        let first = collapse("SetDigitalPowerUpStates", &entry, &mut slots).unwrap();
        let after_first = slots.clone();
        let second = collapse("SetDigitalPowerUpStates", &entry, &mut slots).unwrap();
        assert_eq!(first, second);
        assert_eq!(after_first, slots);
    }

    #[test]
    fn run_without_compound_stays_uncollapsed() {
        let entry: FunctionEntry = serde_yml::from_str(
            r#"
calling_convention: Cdecl
returns: int32
parameters:
  - { name: lines, direction: in, type: "const char[]", repeating_argument: true }
  - { name: level, direction: in, type: int32, repeating_argument: true }
"#,
        )
        .unwrap();
        let mut slots = slots_for(&entry);
        let collapsed = collapse("Subject", &entry, &mut slots).unwrap();
        assert_eq!(collapsed.state, GroupState::HasRepeatingRun);
        assert!(collapsed.compound.is_none());
        assert!(slots.iter().all(|s| s.source == SlotSource::Argument));
    }

    #[test]
    fn mixed_direction_run_is_rejected() {
        let entry: FunctionEntry = serde_yml::from_str(
            r#"
calling_convention: Cdecl
returns: int32
parameters:
  - { name: lines, direction: in, type: "const char[]", repeating_argument: true }
  - { name: level, direction: out, type: int32, repeating_argument: true }
"#,
        )
        .unwrap();
        let mut slots = slots_for(&entry);
        let err = collapse("Subject", &entry, &mut slots).unwrap_err();
        assert!(matches!(err, SolverError::InvalidRepeatingGroup { .. }));
    }
}

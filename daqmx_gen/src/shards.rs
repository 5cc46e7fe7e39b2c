/* Attribute-shard grouping.
 *
 * Typed catalog entries that share a `cname` route through one native symbol. Each
 * shard keeps its own typed signature; together they form a group with a single
 * generic getter or setter over a tagged attribute value. Members must agree on
 * every slot except the one value slot whose type distinguishes them. */

use crate::error::SolverError;
use crate::naming::snake_case;
use crate::solver::ResolvedCatalog;
use daqmx_types::{AttributeKind, CallingConvention, FunctionEntry};
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeAccess {
    Get,
    Set,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ShardMember {
    pub kind: AttributeKind,
    pub function: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ShardGroup {
    /* cname without the symbol prefix, e.g. `GetChanAttribute` */
    pub name: String,
    pub native_symbol: String,
    pub method_name: String,
    pub calling_convention: CallingConvention,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub access: AttributeAccess,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub value_param: String,
    /* sorted by kind */
    pub members: Vec<ShardMember>,
}

impl ShardGroup {
    pub fn member(&self, kind: AttributeKind) -> Option<&str> {
        self.members.iter().find(|m| m.kind == kind).map(|m| m.function.as_str())
    }

    pub fn kinds(&self) -> impl Iterator<Item = AttributeKind> + '_ {
        self.members.iter().map(|m| m.kind)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ShardMembership {
    /* native symbol of the group */
    pub group: String,
    pub kind: AttributeKind,
}

pub type ShardGroups = BTreeMap<String, ShardGroup>;
pub type ShardMemberships = BTreeMap<String, ShardMembership>;

pub fn group_shards(resolved: &ResolvedCatalog) -> Result<(ShardGroups, ShardMemberships), SolverError> {
    let prefix = resolved.catalog.catalog.symbol_prefix.as_str();

    let mut by_symbol: BTreeMap<&str, Vec<(&str, &FunctionEntry)>> = BTreeMap::new();
    for (name, function) in &resolved.functions {
        if function.entry.cname.is_some() {
            by_symbol
                .entry(function.native_symbol.as_str())
                .or_default()
                .push((name.as_str(), &function.entry));
        }
    }

    let mut groups = ShardGroups::new();
    let mut memberships = ShardMemberships::new();
    for (symbol, members) in by_symbol {
        let group_name = symbol.strip_prefix(prefix).unwrap_or(symbol).to_string();
        let group = build_group(&group_name, symbol, &members)?;
        debug!("shard group {} has {} members", group.name, group.members.len());
        for member in &group.members {
            memberships.insert(
                member.function.clone(),
                ShardMembership { group: symbol.to_string(), kind: member.kind },
            );
        }
        groups.insert(symbol.to_string(), group);
    }

    Ok((groups, memberships))
}

fn build_group(group_name: &str, symbol: &str, members: &[(&str, &FunctionEntry)]) -> Result<ShardGroup, SolverError> {
    let mismatch = |function: &str, reason: String| SolverError::ShardMismatch {
        function: function.to_string(),
        cname: group_name.to_string(),
        reason,
    };

    let (first_name, first) = members[0];
    for &(name, entry) in &members[1..] {
        if entry.parameters.len() != first.parameters.len() {
            return Err(mismatch(
                name,
                format!("{} parameters, '{}' has {}", entry.parameters.len(), first_name, first.parameters.len()),
            ));
        }
        if entry.calling_convention != first.calling_convention {
            return Err(mismatch(name, "calling convention differs".into()));
        }
        if entry.python_class_name != first.python_class_name || entry.handle_parameter != first.handle_parameter {
            return Err(mismatch(name, "receiver binding differs".into()));
        }
        for (idx, (param, reference)) in entry.parameters.iter().zip(&first.parameters).enumerate() {
            if param.name != reference.name || param.direction != reference.direction {
                return Err(mismatch(
                    name,
                    format!("slot {} is '{}' ({:?}), expected '{}' ({:?})", idx, param.name, param.direction, reference.name, reference.direction),
                ));
            }
        }
    }

    let variant: BTreeSet<usize> = (0..first.parameters.len())
        .filter(|&idx| members.iter().any(|(_, e)| e.parameters[idx].ty != first.parameters[idx].ty))
        .collect();

    let value_idx = if members.len() == 1 {
        first
            .param_index("value")
            .or_else(|| first.parameters.iter().position(|p| p.is_out() && !p.is_hardcoded()))
            .ok_or_else(|| mismatch(first_name, "no value slot".into()))?
    } else {
        match variant.iter().copied().collect::<Vec<_>>().as_slice() {
            [one] => *one,
            [] => return Err(mismatch(first_name, "shards do not differ in any slot".into())),
            many => {
                let names: Vec<_> = many.iter().map(|&i| first.parameters[i].name.as_str()).collect();
                return Err(mismatch(first_name, format!("shards differ in more than one slot: {}", names.join(", "))));
            }
        }
    };

    for &(name, entry) in members {
        for (idx, (param, reference)) in entry.parameters.iter().zip(&first.parameters).enumerate() {
            if idx != value_idx && param.enum_name != reference.enum_name {
                return Err(mismatch(name, format!("'{}' differs in its enum", param.name)));
            }
        }
    }

    let mut kinds: BTreeMap<AttributeKind, String> = BTreeMap::new();
    for &(name, entry) in members {
        let value = &entry.parameters[value_idx];
        let kind = AttributeKind::from_token(&value.ty)
            .ok_or_else(|| mismatch(name, format!("value type '{}' has no attribute kind", value.ty)))?;
        if let Some(existing) = kinds.insert(kind, name.to_string()) {
            return Err(mismatch(name, format!("kind {} is already served by '{}'", kind, existing)));
        }
    }

    let value = &first.parameters[value_idx];
    let selector = first.parameters[..value_idx]
        .iter()
        .rev()
        .find(|p| p.is_in() && p.enum_name.is_some() && p.ty.is_integral_scalar())
        .map(|p| p.name.clone());

    Ok(ShardGroup {
        name: group_name.to_string(),
        native_symbol: symbol.to_string(),
        method_name: snake_case(group_name),
        calling_convention: first.calling_convention,
        class: first.python_class_name.clone(),
        access: if value.is_out() { AttributeAccess::Get } else { AttributeAccess::Set },
        selector,
        value_param: value.name.clone(),
        members: kinds.into_iter().map(|(kind, function)| ShardMember { kind, function }).collect(),
    })
}

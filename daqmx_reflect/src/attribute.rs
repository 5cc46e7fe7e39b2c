/* Attribute access through shard groups: one polymorphic native function, one
 * catalog entry per value kind. Dispatch picks the shard serving the kind. */

use crate::errors::{DaqmxError, DaqmxResult, Outcome};
use crate::handle::TaskHandle;
use crate::invoker::Invoker;
use crate::value::{Args, Value};
use daqmx_gen::{AttributeAccess, ShardGroup};
use daqmx_types::AttributeKind;

impl Invoker {
    pub fn shard_group(&self, group: &str) -> DaqmxResult<&ShardGroup> {
        self.surface().shard_group(group).ok_or_else(|| DaqmxError::UnknownFunction {
            function: group.to_string(),
        })
    }

    /// Value kinds a shard group can serve.
    pub fn attribute_kinds(&self, group: &str) -> DaqmxResult<Vec<AttributeKind>> {
        Ok(self.shard_group(group)?.kinds().collect())
    }

    /// Read an attribute of `kind`. `args` carries the selector and any other
    /// inputs of the group; the value comes back alone.
    pub fn get_attribute(
        &self,
        receiver: Option<&TaskHandle>,
        group: &str,
        kind: AttributeKind,
        args: &Args,
    ) -> DaqmxResult<Outcome<Value>> {
        let (member, value_param) = self.shard_member(group, kind, AttributeAccess::Get)?;
        let outcome = match receiver {
            Some(handle) => self.call_on(handle, &member, args)?,
            None => self.call(&member, args)?,
        };
        Ok(outcome.map(|mut outputs| outputs.shift_remove(&value_param).unwrap_or(Value::Unit)))
    }

    /// Write `value` as an attribute of `kind`.
    pub fn set_attribute(
        &self,
        receiver: Option<&TaskHandle>,
        group: &str,
        kind: AttributeKind,
        args: &Args,
        value: Value,
    ) -> DaqmxResult<Outcome<()>> {
        let (member, value_param) = self.shard_member(group, kind, AttributeAccess::Set)?;
        let mut args = args.clone();
        args.insert(value_param, value);
        let outcome = match receiver {
            Some(handle) => self.call_on(handle, &member, &args)?,
            None => self.call(&member, &args)?,
        };
        Ok(outcome.map(|_| ()))
    }

    fn shard_member(&self, group: &str, kind: AttributeKind, access: AttributeAccess) -> DaqmxResult<(String, String)> {
        let shards = self.shard_group(group)?;
        if shards.access != access {
            return Err(DaqmxError::WrongReceiver {
                function: group.to_string(),
                expected: format!("{:?} access", shards.access),
                actual: format!("{:?} access", access),
            });
        }
        let member = shards.member(kind).ok_or_else(|| {
            let kinds: Vec<String> = shards.kinds().map(|k| k.to_string()).collect();
            DaqmxError::invalid_argument(
                group,
                format!("no {} shard; available kinds: {}", kind, kinds.join(", ")),
            )
        })?;
        Ok((member.to_string(), shards.value_param.clone()))
    }
}

use super::ir_proto;
use crate::collapser::GroupState;
use crate::ipc::{IpcField, IpcProjection};
use crate::placement::Placement;
use crate::shards::{AttributeAccess, ShardGroup, ShardMembership};
use crate::solver::{AdaptorBinding, SizePlan};
use crate::stream::StreamBinding;
use crate::surface::{
  CompoundBinding, InitBinding, NativeSlot, OutputKind, RecordField, SlotSource, SurfaceCatalog, SurfaceClass,
  SurfaceFunction, SurfaceInput, SurfaceOutput,
};
use daqmx_types::{CallingConvention, Direction, EnumDef};
use prost::Message;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IrSerializationError {
  #[error("failed to encode protobuf: {0}")]
  ProtobufEncode(#[from] prost::EncodeError),
  #[error("failed to decode protobuf: {0}")]
  ProtobufDecode(#[from] prost::DecodeError),
}

pub fn surface_to_json(surface: &SurfaceCatalog) -> serde_json::Result<String> {
  serde_json::to_string_pretty(surface)
}

pub fn surface_from_json(source: &str) -> serde_json::Result<SurfaceCatalog> {
  serde_json::from_str(source)
}

pub fn surface_to_protobuf(surface: &SurfaceCatalog) -> Result<Vec<u8>, IrSerializationError> {
  let proto: ir_proto::SurfaceCatalog = surface.into();
  let mut buf = Vec::with_capacity(proto.encoded_len());
  proto.encode(&mut buf)?;
  Ok(buf)
}

pub fn surface_from_protobuf(bytes: &[u8]) -> Result<ir_proto::SurfaceCatalog, IrSerializationError> {
  Ok(ir_proto::SurfaceCatalog::decode(bytes)?)
}

/* Serde spelling of a unit variant, e.g. `has-compound-companion` */
fn label<T: Serialize>(value: &T) -> String {
  serde_json::to_value(value).ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default()
}

fn convention(value: CallingConvention) -> i32 {
  match value {
    CallingConvention::StdCall => ir_proto::CallingConvention::StdCall as i32,
    CallingConvention::Cdecl => ir_proto::CallingConvention::Cdecl as i32,
  }
}

fn direction(value: Direction) -> i32 {
  match value {
    Direction::In => ir_proto::Direction::In as i32,
    Direction::Out => ir_proto::Direction::Out as i32,
  }
}

impl From<&SurfaceCatalog> for ir_proto::SurfaceCatalog {
  fn from(value: &SurfaceCatalog) -> Self {
    Self {
      version: value.version,
      package: value.package.clone(),
      catalog_version: value.catalog_version.clone(),
      fingerprint: value.fingerprint.clone(),
      symbol_prefix: value.symbol_prefix.clone(),
      error_info: value.error_info.clone(),
      enums: value.enums.iter().map(|(name, def)| enum_def(name, def)).collect(),
      classes: value.classes.values().map(Into::into).collect(),
      functions: value.functions.values().map(Into::into).collect(),
      shards: value.shards.values().map(Into::into).collect(),
    }
  }
}

fn enum_def(name: &str, def: &EnumDef) -> ir_proto::EnumDef {
  ir_proto::EnumDef {
    name: name.to_string(),
    values: def
      .values
      .iter()
      .map(|v| ir_proto::EnumValue { name: v.name.clone(), value: v.value })
      .collect(),
  }
}

impl From<&SurfaceClass> for ir_proto::SurfaceClass {
  fn from(value: &SurfaceClass) -> Self {
    Self {
      name: value.name.clone(),
      factories: value.factories.clone(),
      methods: value.methods.clone(),
      statics: value.statics.clone(),
      releaser: value.releaser.clone(),
    }
  }
}

impl From<&SurfaceFunction> for ir_proto::SurfaceFunction {
  fn from(value: &SurfaceFunction) -> Self {
    Self {
      name: value.name.clone(),
      native_symbol: value.native_symbol.clone(),
      calling_convention: convention(value.calling_convention),
      description: value.description.clone(),
      method_name: value.method_name.clone(),
      placement: Some((&value.placement).into()),
      returns: value.returns.to_string(),
      slots: value.slots.iter().map(Into::into).collect(),
      inputs: value.inputs.iter().map(Into::into).collect(),
      outputs: value.outputs.iter().map(Into::into).collect(),
      size_plans: value.size_plans.iter().map(|(buffer, plan)| size_plan(buffer, plan)).collect(),
      evaluation_order: value.evaluation_order.clone(),
      compound: value.compound.as_ref().map(Into::into),
      stream: value.stream.as_ref().map(Into::into),
      adaptor: value.adaptor.as_ref().map(Into::into),
      shard: value.shard.as_ref().map(Into::into),
      init: value.init.as_ref().map(Into::into),
      releases_handle: value.releases_handle,
      ipc: Some((&value.ipc).into()),
    }
  }
}

impl From<&Placement> for ir_proto::Placement {
  fn from(value: &Placement) -> Self {
    let (kind, class, accessor) = match value {
      Placement::Module => (ir_proto::PlacementKind::Module, None, None),
      Placement::Instance { class, accessor } => {
        (ir_proto::PlacementKind::Instance, Some(class.clone()), Some(accessor.clone()))
      }
      Placement::Factory { class } => (ir_proto::PlacementKind::Factory, Some(class.clone()), None),
      Placement::Static { class } => (ir_proto::PlacementKind::Static, Some(class.clone()), None),
    };
    Self { kind: kind as i32, class, accessor }
  }
}

impl From<&NativeSlot> for ir_proto::NativeSlot {
  fn from(value: &NativeSlot) -> Self {
    Self {
      name: value.name.clone(),
      native_name: value.native_name.clone(),
      ty: value.ty.to_string(),
      direction: direction(value.direction),
      pointer: value.pointer,
      enum_name: value.enum_name.clone(),
      coercion: value.coercion.map(|policy| ir_proto::Coercion {
        narrowing: label(&policy.narrowing),
        widening: label(&policy.widening),
      }),
      source: Some((&value.source).into()),
    }
  }
}

impl From<&SlotSource> for ir_proto::SlotSource {
  fn from(value: &SlotSource) -> Self {
    use ir_proto::slot_source::Kind;
    let kind = match value {
      SlotSource::Receiver => Kind::Receiver(ir_proto::Empty {}),
      SlotSource::Argument => Kind::Argument(ir_proto::Empty {}),
      SlotSource::Hardcoded { value } => Kind::Hardcoded(value.to_string()),
      SlotSource::LengthOf { buffers } => Kind::LengthOf(ir_proto::Buffers { names: buffers.clone() }),
      SlotSource::DiscoveredSize { buffer } => Kind::DiscoveredSize(buffer.clone()),
      SlotSource::Output => Kind::Output(ir_proto::Empty {}),
      SlotSource::Callback => Kind::Callback(ir_proto::Empty {}),
      SlotSource::CallbackToken => Kind::CallbackToken(ir_proto::Empty {}),
      SlotSource::Repeating { field } => Kind::Repeating(field.clone()),
    };
    Self { kind: Some(kind) }
  }
}

impl From<&SurfaceInput> for ir_proto::SurfaceInput {
  fn from(value: &SurfaceInput) -> Self {
    Self {
      name: value.name.clone(),
      ident: value.ident.clone(),
      ty: value.ty.to_string(),
      enum_name: value.enum_name.clone(),
      default: value.default.as_ref().map(ToString::to_string),
      optional: value.optional,
      description: value.description.clone(),
    }
  }
}

impl From<&SurfaceOutput> for ir_proto::SurfaceOutput {
  fn from(value: &SurfaceOutput) -> Self {
    let kind = match value.kind {
      OutputKind::Value => ir_proto::OutputKind::Value,
      OutputKind::Buffer => ir_proto::OutputKind::Buffer,
      OutputKind::Companion => ir_proto::OutputKind::Companion,
      OutputKind::Handle => ir_proto::OutputKind::Handle,
    };
    Self {
      name: value.name.clone(),
      ident: value.ident.clone(),
      ty: value.ty.to_string(),
      enum_name: value.enum_name.clone(),
      kind: kind as i32,
      description: value.description.clone(),
    }
  }
}

fn size_plan(buffer: &str, plan: &SizePlan) -> ir_proto::SizePlan {
  use ir_proto::size_plan::Plan;
  let plan = match plan {
    SizePlan::LenDerived { size_param } => Plan::LenDerived(ir_proto::LenDerived { size_param: size_param.clone() }),
    SizePlan::CallerSized { size_param, by_ptr, companion } => Plan::CallerSized(ir_proto::CallerSized {
      size_param: size_param.clone(),
      by_ptr: *by_ptr,
      companion: companion.clone(),
    }),
    SizePlan::TwoCall { size_param } => Plan::TwoCall(ir_proto::TwoCall { size_param: size_param.clone() }),
    SizePlan::ExprComputed { source, expression, operands } => Plan::ExprComputed(ir_proto::ExprComputed {
      source: source.clone(),
      expression: expression.to_c_string(),
      operands: operands.clone(),
    }),
  };
  ir_proto::SizePlan { buffer: buffer.to_string(), plan: Some(plan) }
}

impl From<&RecordField> for ir_proto::RecordField {
  fn from(value: &RecordField) -> Self {
    Self {
      name: value.name.clone(),
      ident: value.ident.clone(),
      ty: value.ty.to_string(),
      enum_name: value.enum_name.clone(),
    }
  }
}

impl From<&CompoundBinding> for ir_proto::CompoundBinding {
  fn from(value: &CompoundBinding) -> Self {
    Self {
      param: value.param.clone(),
      record: value.record.clone(),
      fields: value.fields.iter().map(Into::into).collect(),
      max_length: value.max_length as u64,
      direction: direction(value.direction),
      state: label::<GroupState>(&value.state),
    }
  }
}

impl From<&StreamBinding> for ir_proto::StreamBinding {
  fn from(value: &StreamBinding) -> Self {
    Self {
      callback_param: value.callback_param.clone(),
      callback_type: value.callback_type.clone(),
      token_param: value.token_param.clone(),
      record: value.record.clone(),
      arguments: value.arguments.iter().map(Into::into).collect(),
      token_index: value.token_index as u32,
      fields: value.fields.iter().map(Into::into).collect(),
    }
  }
}

impl From<&AdaptorBinding> for ir_proto::AdaptorBinding {
  fn from(value: &AdaptorBinding) -> Self {
    Self {
      name: value.name.clone(),
      data_type: value.data_type.clone(),
      expression: value.expression.to_string(),
      operands: value.operands.clone(),
      description: value.description.clone(),
    }
  }
}

impl From<&ShardMembership> for ir_proto::ShardMembership {
  fn from(value: &ShardMembership) -> Self {
    Self { group: value.group.clone(), kind: value.kind.to_string() }
  }
}

impl From<&InitBinding> for ir_proto::InitBinding {
  fn from(value: &InitBinding) -> Self {
    Self { session_name_param: value.session_name_param.clone(), handle_output: value.handle_output.clone() }
  }
}

impl From<&IpcField> for ir_proto::IpcField {
  fn from(value: &IpcField) -> Self {
    Self {
      name: value.name.clone(),
      proto_type: value.proto_type.clone(),
      repeated: value.repeated,
      source: value.source.clone(),
      enum_source: value.enum_source.clone(),
    }
  }
}

impl From<&IpcProjection> for ir_proto::IpcProjection {
  fn from(value: &IpcProjection) -> Self {
    Self {
      rpc: value.rpc.clone(),
      request: value.request.clone(),
      response: value.response.clone(),
      streaming: value.streaming,
      request_fields: value.request_fields.iter().map(Into::into).collect(),
      response_fields: value.response_fields.iter().map(Into::into).collect(),
    }
  }
}

impl From<&ShardGroup> for ir_proto::ShardGroup {
  fn from(value: &ShardGroup) -> Self {
    let access = match value.access {
      AttributeAccess::Get => ir_proto::AttributeAccess::Get,
      AttributeAccess::Set => ir_proto::AttributeAccess::Set,
    };
    Self {
      name: value.name.clone(),
      native_symbol: value.native_symbol.clone(),
      method_name: value.method_name.clone(),
      calling_convention: convention(value.calling_convention),
      class: value.class.clone(),
      access: access as i32,
      selector: value.selector.clone(),
      value_param: value.value_param.clone(),
      members: value
        .members
        .iter()
        .map(|m| ir_proto::ShardMember { kind: m.kind.to_string(), function: m.function.clone() })
        .collect(),
    }
  }
}

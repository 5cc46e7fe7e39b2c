pub mod ir_proto;
pub mod serialization;

pub use serialization::{
  surface_from_json, surface_from_protobuf, surface_to_json, surface_to_protobuf, IrSerializationError,
};

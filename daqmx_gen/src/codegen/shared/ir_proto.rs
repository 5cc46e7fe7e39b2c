use prost::{Message, Oneof};

#[derive(Clone, PartialEq, Message)]
pub struct SurfaceCatalog {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(string, tag = "2")]
    pub package: String,
    #[prost(string, tag = "3")]
    pub catalog_version: String,
    #[prost(string, tag = "4")]
    pub fingerprint: String,
    #[prost(string, tag = "5")]
    pub symbol_prefix: String,
    #[prost(string, optional, tag = "6")]
    pub error_info: Option<String>,
    #[prost(message, repeated, tag = "7")]
    pub enums: Vec<EnumDef>,
    #[prost(message, repeated, tag = "8")]
    pub classes: Vec<SurfaceClass>,
    #[prost(message, repeated, tag = "9")]
    pub functions: Vec<SurfaceFunction>,
    #[prost(message, repeated, tag = "10")]
    pub shards: Vec<ShardGroup>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumDef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub values: Vec<EnumValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumValue {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(sint64, tag = "2")]
    pub value: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SurfaceClass {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, repeated, tag = "2")]
    pub factories: Vec<String>,
    #[prost(string, repeated, tag = "3")]
    pub methods: Vec<String>,
    #[prost(string, repeated, tag = "4")]
    pub statics: Vec<String>,
    #[prost(string, optional, tag = "5")]
    pub releaser: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SurfaceFunction {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub native_symbol: String,
    #[prost(enumeration = "CallingConvention", tag = "3")]
    pub calling_convention: i32,
    #[prost(string, tag = "4")]
    pub description: String,
    #[prost(string, tag = "5")]
    pub method_name: String,
    #[prost(message, optional, tag = "6")]
    pub placement: Option<Placement>,
    #[prost(string, tag = "7")]
    pub returns: String,
    #[prost(message, repeated, tag = "8")]
    pub slots: Vec<NativeSlot>,
    #[prost(message, repeated, tag = "9")]
    pub inputs: Vec<SurfaceInput>,
    #[prost(message, repeated, tag = "10")]
    pub outputs: Vec<SurfaceOutput>,
    #[prost(message, repeated, tag = "11")]
    pub size_plans: Vec<SizePlan>,
    #[prost(string, repeated, tag = "12")]
    pub evaluation_order: Vec<String>,
    #[prost(message, optional, tag = "13")]
    pub compound: Option<CompoundBinding>,
    #[prost(message, optional, tag = "14")]
    pub stream: Option<StreamBinding>,
    #[prost(message, optional, tag = "15")]
    pub adaptor: Option<AdaptorBinding>,
    #[prost(message, optional, tag = "16")]
    pub shard: Option<ShardMembership>,
    #[prost(message, optional, tag = "17")]
    pub init: Option<InitBinding>,
    #[prost(bool, tag = "18")]
    pub releases_handle: bool,
    #[prost(message, optional, tag = "19")]
    pub ipc: Option<IpcProjection>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CallingConvention {
    StdCall = 0,
    Cdecl = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Direction {
    In = 0,
    Out = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PlacementKind {
    Module = 0,
    Instance = 1,
    Factory = 2,
    Static = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct Placement {
    #[prost(enumeration = "PlacementKind", tag = "1")]
    pub kind: i32,
    #[prost(string, optional, tag = "2")]
    pub class: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub accessor: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Coercion {
    #[prost(string, tag = "1")]
    pub narrowing: String,
    #[prost(string, tag = "2")]
    pub widening: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct NativeSlot {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub native_name: String,
    #[prost(string, tag = "3")]
    pub ty: String,
    #[prost(enumeration = "Direction", tag = "4")]
    pub direction: i32,
    #[prost(bool, tag = "5")]
    pub pointer: bool,
    #[prost(string, optional, tag = "6")]
    pub enum_name: Option<String>,
    #[prost(message, optional, tag = "7")]
    pub coercion: Option<Coercion>,
    #[prost(message, optional, tag = "8")]
    pub source: Option<SlotSource>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, Message)]
pub struct Buffers {
    #[prost(string, repeated, tag = "1")]
    pub names: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SlotSource {
    #[prost(oneof = "slot_source::Kind", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9")]
    pub kind: Option<slot_source::Kind>,
}

pub mod slot_source {
    use super::*;

    #[derive(Clone, PartialEq, Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Receiver(Empty),
        #[prost(message, tag = "2")]
        Argument(Empty),
        /* literal in catalog spelling */
        #[prost(string, tag = "3")]
        Hardcoded(String),
        #[prost(message, tag = "4")]
        LengthOf(Buffers),
        #[prost(string, tag = "5")]
        DiscoveredSize(String),
        #[prost(message, tag = "6")]
        Output(Empty),
        #[prost(message, tag = "7")]
        Callback(Empty),
        #[prost(message, tag = "8")]
        CallbackToken(Empty),
        #[prost(string, tag = "9")]
        Repeating(String),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct SurfaceInput {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub ident: String,
    #[prost(string, tag = "3")]
    pub ty: String,
    #[prost(string, optional, tag = "4")]
    pub enum_name: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub default: Option<String>,
    #[prost(bool, tag = "6")]
    pub optional: bool,
    #[prost(string, tag = "7")]
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OutputKind {
    Value = 0,
    Buffer = 1,
    Companion = 2,
    Handle = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct SurfaceOutput {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub ident: String,
    #[prost(string, tag = "3")]
    pub ty: String,
    #[prost(string, optional, tag = "4")]
    pub enum_name: Option<String>,
    #[prost(enumeration = "OutputKind", tag = "5")]
    pub kind: i32,
    #[prost(string, tag = "6")]
    pub description: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SizePlan {
    #[prost(string, tag = "1")]
    pub buffer: String,
    #[prost(oneof = "size_plan::Plan", tags = "2, 3, 4, 5")]
    pub plan: Option<size_plan::Plan>,
}

pub mod size_plan {
    use super::*;

    #[derive(Clone, PartialEq, Oneof)]
    pub enum Plan {
        #[prost(message, tag = "2")]
        LenDerived(LenDerived),
        #[prost(message, tag = "3")]
        CallerSized(CallerSized),
        #[prost(message, tag = "4")]
        TwoCall(TwoCall),
        #[prost(message, tag = "5")]
        ExprComputed(ExprComputed),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct LenDerived {
    #[prost(string, tag = "1")]
    pub size_param: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct CallerSized {
    #[prost(string, tag = "1")]
    pub size_param: String,
    #[prost(bool, tag = "2")]
    pub by_ptr: bool,
    #[prost(string, optional, tag = "3")]
    pub companion: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TwoCall {
    #[prost(string, tag = "1")]
    pub size_param: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExprComputed {
    #[prost(string, tag = "1")]
    pub source: String,
    /* fully parenthesized C spelling of the parsed tree */
    #[prost(string, tag = "2")]
    pub expression: String,
    #[prost(string, repeated, tag = "3")]
    pub operands: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RecordField {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub ident: String,
    #[prost(string, tag = "3")]
    pub ty: String,
    #[prost(string, optional, tag = "4")]
    pub enum_name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CompoundBinding {
    #[prost(string, tag = "1")]
    pub param: String,
    #[prost(string, tag = "2")]
    pub record: String,
    #[prost(message, repeated, tag = "3")]
    pub fields: Vec<RecordField>,
    #[prost(uint64, tag = "4")]
    pub max_length: u64,
    #[prost(enumeration = "Direction", tag = "5")]
    pub direction: i32,
    #[prost(string, tag = "6")]
    pub state: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct StreamBinding {
    #[prost(string, tag = "1")]
    pub callback_param: String,
    #[prost(string, tag = "2")]
    pub callback_type: String,
    #[prost(string, tag = "3")]
    pub token_param: String,
    #[prost(string, tag = "4")]
    pub record: String,
    #[prost(message, repeated, tag = "5")]
    pub arguments: Vec<RecordField>,
    #[prost(uint32, tag = "6")]
    pub token_index: u32,
    #[prost(message, repeated, tag = "7")]
    pub fields: Vec<RecordField>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AdaptorBinding {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub data_type: String,
    #[prost(string, tag = "3")]
    pub expression: String,
    #[prost(string, repeated, tag = "4")]
    pub operands: Vec<String>,
    #[prost(string, tag = "5")]
    pub description: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ShardMembership {
    #[prost(string, tag = "1")]
    pub group: String,
    #[prost(string, tag = "2")]
    pub kind: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct InitBinding {
    #[prost(string, tag = "1")]
    pub session_name_param: String,
    #[prost(string, tag = "2")]
    pub handle_output: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct IpcField {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub proto_type: String,
    #[prost(bool, tag = "3")]
    pub repeated: bool,
    #[prost(string, optional, tag = "4")]
    pub source: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub enum_source: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct IpcProjection {
    #[prost(string, tag = "1")]
    pub rpc: String,
    #[prost(string, tag = "2")]
    pub request: String,
    #[prost(string, tag = "3")]
    pub response: String,
    #[prost(bool, tag = "4")]
    pub streaming: bool,
    #[prost(message, repeated, tag = "5")]
    pub request_fields: Vec<IpcField>,
    #[prost(message, repeated, tag = "6")]
    pub response_fields: Vec<IpcField>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AttributeAccess {
    Get = 0,
    Set = 1,
}

#[derive(Clone, PartialEq, Message)]
pub struct ShardMember {
    #[prost(string, tag = "1")]
    pub kind: String,
    #[prost(string, tag = "2")]
    pub function: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ShardGroup {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub native_symbol: String,
    #[prost(string, tag = "3")]
    pub method_name: String,
    #[prost(enumeration = "CallingConvention", tag = "4")]
    pub calling_convention: i32,
    #[prost(string, optional, tag = "5")]
    pub class: Option<String>,
    #[prost(enumeration = "AttributeAccess", tag = "6")]
    pub access: i32,
    #[prost(string, optional, tag = "7")]
    pub selector: Option<String>,
    #[prost(string, tag = "8")]
    pub value_param: String,
    #[prost(message, repeated, tag = "9")]
    pub members: Vec<ShardMember>,
}

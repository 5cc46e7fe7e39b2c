//! DAQmx Binding Generator
//!
//! Solves the size relations of every catalog function, collapses repeating
//! groups, places functions on classes, groups attribute shards and projects
//! callbacks into streams. The resulting Surface Catalog drives every emitter:
//! Rust bindings, the IPC proto, the canonical description and IR dumps.

pub mod cmds;
pub mod codegen;
pub mod collapser;
pub mod dependency;
pub mod error;
pub mod ipc;
pub mod naming;
pub mod placement;
pub mod shards;
pub mod solver;
pub mod stream;
pub mod surface;

pub use collapser::{collapse, GroupState};
pub use error::{GenError, GenResult, SolverError};
pub use ipc::{IpcField, IpcProjection};
pub use placement::Placement;
pub use shards::{AttributeAccess, ShardGroup, ShardMember, ShardMembership};
pub use solver::{solve, solve_function, AdaptorBinding, ResolvedCatalog, ResolvedFunction, SizePlan};
pub use stream::StreamBinding;
pub use surface::{
    build_surface, build_surface_from_catalog, CompoundBinding, InitBinding, NativeSlot, OutputKind, RecordField,
    SlotSource, SurfaceCatalog, SurfaceClass, SurfaceFunction, SurfaceInput, SurfaceOutput, SURFACE_VERSION,
};

pub use daqmx_loader;
pub use daqmx_types;

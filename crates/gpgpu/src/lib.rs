//! Layout and scheduling core for multi-pass GPGPU simulations.
//!
//! A simulation is a list of values, each a few channels wide, that are
//! updated every tick by drawing into textures. Values are packed into texture
//! groups no wider than one texel, groups into passes no wider than the
//! device's colour attachments, and every pass reads back the states it
//! depends on from a ring of past steps:
//!
//! ```text
//!   channels per value ──▶ pack() ──▶ Groups ─┐
//!   derives per value ─────────────▶ resolve() ┴▶ SampleMap
//!                                                   │
//!   Plan { Groups, SampleMap, HistoryDepth } ◀──────┘
//!          │ allocate(factory)            │ binder()
//!          ▼                              ▼
//!   History<Texture, Target>  ◀──  UniformBinder::bind_pass(StepState)
//! ```
//!
//! Nothing here talks to a GPU directly. Resource creation goes through a
//! [`TargetFactory`]; [`RecordingFactory`] only records descriptors, and the
//! `wgpu` feature adds a factory backed by a real device.

mod error;
mod groups;
mod history;
mod ids;
mod inputs;
mod plan;
mod resources;
mod samples;
mod state;

#[cfg(feature = "wgpu")]
pub mod gpu;

pub use error::{ConfigurationError, InvariantViolation, SetupError};
pub use groups::{pack, CapacityWarning, Groups, Limits, TextureSpan};
pub use history::{wrap_index, HistoryDepth};
pub use ids::{PassId, TextureGroupId, ValueId};
pub use inputs::{read_lag, BoundSample, PassBindings, StepUniforms, UniformBinder};
pub use plan::{Plan, PlanOptions};
pub use resources::{
    pass_channels, DataType, Extent, History, RecordingFactory, Size, TargetDescriptor,
    TargetFactory, TargetRecord, TextureDescriptor, TextureFormat, TextureRecord,
};
pub use samples::{resolve, Derive, ReadIndex, Sample, SampleMap};
pub use state::StepState;

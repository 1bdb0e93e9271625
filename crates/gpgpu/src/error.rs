use crate::ids::{PassId, TextureGroupId, ValueId};
use crate::samples::Sample;

/// Caller input that can never produce a usable schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("texture capacity must be at least one channel")]
    ZeroChannelsMax,
    #[error("at least one texture per pass is required")]
    ZeroTexturesMax,
    #[error("{0} declares zero channels")]
    EmptyValue(ValueId),
    #[error("{value} needs {channels} channels but a texture holds {channels_max}")]
    OversizedValue {
        value: ValueId,
        channels: usize,
        channels_max: usize,
    },
    #[error("derives are declared for {declared} values but only {values} exist")]
    ExtraDerives { declared: usize, values: usize },
    #[error("{value} derives (slot {slot}) from {target}, which does not exist")]
    UnknownDependency {
        value: ValueId,
        slot: usize,
        target: ValueId,
    },
    #[error("{value} derives (slot {slot}) from {target}, which was dropped from packing")]
    DroppedDependency {
        value: ValueId,
        slot: usize,
        target: ValueId,
    },
    #[error("channels_min ({channels_min}) may not exceed channels_max ({channels_max})")]
    ChannelsMinAboveMax {
        channels_min: usize,
        channels_max: usize,
    },
    #[error("history depth must be at least {required}; got {depth}")]
    HistoryTooShallow { depth: usize, required: usize },
    #[error(
        "{pass} reads {texture} {offset} ticks back, which needs {required} steps of history but only {depth} are kept"
    )]
    InsufficientHistory {
        pass: PassId,
        texture: TextureGroupId,
        offset: usize,
        required: usize,
        depth: usize,
    },
    #[error("texture extent must be non-zero; got {width}x{height}")]
    EmptyExtent { width: u32, height: u32 },
}

/// A broken internal guarantee; always a bug in this crate, never caller error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{texture} packs {channels} channels, over the limit of {channels_max}")]
    TextureOverCapacity {
        texture: TextureGroupId,
        channels: usize,
        channels_max: usize,
    },
    #[error("{pass} holds {textures} textures, over the limit of {textures_max}")]
    PassOverCapacity {
        pass: PassId,
        textures: usize,
        textures_max: usize,
    },
    #[error("{pass} lists sample {sample:?} more than once")]
    DuplicateSample { pass: PassId, sample: Sample },
    #[error("{pass} read for {value} slot {slot} points at sample {index} of {len}")]
    ReadOutOfRange {
        pass: PassId,
        value: ValueId,
        slot: usize,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] simconfig::ConfigError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("failed to allocate resources for step {step}, {pass}")]
    Allocation {
        step: usize,
        pass: PassId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

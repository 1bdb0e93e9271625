//! Minimal per-pass texture reads for values that derive from other values.
//!
//! Every value may list the values its next state is computed from, either at
//! the latest state or some number of ticks back. A pass only needs one read per
//! distinct `(ticks back, texture)` pair among all the values it draws, so the
//! resolver collapses repeated pairs and keeps a sparse reverse index telling
//! each value where its dependencies landed.
//!
//! ```text
//!   groups:  textures [[0], [1], [2, 3]], passes [[0, 1], [2]]
//!   derives: [[1, 0], -, [3, (1, 0)], [2]]
//!
//!   samples: pass 0 -> [(0, t1), (0, t0)]
//!            pass 1 -> [(0, t2), (1, t0)]
//!   reads:   pass 0 -> value 0: [0, 1]
//!            pass 1 -> value 2: [0, 1], value 3: [0]
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ConfigurationError, InvariantViolation, SetupError};
use crate::groups::Groups;
use crate::ids::{PassId, TextureGroupId, ValueId};

/// One entry of a value's dependency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derive {
    /// The most recent completed state of a value.
    Latest(ValueId),
    /// The state of a value `ticks` before the most recent one.
    Past { ticks: usize, value: ValueId },
}

impl Derive {
    pub fn value(self) -> ValueId {
        match self {
            Derive::Latest(value) | Derive::Past { value, .. } => value,
        }
    }

    pub fn offset(self) -> usize {
        match self {
            Derive::Latest(_) => 0,
            Derive::Past { ticks, .. } => ticks,
        }
    }
}

impl From<ValueId> for Derive {
    fn from(value: ValueId) -> Self {
        Derive::Latest(value)
    }
}

impl From<(usize, ValueId)> for Derive {
    fn from((ticks, value): (usize, ValueId)) -> Self {
        Derive::Past { ticks, value }
    }
}

/// One texture read a pass performs: `offset` ticks back from the latest state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Sample {
    pub offset: usize,
    pub texture: TextureGroupId,
}

/// Sparse `(pass, value, slot) -> sample position` index.
#[derive(Debug, Clone, Default)]
pub struct ReadIndex {
    passes: Vec<BTreeMap<ValueId, Vec<usize>>>,
}

impl ReadIndex {
    pub fn get(&self, pass: PassId, value: ValueId, slot: usize) -> Option<usize> {
        self.value(pass, value)?.get(slot).copied()
    }

    /// Sample positions for every dependency of `value`, in declaration order.
    pub fn value(&self, pass: PassId, value: ValueId) -> Option<&[usize]> {
        self.passes.get(pass.0)?.get(&value).map(Vec::as_slice)
    }

    pub fn pass(&self, pass: PassId) -> impl Iterator<Item = (ValueId, &[usize])> + '_ {
        self.passes
            .get(pass.0)
            .into_iter()
            .flat_map(|reads| reads.iter().map(|(value, slots)| (*value, slots.as_slice())))
    }
}

#[derive(Debug, Clone)]
pub struct SampleMap {
    samples: Vec<Vec<Sample>>,
    reads: ReadIndex,
}

/// Resolves `derives` (indexed by value) against a packed layout.
///
/// `derives` may be shorter than the value list; missing entries have no
/// dependencies. Dependencies on values that do not exist or were dropped by
/// the packer fail here rather than at draw time.
pub fn resolve(derives: &[Vec<Derive>], groups: &Groups) -> Result<SampleMap, SetupError> {
    if derives.len() > groups.value_count() {
        return Err(ConfigurationError::ExtraDerives {
            declared: derives.len(),
            values: groups.value_count(),
        }
        .into());
    }

    for (index, value_derives) in derives.iter().enumerate() {
        for (slot, derive) in value_derives.iter().enumerate() {
            let target = derive.value();
            if target.0 >= groups.value_count() {
                return Err(ConfigurationError::UnknownDependency {
                    value: ValueId(index),
                    slot,
                    target,
                }
                .into());
            }
            if groups.is_dropped(target) && !groups.is_dropped(ValueId(index)) {
                return Err(ConfigurationError::DroppedDependency {
                    value: ValueId(index),
                    slot,
                    target,
                }
                .into());
            }
        }
    }

    let mut samples = Vec::with_capacity(groups.pass_count());
    let mut reads = ReadIndex {
        passes: Vec::with_capacity(groups.pass_count()),
    };

    for (pass, _) in groups.passes() {
        let mut set: Vec<Sample> = Vec::new();
        let mut pass_reads = BTreeMap::new();

        for value in groups.pass_values(pass) {
            let Some(value_derives) = derives.get(value.0) else {
                continue;
            };
            if value_derives.is_empty() {
                continue;
            }

            let mut slots = Vec::with_capacity(value_derives.len());
            for (slot, derive) in value_derives.iter().enumerate() {
                let texture = groups.value_to_texture(derive.value()).ok_or(
                    ConfigurationError::DroppedDependency {
                        value,
                        slot,
                        target: derive.value(),
                    },
                )?;
                let sample = Sample {
                    offset: derive.offset(),
                    texture,
                };
                let index = match set.iter().position(|existing| *existing == sample) {
                    Some(index) => index,
                    None => {
                        set.push(sample);
                        set.len() - 1
                    }
                };
                slots.push(index);
            }
            pass_reads.insert(value, slots);
        }

        tracing::trace!(pass = pass.0, samples = set.len(), "resolved pass samples");
        samples.push(set);
        reads.passes.push(pass_reads);
    }

    let map = SampleMap { samples, reads };
    map.verify()?;

    tracing::debug!(
        passes = map.samples.len(),
        samples = map.sample_count(),
        max_offset = map.max_offset(),
        "resolved texture samples"
    );

    Ok(map)
}

impl SampleMap {
    pub fn samples(&self, pass: PassId) -> &[Sample] {
        self.samples.get(pass.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn passes(&self) -> impl Iterator<Item = (PassId, &[Sample])> + '_ {
        self.samples
            .iter()
            .enumerate()
            .map(|(index, samples)| (PassId(index), samples.as_slice()))
    }

    pub fn reads(&self) -> &ReadIndex {
        &self.reads
    }

    /// Total samples across every pass.
    pub fn sample_count(&self) -> usize {
        self.samples.iter().map(Vec::len).sum()
    }

    /// Deepest history offset any pass reads.
    pub fn max_offset(&self) -> Option<usize> {
        self.samples
            .iter()
            .flatten()
            .map(|sample| sample.offset)
            .max()
    }

    pub fn verify(&self) -> Result<(), InvariantViolation> {
        for (pass, samples) in self.passes() {
            for (index, sample) in samples.iter().enumerate() {
                if samples[..index].contains(sample) {
                    return Err(InvariantViolation::DuplicateSample {
                        pass,
                        sample: *sample,
                    });
                }
            }
            for (value, slots) in self.reads.pass(pass) {
                for (slot, &index) in slots.iter().enumerate() {
                    if index >= samples.len() {
                        return Err(InvariantViolation::ReadOutOfRange {
                            pass,
                            value,
                            slot,
                            index,
                            len: samples.len(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

//! Turns a pass's samples into the concrete ring slots and resources to bind.
//!
//! A sample names a texture group and how many completed states back to read.
//! Which ring slot that is depends on where the reading pass sits in the tick:
//! textures written by an earlier pass of the same tick already hold this
//! tick's state, while textures of the current or a later pass still hold the
//! previous tick's.

use bytemuck::{Pod, Zeroable};

use crate::groups::Groups;
use crate::history::HistoryDepth;
use crate::ids::{PassId, TextureGroupId};
use crate::resources::{Extent, History};
use crate::samples::{Sample, SampleMap};
use crate::state::StepState;

/// Steps between the newest written state of `texture` and the tick a pass
/// `reader` is drawing: 0 when an earlier pass already wrote it this tick.
pub fn read_lag(groups: &Groups, reader: PassId, texture: TextureGroupId) -> usize {
    match groups.texture_to_pass(texture) {
        Some(writer) if writer < reader => 0,
        _ => 1,
    }
}

/// A sample resolved against the ring for one pass invocation.
#[derive(Debug, Clone, Copy)]
pub struct BoundSample<'h, T> {
    /// Position in the pass's sample list, as stored in the read index.
    pub index: usize,
    pub sample: Sample,
    pub slot: usize,
    pub texture: &'h T,
}

/// Resources one pass invocation needs: where to write and what to read.
#[derive(Debug)]
pub struct PassBindings<'h, T, R> {
    pub pass: PassId,
    pub output_slot: usize,
    pub output: &'h R,
    pub inputs: Vec<BoundSample<'h, T>>,
}

/// Plain-data uniform block mirrored into the step and draw shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StepUniforms {
    pub step_now: i32,
    pub pass_now: i32,
    pub steps: u32,
    pub steps_past: u32,
    pub passes: u32,
    pub dt: f32,
    pub time: f32,
    pub _padding0: f32,
    pub data_shape: [f32; 2],
    pub _padding1: [f32; 2],
}

#[derive(Debug, Clone, Copy)]
pub struct UniformBinder<'p> {
    groups: &'p Groups,
    samples: &'p SampleMap,
    depth: HistoryDepth,
}

impl<'p> UniformBinder<'p> {
    pub fn new(groups: &'p Groups, samples: &'p SampleMap, depth: HistoryDepth) -> Self {
        Self {
            groups,
            samples,
            depth,
        }
    }

    /// Ring slot a pass reads for `sample` during `tick`.
    pub fn read_slot(&self, tick: i64, pass: PassId, sample: Sample) -> usize {
        let lag = read_lag(self.groups, pass, sample.texture);
        self.depth.slot(tick - lag as i64, sample.offset)
    }

    /// Ring slot every pass of `tick` writes.
    pub fn write_slot(&self, tick: i64) -> usize {
        self.depth.slot(tick, 0)
    }

    /// Resolves the current pass of `state` against `history`.
    ///
    /// Returns `None` outside a pass invocation.
    pub fn bind_pass<'h, T, R>(
        &self,
        state: &StepState,
        history: &'h History<T, R>,
    ) -> Option<PassBindings<'h, T, R>> {
        let pass = state.pass()?;
        let tick = state.tick();
        let output_slot = self.write_slot(tick);
        let output = history.target(output_slot, pass)?;
        let inputs = self
            .samples
            .samples(pass)
            .iter()
            .enumerate()
            .map(|(index, sample)| {
                let slot = self.read_slot(tick, pass, *sample);
                history
                    .texture(slot, sample.texture)
                    .map(|texture| BoundSample {
                        index,
                        sample: *sample,
                        slot,
                        texture,
                    })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(PassBindings {
            pass,
            output_slot,
            output,
            inputs,
        })
    }

    /// A completed state `offset` ticks back, for drawing after `state`'s tick.
    pub fn latest<'h, T, R>(
        &self,
        state: &StepState,
        texture: TextureGroupId,
        offset: usize,
        history: &'h History<T, R>,
    ) -> Option<&'h T> {
        history.texture(self.depth.slot(state.tick(), offset), texture)
    }

    /// Uniform block for `state`, with `bound` of the newest steps unavailable
    /// as inputs (1 while stepping, 0 when drawing).
    pub fn uniforms(&self, state: &StepState, bound: usize, extent: Extent) -> StepUniforms {
        let steps = self.depth.get();
        StepUniforms {
            step_now: state.tick().clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            pass_now: state.pass().map_or(-1, |pass| pass.0 as i32),
            steps: steps as u32,
            steps_past: steps.saturating_sub(bound) as u32,
            passes: self.groups.pass_count() as u32,
            dt: state.dt() as f32,
            time: state.time() as f32,
            _padding0: 0.0,
            data_shape: [extent.width as f32, extent.height as f32],
            _padding1: [0.0; 2],
        }
    }
}

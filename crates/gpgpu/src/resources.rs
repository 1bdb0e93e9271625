//! Ping-pong resources shaped by a packed layout.
//!
//! One texture is created per `(step, texture group)` and one render target per
//! `(step, pass)`, the target bundling that pass's textures as its colour
//! attachments. How a texture or target is actually created is up to a
//! [`TargetFactory`]; this module only decides how many, how wide, and where
//! each lands:
//!
//! ```text
//!   History
//!     step 0 ─┬─ pass 0 ─▶ target [texture 0, texture 1]
//!             └─ pass 1 ─▶ target [texture 2]
//!     step 1 ─┬─ pass 0 ─▶ target [texture 0, texture 1]
//!             └─ pass 1 ─▶ target [texture 2]
//!     ...
//! ```

use std::convert::Infallible;

use serde::Serialize;

use crate::error::{ConfigurationError, SetupError};
use crate::groups::{Groups, TextureSpan};
use crate::history::HistoryDepth;
use crate::ids::{PassId, TextureGroupId, ValueId};
pub use simconfig::DataType;

/// Texel dimensions shared by every data texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigurationError> {
        if width == 0 || height == 0 {
            return Err(ConfigurationError::EmptyExtent { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of data items a texture stores, one per texel.
    pub fn index(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Everything a factory needs to create one data texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor<'a> {
    /// Running count of textures created so far, across all steps.
    pub number: usize,
    pub step: usize,
    pub pass: PassId,
    pub texture: TextureGroupId,
    pub values: &'a [ValueId],
    pub extent: Extent,
    pub channels: usize,
    pub data_type: DataType,
}

/// Everything a factory needs to bundle a pass's textures into one target.
#[derive(Debug, Clone, Copy)]
pub struct TargetDescriptor {
    /// Running count of targets created so far, across all steps.
    pub number: usize,
    pub step: usize,
    pub pass: PassId,
    pub textures: TextureSpan,
    pub extent: Extent,
    pub channels: usize,
    pub data_type: DataType,
}

/// Creates the GPU objects backing the history ring.
pub trait TargetFactory {
    type Texture;
    type Target;
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<Self::Texture, Self::Error>;

    /// `textures` are this pass's attachments, in texture group order.
    fn create_target(
        &mut self,
        descriptor: &TargetDescriptor,
        textures: &[&Self::Texture],
    ) -> Result<Self::Target, Self::Error>;
}

/// Totals of what was allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
    pub index: u64,
    pub passes: usize,
    pub textures: usize,
}

/// Options shared by every texture in the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFormat {
    pub extent: Extent,
    pub data_type: DataType,
    /// Narrowest attachment to allocate, whatever the values need.
    pub channels_min: usize,
}

/// The ring of `depth` steps, each holding every texture and target.
///
/// Storage is flat: step `s` owns `textures[s * texture_count..]` and
/// `targets[s * pass_count..]`.
#[derive(Debug)]
pub struct History<T, R> {
    depth: HistoryDepth,
    texture_count: usize,
    pass_count: usize,
    textures: Vec<T>,
    targets: Vec<R>,
    size: Size,
}

/// Channels allocated for every attachment of `pass`.
///
/// All colour attachments of one target share a format, so the widest texture
/// group of the pass decides.
pub fn pass_channels(groups: &Groups, pass: PassId, channels_min: usize) -> usize {
    groups
        .pass(pass)
        .into_iter()
        .flat_map(|span| span.iter())
        .map(|texture| groups.texture_channels(texture))
        .fold(channels_min, usize::max)
}

impl<T, R> History<T, R> {
    pub fn allocate<F>(
        groups: &Groups,
        depth: HistoryDepth,
        format: TextureFormat,
        factory: &mut F,
    ) -> Result<Self, SetupError>
    where
        F: TargetFactory<Texture = T, Target = R>,
    {
        let texture_count = groups.texture_count();
        let pass_count = groups.pass_count();
        let mut textures = Vec::with_capacity(depth.get() * texture_count);
        let mut targets = Vec::with_capacity(depth.get() * pass_count);

        for step in 0..depth.get() {
            for (pass, span) in groups.passes() {
                let channels = pass_channels(groups, pass, format.channels_min);
                let allocation_error = |source: F::Error| SetupError::Allocation {
                    step,
                    pass,
                    source: Box::new(source),
                };

                for texture in span.iter() {
                    let descriptor = TextureDescriptor {
                        number: textures.len(),
                        step,
                        pass,
                        texture,
                        values: groups.texture(texture).unwrap_or(&[]),
                        extent: format.extent,
                        channels,
                        data_type: format.data_type,
                    };
                    textures.push(
                        factory
                            .create_texture(&descriptor)
                            .map_err(allocation_error)?,
                    );
                }

                let base = step * texture_count;
                let attachments: Vec<&T> = span
                    .iter()
                    .map(|texture| &textures[base + texture.0])
                    .collect();
                let descriptor = TargetDescriptor {
                    number: targets.len(),
                    step,
                    pass,
                    textures: span,
                    extent: format.extent,
                    channels,
                    data_type: format.data_type,
                };
                let target = factory
                    .create_target(&descriptor, &attachments)
                    .map_err(allocation_error)?;
                targets.push(target);

                tracing::trace!(
                    step,
                    pass = pass.0,
                    textures = span.len(),
                    channels,
                    "allocated pass target"
                );
            }
        }

        let size = Size {
            width: format.extent.width,
            height: format.extent.height,
            index: format.extent.index(),
            passes: targets.len(),
            textures: textures.len(),
        };
        tracing::debug!(
            steps = depth.get(),
            textures = size.textures,
            targets = size.passes,
            width = size.width,
            height = size.height,
            "allocated history ring"
        );

        Ok(Self {
            depth,
            texture_count,
            pass_count,
            textures,
            targets,
            size,
        })
    }

    pub fn depth(&self) -> HistoryDepth {
        self.depth
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn texture(&self, step: usize, texture: TextureGroupId) -> Option<&T> {
        if step >= self.depth.get() || texture.0 >= self.texture_count {
            return None;
        }
        self.textures.get(step * self.texture_count + texture.0)
    }

    pub fn target(&self, step: usize, pass: PassId) -> Option<&R> {
        if step >= self.depth.get() || pass.0 >= self.pass_count {
            return None;
        }
        self.targets.get(step * self.pass_count + pass.0)
    }

    /// The `steps[step]` view: every target of one ring slot.
    pub fn step(&self, step: usize) -> Option<&[R]> {
        if step >= self.depth.get() {
            return None;
        }
        let start = step * self.pass_count;
        self.targets.get(start..start + self.pass_count)
    }

    pub fn steps(&self) -> impl Iterator<Item = &[R]> + '_ {
        self.targets.chunks(self.pass_count.max(1))
    }
}

/// A texture that was only described, never created on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureRecord {
    pub number: usize,
    pub step: usize,
    pub pass: PassId,
    pub texture: TextureGroupId,
    pub values: Vec<ValueId>,
    pub channels: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRecord {
    pub number: usize,
    pub step: usize,
    pub pass: PassId,
    /// `number`s of the attached textures.
    pub attachments: Vec<usize>,
    pub channels: usize,
}

/// Factory that records descriptors instead of touching a GPU; used for
/// planning, dry runs, and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordingFactory;

impl TargetFactory for RecordingFactory {
    type Texture = TextureRecord;
    type Target = TargetRecord;
    type Error = Infallible;

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<TextureRecord, Infallible> {
        Ok(TextureRecord {
            number: descriptor.number,
            step: descriptor.step,
            pass: descriptor.pass,
            texture: descriptor.texture,
            values: descriptor.values.to_vec(),
            channels: descriptor.channels,
        })
    }

    fn create_target(
        &mut self,
        descriptor: &TargetDescriptor,
        textures: &[&TextureRecord],
    ) -> Result<TargetRecord, Infallible> {
        Ok(TargetRecord {
            number: descriptor.number,
            step: descriptor.step,
            pass: descriptor.pass,
            attachments: textures.iter().map(|texture| texture.number).collect(),
            channels: descriptor.channels,
        })
    }
}

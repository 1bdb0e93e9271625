//! [`TargetFactory`] backed by a `wgpu` device.

use crate::resources::{DataType, TargetDescriptor, TargetFactory, TextureDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GpuError {
    #[error("no {data_type:?} texture format with {channels} channels")]
    UnsupportedFormat { data_type: DataType, channels: usize },
}

/// One ring texture plus the view passes sample it through.
#[derive(Debug)]
pub struct DataTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

/// Colour attachments for one pass of one step, in texture group order.
#[derive(Debug)]
pub struct PassTarget {
    pub attachments: Vec<wgpu::TextureView>,
    pub formats: Vec<wgpu::TextureFormat>,
}

impl PassTarget {
    pub fn color_attachments(&self) -> Vec<Option<wgpu::RenderPassColorAttachment<'_>>> {
        self.attachments
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect()
    }
}

pub struct WgpuFactory<'d> {
    device: &'d wgpu::Device,
}

impl<'d> WgpuFactory<'d> {
    pub fn new(device: &'d wgpu::Device) -> Self {
        Self { device }
    }
}

/// Texture format holding `channels` components of `data_type`.
///
/// There are no three-channel render formats, so three channels get four.
pub fn texture_format(data_type: DataType, channels: usize) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as F;
    let format = match (data_type, channels) {
        (DataType::Float, 1) => F::R32Float,
        (DataType::Float, 2) => F::Rg32Float,
        (DataType::Float, 3 | 4) => F::Rgba32Float,
        (DataType::HalfFloat, 1) => F::R16Float,
        (DataType::HalfFloat, 2) => F::Rg16Float,
        (DataType::HalfFloat, 3 | 4) => F::Rgba16Float,
        (DataType::UnsignedByte, 1) => F::R8Unorm,
        (DataType::UnsignedByte, 2) => F::Rg8Unorm,
        (DataType::UnsignedByte, 3 | 4) => F::Rgba8Unorm,
        _ => return None,
    };
    Some(format)
}

impl TargetFactory for WgpuFactory<'_> {
    type Texture = DataTexture;
    type Target = PassTarget;
    type Error = GpuError;

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<DataTexture, GpuError> {
        let format = texture_format(descriptor.data_type, descriptor.channels).ok_or(
            GpuError::UnsupportedFormat {
                data_type: descriptor.data_type,
                channels: descriptor.channels,
            },
        )?;
        let label = format!("gpgpu step {} {}", descriptor.step, descriptor.texture);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: descriptor.extent.width,
                height: descriptor.extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(DataTexture {
            texture,
            view,
            format,
        })
    }

    fn create_target(
        &mut self,
        _descriptor: &TargetDescriptor,
        textures: &[&DataTexture],
    ) -> Result<PassTarget, GpuError> {
        Ok(PassTarget {
            attachments: textures
                .iter()
                .map(|data| {
                    data.texture
                        .create_view(&wgpu::TextureViewDescriptor::default())
                })
                .collect(),
            formats: textures.iter().map(|data| data.format).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_formats_by_width() {
        assert_eq!(
            texture_format(DataType::Float, 4),
            Some(wgpu::TextureFormat::Rgba32Float)
        );
        assert_eq!(
            texture_format(DataType::HalfFloat, 3),
            Some(wgpu::TextureFormat::Rgba16Float)
        );
        assert_eq!(
            texture_format(DataType::UnsignedByte, 1),
            Some(wgpu::TextureFormat::R8Unorm)
        );
        assert_eq!(texture_format(DataType::Float, 5), None);
    }
}

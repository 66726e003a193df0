use log::debug;

use crate::context::{RenderDevice, TextureDescriptor};

/// The multisampled colour buffer and the depth buffer of the frame.
///
/// Both follow the surface size; the previous pair is destroyed before the
/// new one is created.
pub struct RenderTargets<D: RenderDevice> {
    color: Option<D::Texture>,
    depth: D::Texture,
    size: (u32, u32),
    sample_count: u32,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
}

impl<D: RenderDevice> RenderTargets<D> {
    pub fn new(
        device: &D,
        size: (u32, u32),
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let size = (size.0.max(1), size.1.max(1));
        let (color, depth) =
            Self::create(device, size, color_format, depth_format, sample_count);
        Self {
            color,
            depth,
            size,
            sample_count,
            color_format,
            depth_format,
        }
    }

    fn create(
        device: &D,
        (width, height): (u32, u32),
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> (Option<D::Texture>, D::Texture) {
        let color = (sample_count > 1).then(|| {
            device.create_texture(&TextureDescriptor {
                label: "multisampled color target",
                width,
                height,
                layers: 1,
                dimension: wgpu::TextureViewDimension::D2,
                format: color_format,
                sample_count,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                data: None,
            })
        });
        let depth = device.create_texture(&TextureDescriptor {
            label: "depth target",
            width,
            height,
            layers: 1,
            dimension: wgpu::TextureViewDimension::D2,
            format: depth_format,
            sample_count,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            data: None,
        });
        (color, depth)
    }

    /// Recreates both targets when `size` differs from the current one.
    /// Returns whether anything was recreated.
    pub fn ensure_size(&mut self, device: &D, size: (u32, u32)) -> bool {
        let size = (size.0.max(1), size.1.max(1));
        if size == self.size {
            return false;
        }
        debug!(
            "render targets {}x{} -> {}x{}",
            self.size.0, self.size.1, size.0, size.1
        );
        self.destroy(device);
        let (color, depth) = Self::create(
            device,
            size,
            self.color_format,
            self.depth_format,
            self.sample_count,
        );
        self.color = color;
        self.depth = depth;
        self.size = size;
        true
    }

    pub fn color(&self) -> Option<&D::Texture> {
        self.color.as_ref()
    }

    pub fn depth(&self) -> &D::Texture {
        &self.depth
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn aspect(&self) -> f32 {
        self.size.0 as f32 / self.size.1 as f32
    }

    pub fn destroy(&self, device: &D) {
        if let Some(color) = &self.color {
            device.destroy_texture(color);
        }
        device.destroy_texture(&self.depth);
    }
}

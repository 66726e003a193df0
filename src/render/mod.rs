//! Frame orchestration.
//!
//! [`Renderer`] turns a [`Scene`](crate::data_structures::scene_graph::Scene)
//! into one submitted frame: the skybox pass is recorded first, the mesh pass
//! after it, both into a single render pass over [`RenderTargets`].

mod mesh_pass;
mod renderer;
mod skybox_pass;
mod targets;

pub use mesh_pass::{MeshPass, MeshPassResources, validate_data_offset};
pub use renderer::Renderer;
pub use skybox_pass::{SkyboxPass, SkyboxResources};
pub use targets::RenderTargets;

/// Renderer settings fixed at construction, apart from the clear colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    pub sample_count: u32,
    pub clear_color: wgpu::Color,
    pub depth_format: wgpu::TextureFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sample_count: 4,
            clear_color: wgpu::Color::BLACK,
            depth_format: wgpu::TextureFormat::Depth32Float,
        }
    }
}

impl RendererConfig {
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count.max(1);
        self
    }

    pub fn with_clear_color(mut self, clear_color: wgpu::Color) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_depth_format(mut self, depth_format: wgpu::TextureFormat) -> Self {
        self.depth_format = depth_format;
        self
    }
}

/// What one call to [`Renderer::render`] drew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Visible drawables collected by the traversal.
    pub drawables: usize,
    pub lights: usize,
    pub draw_calls: usize,
    pub skybox_drawn: bool,
}

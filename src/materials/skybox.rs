//! Cube-mapped background.
//!
//! The skybox is drawn by its own pass as a single full-screen triangle; the
//! shader turns clip coordinates back into view directions with the inverse
//! of the rotation-only view-projection matrix, which the pass writes where
//! mesh materials receive their MVP matrix.

use std::sync::Arc;

use crate::data_structures::{geometry::VertexLayout, texture::Texture};

use super::{
    MVP_SIZE, MaterialContract, MaterialId, RenderContext, TextureFallback, TextureSlot,
    UniformWriter, write_region,
};

const SHADER: &str = include_str!("shaders/skybox.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyboxUniform {
    /// intensity, unused, unused, unused.
    params: [f32; 4],
}

#[derive(Debug)]
pub struct SkyboxMaterial {
    id: MaterialId,
    cube_map: Option<Arc<Texture>>,
    binding_revision: u64,
    pub intensity: f32,
}

impl SkyboxMaterial {
    pub fn new(cube_map: Arc<Texture>) -> Self {
        Self {
            id: MaterialId::next(),
            cube_map: Some(cube_map),
            binding_revision: 0,
            intensity: 1.0,
        }
    }

    /// Identity used by the skybox pass; a new material means new GPU resources.
    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn cube_map(&self) -> Option<&Arc<Texture>> {
        self.cube_map.as_ref()
    }

    /// Swaps the cube map and bumps the binding revision.
    pub fn set_cube_map(&mut self, cube_map: Option<Arc<Texture>>) {
        self.cube_map = cube_map;
        self.binding_revision += 1;
    }

    /// Incremented whenever the bound textures change.
    pub fn binding_revision(&self) -> u64 {
        self.binding_revision
    }
}

impl Clone for SkyboxMaterial {
    /// The copy is a new material: it gets a fresh id so the skybox pass
    /// never mistakes it for its source.
    fn clone(&self) -> Self {
        Self {
            id: MaterialId::next(),
            cube_map: self.cube_map.clone(),
            binding_revision: self.binding_revision,
            intensity: self.intensity,
        }
    }
}

impl MaterialContract for SkyboxMaterial {
    fn kind(&self) -> &str {
        "skybox"
    }

    fn vertex_source(&self) -> &str {
        SHADER
    }

    fn fragment_source(&self) -> &str {
        SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::empty()
    }

    fn uniform_buffer_size(&self) -> u64 {
        MVP_SIZE + size_of::<SkyboxUniform>() as u64
    }

    fn texture_slots(&self) -> Vec<TextureSlot> {
        vec![TextureSlot::new(
            self.cube_map.clone(),
            TextureFallback::BlackCube,
        )]
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl SkyboxMaterial {
    /// Writes the material parameters at `offset`; the skybox pass has no drawable to pass along.
    pub(crate) fn write_params(&self, buffer: &mut [u8], offset: usize) {
        write_region(
            buffer,
            offset,
            &SkyboxUniform {
                params: [self.intensity, 0.0, 0.0, 0.0],
            },
        );
    }
}

impl UniformWriter for SkyboxMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, _ctx: &RenderContext<'_>) {
        self.write_params(buffer, offset);
    }
}

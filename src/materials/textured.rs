use std::sync::Arc;

use crate::data_structures::{
    geometry::{VertexAttribute, VertexLayout},
    texture::Texture,
};

use super::{
    MVP_SIZE, MaterialContract, RenderContext, TextureFallback, TextureSlot, UniformWriter,
    write_region,
};

const SHADER: &str = include_str!("shaders/texture.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct TextureUniform {
    tint: [f32; 4],
    /// Scale in `xy`, offset in `zw`.
    uv_transform: [f32; 4],
}

/// Unlit texture lookup, optionally tinted and with a uv scale/offset.
#[derive(Clone, Debug)]
pub struct TextureMaterial {
    pub map: Option<Arc<Texture>>,
    pub tint: [f32; 4],
    pub uv_scale: [f32; 2],
    pub uv_offset: [f32; 2],
}

impl TextureMaterial {
    pub fn new(map: Arc<Texture>) -> Self {
        Self {
            map: Some(map),
            tint: [1.0; 4],
            uv_scale: [1.0, 1.0],
            uv_offset: [0.0, 0.0],
        }
    }

    /// A material with an empty map slot; samples white until a map is set.
    pub fn untextured() -> Self {
        Self {
            map: None,
            tint: [1.0; 4],
            uv_scale: [1.0, 1.0],
            uv_offset: [0.0, 0.0],
        }
    }
}

impl MaterialContract for TextureMaterial {
    fn kind(&self) -> &str {
        "texture"
    }

    fn vertex_source(&self) -> &str {
        SHADER
    }

    fn fragment_source(&self) -> &str {
        SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::new(&[VertexAttribute::Position, VertexAttribute::Uv])
    }

    fn uniform_buffer_size(&self) -> u64 {
        MVP_SIZE + size_of::<TextureUniform>() as u64
    }

    fn texture_slots(&self) -> Vec<TextureSlot> {
        vec![TextureSlot::new(self.map.clone(), TextureFallback::White)]
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for TextureMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, _ctx: &RenderContext<'_>) {
        let uniform = TextureUniform {
            tint: self.tint,
            uv_transform: [
                self.uv_scale[0],
                self.uv_scale[1],
                self.uv_offset[0],
                self.uv_offset[1],
            ],
        };
        write_region(buffer, offset, &uniform);
    }
}

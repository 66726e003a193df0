//! Parallax occlusion mapping over a diffuse, normal and height map.

use std::sync::Arc;

use crate::data_structures::{
    geometry::{VertexAttribute, VertexLayout},
    texture::Texture,
};

use super::{
    MVP_SIZE, MaterialContract, RenderContext, TextureFallback, TextureSlot, UniformWriter,
    light_vectors, write_region,
};

const SHADER: &str = include_str!("shaders/parallax.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ParallaxUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    light_position: [f32; 4],
    light_color: [f32; 4],
    camera_position: [f32; 4],
    /// height scale, min layers, max layers, unused.
    params: [f32; 4],
}

const _: () = assert!(size_of::<ParallaxUniform>() == 192);

#[derive(Clone, Debug)]
pub struct ParallaxMaterial {
    pub diffuse_map: Option<Arc<Texture>>,
    pub normal_map: Option<Arc<Texture>>,
    pub height_map: Option<Arc<Texture>>,
    pub height_scale: f32,
    pub min_layers: f32,
    pub max_layers: f32,
}

impl ParallaxMaterial {
    pub fn new(
        diffuse_map: Arc<Texture>,
        normal_map: Arc<Texture>,
        height_map: Arc<Texture>,
    ) -> Self {
        Self {
            diffuse_map: Some(diffuse_map),
            normal_map: Some(normal_map),
            height_map: Some(height_map),
            ..Self::default()
        }
    }

    pub fn with_height_scale(mut self, height_scale: f32) -> Self {
        self.height_scale = height_scale;
        self
    }
}

impl Default for ParallaxMaterial {
    fn default() -> Self {
        Self {
            diffuse_map: None,
            normal_map: None,
            height_map: None,
            height_scale: 0.05,
            min_layers: 8.0,
            max_layers: 32.0,
        }
    }
}

impl MaterialContract for ParallaxMaterial {
    fn kind(&self) -> &str {
        "parallax"
    }

    fn vertex_source(&self) -> &str {
        SHADER
    }

    fn fragment_source(&self) -> &str {
        SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::new(&[
            VertexAttribute::Position,
            VertexAttribute::Normal,
            VertexAttribute::Uv,
            VertexAttribute::Tangent,
            VertexAttribute::Bitangent,
        ])
    }

    fn uniform_buffer_size(&self) -> u64 {
        MVP_SIZE + size_of::<ParallaxUniform>() as u64
    }

    fn texture_slots(&self) -> Vec<TextureSlot> {
        vec![
            TextureSlot::new(self.diffuse_map.clone(), TextureFallback::White),
            TextureSlot::new(self.normal_map.clone(), TextureFallback::Normal),
            TextureSlot::new(self.height_map.clone(), TextureFallback::Black),
        ]
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for ParallaxMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, ctx: &RenderContext<'_>) {
        let (light_position, light_color) = light_vectors(ctx.first_light());
        let uniform = ParallaxUniform {
            model: ctx.world_matrix.into(),
            normal: ctx.normal_matrix(),
            light_position,
            light_color,
            camera_position: ctx.camera_position(),
            params: [self.height_scale, self.min_layers, self.max_layers, 0.0],
        };
        write_region(buffer, offset, &uniform);
    }
}

//! Per-pixel Blinn-Phong shading with a single light.

use crate::data_structures::geometry::{VertexAttribute, VertexLayout};

use super::{
    MVP_SIZE, MaterialContract, RenderContext, UniformWriter, light_vectors, rgba, write_region,
};

const SHADER: &str = include_str!("shaders/blinn_phong.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlinnPhongUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    diffuse: [f32; 4],
    /// rgb specular colour, shininess in `w`.
    specular: [f32; 4],
    /// xyz position or direction, light type in `w`.
    light_position: [f32; 4],
    /// rgb colour, intensity in `w`.
    light_color: [f32; 4],
    ambient: [f32; 4],
    camera_position: [f32; 4],
}

const _: () = assert!(size_of::<BlinnPhongUniform>() == 224);

/// Lit by the first non-ambient light in the scene plus the first ambient light.
#[derive(Clone, Debug, PartialEq)]
pub struct BlinnPhongMaterial {
    pub diffuse: [f32; 4],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl BlinnPhongMaterial {
    pub fn new(diffuse: [f32; 4]) -> Self {
        Self {
            diffuse,
            specular: [1.0, 1.0, 1.0],
            shininess: 32.0,
        }
    }

    pub fn with_specular(mut self, specular: [f32; 3], shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }
}

impl Default for BlinnPhongMaterial {
    fn default() -> Self {
        Self::new([0.8, 0.8, 0.8, 1.0])
    }
}

impl MaterialContract for BlinnPhongMaterial {
    fn kind(&self) -> &str {
        "blinn-phong"
    }

    fn vertex_source(&self) -> &str {
        SHADER
    }

    fn fragment_source(&self) -> &str {
        SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::new(&[VertexAttribute::Position, VertexAttribute::Normal])
    }

    fn uniform_buffer_size(&self) -> u64 {
        MVP_SIZE + size_of::<BlinnPhongUniform>() as u64
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for BlinnPhongMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, ctx: &RenderContext<'_>) {
        let (light_position, light_color) = light_vectors(ctx.first_light());
        let uniform = BlinnPhongUniform {
            model: ctx.world_matrix.into(),
            normal: ctx.normal_matrix(),
            diffuse: self.diffuse,
            specular: rgba(self.specular, self.shininess),
            light_position,
            light_color,
            ambient: ctx.ambient(),
            camera_position: ctx.camera_position(),
        };
        write_region(buffer, offset, &uniform);
    }
}

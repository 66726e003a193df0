//! Metallic-roughness physically based shading.
//!
//! The material region is 448 bytes: model and normal matrices, eight
//! parameter vectors, then [`MAX_PBR_LIGHTS`] light records of 48 bytes each.
//! Non-ambient lights fill the records in scene order; the first ambient
//! light becomes the ambient term.

use std::sync::Arc;

use cgmath::EuclideanSpace;

use crate::data_structures::{
    geometry::{VertexAttribute, VertexLayout},
    light::{LightInfo, LightKind},
    texture::Texture,
};

use super::{
    MVP_SIZE, MaterialContract, RenderContext, TextureFallback, TextureSlot, UniformWriter, rgba,
    write_region,
};

const SHADER: &str = include_str!("shaders/pbr.wgsl");

pub const MAX_PBR_LIGHTS: usize = 4;

/// One light as the PBR shader reads it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRecord {
    /// Position for point lights, direction for directional ones; type in `w`.
    pub position: [f32; 4],
    /// rgb colour, intensity in `w`.
    pub color: [f32; 4],
    /// range, decay, unused, unused.
    pub params: [f32; 4],
}

impl From<&LightInfo> for LightRecord {
    fn from(info: &LightInfo) -> Self {
        let (v, params) = match info.light.kind {
            LightKind::Point { range, decay } => (info.position.to_vec(), [range, decay, 0.0, 0.0]),
            LightKind::Directional => (info.direction, [0.0; 4]),
            LightKind::Ambient => (info.position.to_vec(), [0.0; 4]),
        };
        let c = info.light.color;
        Self {
            position: [v.x, v.y, v.z, info.light.kind.type_id()],
            color: [c.x, c.y, c.z, info.light.intensity],
            params,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct PbrUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    base_color: [f32; 4],
    /// metallic, roughness, ao, normal scale.
    params: [f32; 4],
    /// rgb emissive, intensity in `w`.
    emissive: [f32; 4],
    /// env intensity, has env map, unused, unused.
    env: [f32; 4],
    camera_position: [f32; 4],
    ambient: [f32; 4],
    /// light count, has emissive map, has ao map, unused.
    counts: [f32; 4],
    /// has albedo, normal, roughness, metalness map.
    map_flags: [f32; 4],
    lights: [LightRecord; MAX_PBR_LIGHTS],
}

const _: () = assert!(size_of::<LightRecord>() == 48);
const _: () = assert!(size_of::<PbrUniform>() == 448);

fn flag(texture: &Option<Arc<Texture>>) -> f32 {
    if texture.is_some() { 1.0 } else { 0.0 }
}

#[derive(Clone, Debug)]
pub struct PbrMaterial {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
    pub normal_scale: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub env_intensity: f32,
    pub albedo_map: Option<Arc<Texture>>,
    pub normal_map: Option<Arc<Texture>>,
    pub roughness_map: Option<Arc<Texture>>,
    pub metalness_map: Option<Arc<Texture>>,
    pub ao_map: Option<Arc<Texture>>,
    pub emissive_map: Option<Arc<Texture>>,
    /// Cube map for image-based lighting.
    pub env_map: Option<Arc<Texture>>,
}

impl PbrMaterial {
    pub fn new(base_color: [f32; 4], metallic: f32, roughness: f32) -> Self {
        Self {
            base_color,
            metallic,
            roughness,
            ..Self::default()
        }
    }
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            base_color: [1.0; 4],
            metallic: 0.0,
            roughness: 0.5,
            ao: 1.0,
            normal_scale: 1.0,
            emissive: [0.0; 3],
            emissive_intensity: 1.0,
            env_intensity: 1.0,
            albedo_map: None,
            normal_map: None,
            roughness_map: None,
            metalness_map: None,
            ao_map: None,
            emissive_map: None,
            env_map: None,
        }
    }
}

impl MaterialContract for PbrMaterial {
    fn kind(&self) -> &str {
        "pbr"
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
        MVP_SIZE + size_of::<PbrUniform>() as u64
    }

    fn texture_slots(&self) -> Vec<TextureSlot> {
        vec![
            TextureSlot::new(self.albedo_map.clone(), TextureFallback::White),
            TextureSlot::new(self.normal_map.clone(), TextureFallback::Normal),
            TextureSlot::new(self.roughness_map.clone(), TextureFallback::White),
            TextureSlot::new(self.metalness_map.clone(), TextureFallback::White),
            TextureSlot::new(self.ao_map.clone(), TextureFallback::White),
            TextureSlot::new(self.emissive_map.clone(), TextureFallback::Black),
        ]
    }

    fn environment(&self) -> Option<TextureSlot> {
        Some(TextureSlot::new(
            self.env_map.clone(),
            TextureFallback::BlackCube,
        ))
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for PbrMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, ctx: &RenderContext<'_>) {
        let mut lights = [LightRecord::default(); MAX_PBR_LIGHTS];
        let mut light_count = 0;
        for (record, info) in lights
            .iter_mut()
            .zip(ctx.lights.iter().filter(|l| !l.is_ambient()))
        {
            *record = info.into();
            light_count += 1;
        }

        let uniform = PbrUniform {
            model: ctx.world_matrix.into(),
            normal: ctx.normal_matrix(),
            base_color: self.base_color,
            params: [self.metallic, self.roughness, self.ao, self.normal_scale],
            emissive: rgba(self.emissive, self.emissive_intensity),
            env: [self.env_intensity, flag(&self.env_map), 0.0, 0.0],
            camera_position: ctx.camera_position(),
            ambient: ctx.ambient(),
            counts: [
                light_count as f32,
                flag(&self.emissive_map),
                flag(&self.ao_map),
                0.0,
            ],
            map_flags: [
                flag(&self.albedo_map),
                flag(&self.normal_map),
                flag(&self.roughness_map),
                flag(&self.metalness_map),
            ],
            lights,
        };
        write_region(buffer, offset, &uniform);
    }
}

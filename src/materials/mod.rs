//! Materials and the binary contract between materials and the renderer.
//!
//! Every shading technique implements [`MaterialContract`]: it names its
//! shaders, its vertex layout, its uniform buffer size and topology, and may
//! write its own uniform bytes. The renderer owns bytes `[0, 64)` of every
//! uniform buffer (the model-view-projection matrix); a material only ever
//! writes into `[data_offset, uniform_buffer_size)`.
//!
//! [`Material`] is the closed set of kinds the engine ships with. Custom
//! techniques go through [`ShaderMaterial`].

mod basic;
mod blinn_phong;
mod parallax;
mod pbr;
mod shader;
mod skybox;
mod textured;

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use bytemuck::Pod;
use cgmath::{Matrix, Matrix4, SquareMatrix};

pub use basic::{BasicMaterial, LineColorMaterial, LineMaterial, VertexColorMaterial};
pub use blinn_phong::BlinnPhongMaterial;
pub use parallax::ParallaxMaterial;
pub use pbr::{LightRecord, MAX_PBR_LIGHTS, PbrMaterial};
pub use shader::ShaderMaterial;
pub use skybox::SkyboxMaterial;
pub use textured::TextureMaterial;

use crate::data_structures::{
    camera::CameraView,
    geometry::VertexLayout,
    light::{LightInfo, LightKind},
    mesh::Mesh,
    scene_graph::{NodeHandle, Scene},
    texture::{Texture, TextureKind},
};

/// Bytes reserved at the start of every uniform buffer for the MVP matrix.
pub const MVP_SIZE: u64 = 64;

/// Uniform buffer sizes must be a multiple of this (WGSL struct alignment).
pub const UNIFORM_SIZE_ALIGNMENT: u64 = 16;

/// Ambient term used when the scene has no ambient light.
pub(crate) const DEFAULT_AMBIENT: [f32; 4] = [1.0, 1.0, 1.0, 0.1];

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a material instance. Every instance, clones included, gets its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(u64);

impl MaterialId {
    pub(crate) fn next() -> Self {
        Self(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Dummy texture bound in place of an unset optional slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFallback {
    White,
    /// Flat tangent-space normal (0.5, 0.5, 1.0).
    Normal,
    Black,
    BlackCube,
}

impl TextureFallback {
    pub fn kind(self) -> TextureKind {
        match self {
            TextureFallback::BlackCube => TextureKind::Cube,
            _ => TextureKind::D2,
        }
    }
}

/// One sampled texture binding of a material.
#[derive(Clone, Debug)]
pub struct TextureSlot {
    pub texture: Option<Arc<Texture>>,
    pub fallback: TextureFallback,
}

impl TextureSlot {
    pub fn new(texture: Option<Arc<Texture>>, fallback: TextureFallback) -> Self {
        Self { texture, fallback }
    }

    pub fn kind(&self) -> TextureKind {
        self.fallback.kind()
    }
}

/// Read-only view of the frame handed to uniform writers.
pub struct RenderContext<'a> {
    pub camera: &'a CameraView,
    pub scene: &'a Scene,
    pub node: NodeHandle,
    pub mesh: &'a Mesh,
    pub world_matrix: Matrix4<f32>,
    pub lights: &'a [LightInfo],
}

impl RenderContext<'_> {
    pub fn first_light(&self) -> Option<&LightInfo> {
        self.lights.iter().find(|l| !l.is_ambient())
    }

    /// Colour and intensity of the first ambient light, or a dim white default.
    pub fn ambient(&self) -> [f32; 4] {
        self.lights
            .iter()
            .find(|l| l.is_ambient())
            .map(|l| {
                let c = l.light.color;
                [c.x, c.y, c.z, l.light.intensity]
            })
            .unwrap_or(DEFAULT_AMBIENT)
    }

    pub fn normal_matrix(&self) -> [[f32; 4]; 4] {
        self.world_matrix
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(Matrix4::identity)
            .into()
    }

    pub fn camera_position(&self) -> [f32; 4] {
        let p = self.camera.position;
        [p.x, p.y, p.z, 1.0]
    }
}

/// Writes a material's own uniform bytes.
///
/// `buffer` spans the whole uniform buffer; implementations must only touch
/// `buffer[offset..]`.
pub trait UniformWriter: Send + Sync {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, ctx: &RenderContext<'_>);
}

impl<F> UniformWriter for F
where
    F: Fn(&mut [u8], usize, &RenderContext<'_>) + Send + Sync,
{
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, ctx: &RenderContext<'_>) {
        self(buffer, offset, ctx)
    }
}

/// What the renderer needs to know about a shading technique.
pub trait MaterialContract {
    /// Cache key component; materials of one kind share a pipeline per topology.
    fn kind(&self) -> &str;

    fn vertex_source(&self) -> &str;

    fn fragment_source(&self) -> &str;

    fn vertex_layout(&self) -> VertexLayout;

    fn uniform_buffer_size(&self) -> u64;

    fn topology(&self) -> wgpu::PrimitiveTopology {
        wgpu::PrimitiveTopology::TriangleList
    }

    /// First byte this material writes. Everything below it belongs to the renderer.
    fn data_offset(&self) -> u64 {
        MVP_SIZE
    }

    /// Sampled textures bound at group 0, bindings 2.., behind one sampler at binding 1.
    fn texture_slots(&self) -> Vec<TextureSlot> {
        Vec::new()
    }

    /// Environment cube map bound at group 1 for image-based lighting.
    fn environment(&self) -> Option<TextureSlot> {
        None
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        None
    }
}

/// The material kinds a [`Mesh`] can carry.
#[derive(Clone, Debug)]
pub enum Material {
    Basic(BasicMaterial),
    VertexColor(VertexColorMaterial),
    Line(LineMaterial),
    LineColor(LineColorMaterial),
    Texture(TextureMaterial),
    BlinnPhong(BlinnPhongMaterial),
    Pbr(PbrMaterial),
    Parallax(ParallaxMaterial),
    Skybox(SkyboxMaterial),
    Shader(ShaderMaterial),
}

impl Material {
    pub fn contract(&self) -> &dyn MaterialContract {
        match self {
            Material::Basic(m) => m,
            Material::VertexColor(m) => m,
            Material::Line(m) => m,
            Material::LineColor(m) => m,
            Material::Texture(m) => m,
            Material::BlinnPhong(m) => m,
            Material::Pbr(m) => m,
            Material::Parallax(m) => m,
            Material::Skybox(m) => m,
            Material::Shader(m) => m,
        }
    }

    pub fn is_skybox(&self) -> bool {
        matches!(self, Material::Skybox(_))
    }
}

macro_rules! impl_from_material {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for Material {
            fn from(m: $ty) -> Self {
                Material::$variant(m)
            }
        })*
    };
}

impl_from_material!(
    Basic(BasicMaterial),
    VertexColor(VertexColorMaterial),
    Line(LineMaterial),
    LineColor(LineColorMaterial),
    Texture(TextureMaterial),
    BlinnPhong(BlinnPhongMaterial),
    Pbr(PbrMaterial),
    Parallax(ParallaxMaterial),
    Skybox(SkyboxMaterial),
    Shader(ShaderMaterial),
);

/// Cache key of a material: `"<kind>_<topology>"`.
pub fn pipeline_key(material: &dyn MaterialContract) -> String {
    format!("{}_{}", material.kind(), topology_name(material.topology()))
}

pub fn topology_name(topology: wgpu::PrimitiveTopology) -> &'static str {
    match topology {
        wgpu::PrimitiveTopology::PointList => "point-list",
        wgpu::PrimitiveTopology::LineList => "line-list",
        wgpu::PrimitiveTopology::LineStrip => "line-strip",
        wgpu::PrimitiveTopology::TriangleList => "triangle-list",
        wgpu::PrimitiveTopology::TriangleStrip => "triangle-strip",
    }
}

/// Copies a `Pod` value into `buffer` at `offset`, clipped to the buffer's end.
pub(crate) fn write_region<T: Pod>(buffer: &mut [u8], offset: usize, value: &T) {
    let bytes = bytemuck::bytes_of(value);
    let end = (offset + bytes.len()).min(buffer.len());
    if offset < end {
        buffer[offset..end].copy_from_slice(&bytes[..end - offset]);
    }
}

pub(crate) fn rgba(color: [f32; 3], w: f32) -> [f32; 4] {
    [color[0], color[1], color[2], w]
}

/// Position (or direction for directional lights) and colour of a light, in
/// the `[xyz, type]` / `[rgb, intensity]` form the lit shaders read.
pub(crate) fn light_vectors(light: Option<&LightInfo>) -> ([f32; 4], [f32; 4]) {
    match light {
        None => ([0.0, 1.0, 0.0, 0.0], [0.0; 4]),
        Some(info) => {
            let v = match info.light.kind {
                LightKind::Directional => info.direction,
                _ => cgmath::EuclideanSpace::to_vec(info.position),
            };
            let c = info.light.color;
            (
                [v.x, v.y, v.z, info.light.kind.type_id()],
                [c.x, c.y, c.z, info.light.intensity],
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};

    use crate::data_structures::{
        camera::{CameraView, PerspectiveCamera},
        geometry::Geometry,
        light::{Light, LightInfo},
        mesh::Mesh,
        scene_graph::Scene,
    };

    use super::{Material, RenderContext};

    pub struct Fixture {
        pub scene: Scene,
        pub camera: CameraView,
        pub mesh: Mesh,
        pub lights: Vec<LightInfo>,
    }

    impl Fixture {
        pub fn new(material: impl Into<Material>) -> Self {
            let camera = CameraView::new(
                &PerspectiveCamera::default(),
                Matrix4::from_translation(Vector3::new(0.0, 0.0, 5.0)),
                1.0,
            );
            Self {
                scene: Scene::new(),
                camera,
                mesh: Mesh::new(Geometry::from_positions(vec![0.0; 9]), material),
                lights: Vec::new(),
            }
        }

        pub fn with_light(mut self, light: Light, position: Point3<f32>) -> Self {
            self.lights.push(LightInfo::new(light, position));
            self
        }

        pub fn context(&self) -> RenderContext<'_> {
            RenderContext {
                camera: &self.camera,
                scene: &self.scene,
                node: self.scene.root(),
                mesh: &self.mesh,
                world_matrix: Matrix4::identity(),
                lights: &self.lights,
            }
        }

        /// Runs the mesh material's writer on a buffer pre-filled with `0xAB`.
        pub fn write(&self) -> Vec<u8> {
            let contract = self.mesh.material().contract();
            let mut buffer = vec![0xAB; contract.uniform_buffer_size() as usize];
            if let Some(writer) = contract.uniform_writer() {
                writer.write_uniform_data(
                    &mut buffer,
                    contract.data_offset() as usize,
                    &self.context(),
                );
            }
            buffer
        }
    }

    pub fn f32_at(buffer: &[u8], offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&buffer[offset..offset + 4])
    }
}

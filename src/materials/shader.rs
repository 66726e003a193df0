//! User-supplied shaders.

use std::{fmt, sync::Arc};

use crate::{
    data_structures::geometry::VertexLayout,
    error::{RenderError, Result},
};

use super::{
    MVP_SIZE, MaterialContract, RenderContext, TextureSlot, UNIFORM_SIZE_ALIGNMENT, UniformWriter,
};

/// A material built from caller-provided WGSL.
///
/// Materials sharing a `name` share a pipeline per topology, so the name must
/// identify the shader sources and vertex layout.
#[derive(Clone)]
pub struct ShaderMaterial {
    kind: String,
    vertex_source: Arc<str>,
    fragment_source: Arc<str>,
    layout: VertexLayout,
    uniform_size: u64,
    data_offset: u64,
    topology: wgpu::PrimitiveTopology,
    textures: Vec<TextureSlot>,
    writer: Option<Arc<dyn UniformWriter>>,
}

impl ShaderMaterial {
    /// Fails when `uniform_size` cannot hold the 64-byte MVP matrix or is not
    /// a multiple of [`UNIFORM_SIZE_ALIGNMENT`].
    pub fn new(
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
        layout: VertexLayout,
        uniform_size: u64,
    ) -> Result<Self> {
        if uniform_size < MVP_SIZE {
            return Err(RenderError::InvalidUniformSize {
                kind: format!("shader:{name}"),
                size: uniform_size as usize,
                minimum: MVP_SIZE as usize,
            });
        }
        if uniform_size % UNIFORM_SIZE_ALIGNMENT != 0 {
            return Err(RenderError::MisalignedUniformSize {
                kind: format!("shader:{name}"),
                size: uniform_size as usize,
                alignment: UNIFORM_SIZE_ALIGNMENT as usize,
            });
        }
        Ok(Self {
            kind: format!("shader:{name}"),
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            layout,
            uniform_size,
            data_offset: MVP_SIZE,
            topology: wgpu::PrimitiveTopology::TriangleList,
            textures: Vec::new(),
            writer: None,
        })
    }

    /// Checked by the renderer before every write: must lie in `[64, uniform_size]`
    /// and be a multiple of 4.
    pub fn with_data_offset(mut self, data_offset: u64) -> Self {
        self.data_offset = data_offset;
        self
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_textures(mut self, textures: Vec<TextureSlot>) -> Self {
        self.textures = textures;
        self
    }

    /// Installs the callback that fills `buffer[offset..]` each frame.
    pub fn with_writer<F>(mut self, writer: F) -> Self
    where
        F: Fn(&mut [u8], usize, &RenderContext<'_>) + Send + Sync + 'static,
    {
        let writer: Arc<dyn UniformWriter> = Arc::new(writer);
        self.writer = Some(writer);
        self
    }
}

impl fmt::Debug for ShaderMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderMaterial")
            .field("kind", &self.kind)
            .field("uniform_size", &self.uniform_size)
            .field("data_offset", &self.data_offset)
            .field("topology", &self.topology)
            .field("has_writer", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}

impl MaterialContract for ShaderMaterial {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    fn vertex_layout(&self) -> VertexLayout {
        self.layout.clone()
    }

    fn uniform_buffer_size(&self) -> u64 {
        self.uniform_size
    }

    fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    fn data_offset(&self) -> u64 {
        self.data_offset
    }

    fn texture_slots(&self) -> Vec<TextureSlot> {
        self.textures.clone()
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        self.writer.as_deref()
    }
}

//! Unlit materials: flat colour, per-vertex colour and their line variants.

use crate::data_structures::geometry::{VertexAttribute, VertexLayout};

use super::{MVP_SIZE, MaterialContract, RenderContext, UniformWriter, write_region};

const BASIC_SHADER: &str = include_str!("shaders/basic.wgsl");
const VERTEX_COLOR_SHADER: &str = include_str!("shaders/vertex_color.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ColorUniform {
    color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct OpacityUniform {
    opacity: f32,
    _padding: [f32; 3],
}

const COLOR_UNIFORM_SIZE: u64 = MVP_SIZE + size_of::<ColorUniform>() as u64;
const OPACITY_UNIFORM_SIZE: u64 = MVP_SIZE + size_of::<OpacityUniform>() as u64;

/// Single colour, no lighting.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicMaterial {
    pub color: [f32; 4],
    topology: wgpu::PrimitiveTopology,
}

impl BasicMaterial {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }
}

impl Default for BasicMaterial {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0])
    }
}

impl MaterialContract for BasicMaterial {
    fn kind(&self) -> &str {
        "basic"
    }

    fn vertex_source(&self) -> &str {
        BASIC_SHADER
    }

    fn fragment_source(&self) -> &str {
        BASIC_SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::new(&[VertexAttribute::Position])
    }

    fn uniform_buffer_size(&self) -> u64 {
        COLOR_UNIFORM_SIZE
    }

    fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for BasicMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, _ctx: &RenderContext<'_>) {
        write_region(buffer, offset, &ColorUniform { color: self.color });
    }
}

/// Colours interpolated from the geometry's colour stream.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexColorMaterial {
    pub opacity: f32,
    topology: wgpu::PrimitiveTopology,
}

impl VertexColorMaterial {
    pub fn new() -> Self {
        Self {
            opacity: 1.0,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }
}

impl Default for VertexColorMaterial {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialContract for VertexColorMaterial {
    fn kind(&self) -> &str {
        "vertex-color"
    }

    fn vertex_source(&self) -> &str {
        VERTEX_COLOR_SHADER
    }

    fn fragment_source(&self) -> &str {
        VERTEX_COLOR_SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::new(&[VertexAttribute::Position, VertexAttribute::Color])
    }

    fn uniform_buffer_size(&self) -> u64 {
        OPACITY_UNIFORM_SIZE
    }

    fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for VertexColorMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, _ctx: &RenderContext<'_>) {
        write_region(
            buffer,
            offset,
            &OpacityUniform {
                opacity: self.opacity,
                _padding: [0.0; 3],
            },
        );
    }
}

fn line_topology(strip: bool) -> wgpu::PrimitiveTopology {
    if strip {
        wgpu::PrimitiveTopology::LineStrip
    } else {
        wgpu::PrimitiveTopology::LineList
    }
}

/// Single-colour lines over a position-only geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct LineMaterial {
    pub color: [f32; 4],
    pub strip: bool,
}

impl LineMaterial {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            strip: false,
        }
    }

    pub fn strip(mut self) -> Self {
        self.strip = true;
        self
    }
}

impl MaterialContract for LineMaterial {
    fn kind(&self) -> &str {
        "line"
    }

    fn vertex_source(&self) -> &str {
        BASIC_SHADER
    }

    fn fragment_source(&self) -> &str {
        BASIC_SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::new(&[VertexAttribute::Position])
    }

    fn uniform_buffer_size(&self) -> u64 {
        COLOR_UNIFORM_SIZE
    }

    fn topology(&self) -> wgpu::PrimitiveTopology {
        line_topology(self.strip)
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for LineMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, _ctx: &RenderContext<'_>) {
        write_region(buffer, offset, &ColorUniform { color: self.color });
    }
}

/// Lines coloured per vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct LineColorMaterial {
    pub opacity: f32,
    pub strip: bool,
}

impl LineColorMaterial {
    pub fn new() -> Self {
        Self {
            opacity: 1.0,
            strip: false,
        }
    }

    pub fn strip(mut self) -> Self {
        self.strip = true;
        self
    }
}

impl Default for LineColorMaterial {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialContract for LineColorMaterial {
    fn kind(&self) -> &str {
        "line-color"
    }

    fn vertex_source(&self) -> &str {
        VERTEX_COLOR_SHADER
    }

    fn fragment_source(&self) -> &str {
        VERTEX_COLOR_SHADER
    }

    fn vertex_layout(&self) -> VertexLayout {
        VertexLayout::new(&[VertexAttribute::Position, VertexAttribute::Color])
    }

    fn uniform_buffer_size(&self) -> u64 {
        OPACITY_UNIFORM_SIZE
    }

    fn topology(&self) -> wgpu::PrimitiveTopology {
        line_topology(self.strip)
    }

    fn uniform_writer(&self) -> Option<&dyn UniformWriter> {
        Some(self)
    }
}

impl UniformWriter for LineColorMaterial {
    fn write_uniform_data(&self, buffer: &mut [u8], offset: usize, _ctx: &RenderContext<'_>) {
        write_region(
            buffer,
            offset,
            &OpacityUniform {
                opacity: self.opacity,
                _padding: [0.0; 3],
            },
        );
    }
}

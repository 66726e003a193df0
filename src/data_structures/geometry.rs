//! Geometry data sources and interleaved vertex layouts.
//!
//! A [`Geometry`] holds de-interleaved float streams the way geometry
//! generators and loaders produce them. Materials declare which streams they
//! consume through a [`VertexLayout`]; [`Geometry::interleave`] packs exactly
//! those streams into one vertex buffer and refuses geometries that lack a
//! required stream instead of reading past the end of it.

use cgmath::{InnerSpace, Point3, Vector2, Vector3};

use crate::error::{RenderError, Result};

/// One per-vertex stream a material may consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    Uv,
    Tangent,
    Bitangent,
    Color,
}

impl VertexAttribute {
    /// Number of `f32` components this attribute occupies per vertex.
    pub const fn components(self) -> usize {
        match self {
            VertexAttribute::Uv => 2,
            _ => 3,
        }
    }

    pub const fn size(self) -> u64 {
        (self.components() * std::mem::size_of::<f32>()) as u64
    }

    pub const fn format(self) -> wgpu::VertexFormat {
        match self {
            VertexAttribute::Uv => wgpu::VertexFormat::Float32x2,
            _ => wgpu::VertexFormat::Float32x3,
        }
    }
}

/// Ordered list of interleaved attributes. Attribute `i` is bound to shader location `i`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(attributes: &[VertexAttribute]) -> Self {
        Self {
            attributes: attributes.to_vec(),
        }
    }

    /// A layout with no attributes; used by passes that synthesize vertices in the shader.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Byte stride of one interleaved vertex, always the sum of the attribute sizes.
    pub fn stride(&self) -> u64 {
        self.attributes.iter().map(|a| a.size()).sum()
    }

    pub fn floats_per_vertex(&self) -> usize {
        self.attributes.iter().map(|a| a.components()).sum()
    }

    /// Attribute descriptors with byte offsets and shader locations.
    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        let mut offset = 0;
        self.attributes
            .iter()
            .enumerate()
            .map(|(location, attribute)| {
                let desc = wgpu::VertexAttribute {
                    format: attribute.format(),
                    offset,
                    shader_location: location as u32,
                };
                offset += attribute.size();
                desc
            })
            .collect()
    }
}

/// Index data in either of the two formats the GPU accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    pub fn len(&self) -> usize {
        match self {
            Indices::U16(v) => v.len(),
            Indices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            Indices::U16(_) => wgpu::IndexFormat::Uint16,
            Indices::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    /// Raw bytes, padded to a multiple of four as buffer uploads require.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = match self {
            Indices::U16(v) => bytemuck::cast_slice(v).to_vec(),
            Indices::U32(v) => bytemuck::cast_slice(v).to_vec(),
        };
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bytes
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            Indices::U16(v) => v.get(i).map(|&i| i as u32),
            Indices::U32(v) => v.get(i).copied(),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Box around a flat `[x, y, z, x, y, z, ...]` position stream.
    /// An empty stream yields a degenerate box at the origin.
    pub fn from_positions(positions: &[f32]) -> Self {
        let mut chunks = positions.chunks_exact(3);
        let Some(first) = chunks.next() else {
            return Self {
                min: Point3::new(0.0, 0.0, 0.0),
                max: Point3::new(0.0, 0.0, 0.0),
            };
        };
        let mut min = Point3::new(first[0], first[1], first[2]);
        let mut max = min;
        for p in chunks {
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }
        Self { min, max }
    }

    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// De-interleaved vertex data as produced by a geometry generator or loader.
///
/// Vertex and index counts are fixed at construction; swap the whole geometry
/// on a mesh to change them.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Option<Vec<f32>>,
    tangents: Option<Vec<f32>>,
    bitangents: Option<Vec<f32>>,
    colors: Option<Vec<f32>>,
    indices: Option<Indices>,
}

impl Geometry {
    pub fn new(positions: Vec<f32>, normals: Vec<f32>) -> Self {
        Self {
            positions,
            normals,
            uvs: None,
            tangents: None,
            bitangents: None,
            colors: None,
            indices: None,
        }
    }

    /// Position-only geometry, e.g. for line materials.
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Self::new(positions, Vec::new())
    }

    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<f32>, bitangents: Vec<f32>) -> Self {
        self.tangents = Some(tangents);
        self.bitangents = Some(bitangents);
        self
    }

    pub fn with_colors(mut self, colors: Vec<f32>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_indices(mut self, indices: Indices) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn uvs(&self) -> Option<&[f32]> {
        self.uvs.as_deref()
    }

    pub fn tangents(&self) -> Option<&[f32]> {
        self.tangents.as_deref()
    }

    pub fn bitangents(&self) -> Option<&[f32]> {
        self.bitangents.as_deref()
    }

    pub fn colors(&self) -> Option<&[f32]> {
        self.colors.as_deref()
    }

    pub fn indices(&self) -> Option<&Indices> {
        self.indices.as_ref()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Indices::len)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_positions(&self.positions)
    }

    fn stream(&self, attribute: VertexAttribute) -> &[f32] {
        match attribute {
            VertexAttribute::Position => &self.positions,
            VertexAttribute::Normal => &self.normals,
            VertexAttribute::Uv => self.uvs.as_deref().unwrap_or(&[]),
            VertexAttribute::Tangent => self.tangents.as_deref().unwrap_or(&[]),
            VertexAttribute::Bitangent => self.bitangents.as_deref().unwrap_or(&[]),
            VertexAttribute::Color => self.colors.as_deref().unwrap_or(&[]),
        }
    }

    /// Packs the streams named by `layout` into one interleaved float buffer.
    ///
    /// `kind` only names the material in the error when a stream is missing or short.
    pub fn interleave(&self, layout: &VertexLayout, kind: &str) -> Result<Vec<f32>> {
        let count = self.vertex_count();
        let mut streams = Vec::with_capacity(layout.attributes().len());
        for &attribute in layout.attributes() {
            let stream = self.stream(attribute);
            let expected = count * attribute.components();
            if stream.len() < expected {
                return Err(RenderError::MissingVertexAttribute {
                    kind: kind.to_string(),
                    attribute,
                    expected,
                    actual: stream.len(),
                });
            }
            streams.push((stream, attribute.components()));
        }

        let mut data = Vec::with_capacity(count * layout.floats_per_vertex());
        for i in 0..count {
            for (stream, components) in &streams {
                data.extend_from_slice(&stream[i * components..(i + 1) * components]);
            }
        }
        Ok(data)
    }

    /// Vertex indices of every triangle, following the index buffer when present.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        match &self.indices {
            Some(indices) => (0..indices.len() / 3)
                .filter_map(|t| {
                    Some([
                        indices.get(t * 3)? as usize,
                        indices.get(t * 3 + 1)? as usize,
                        indices.get(t * 3 + 2)? as usize,
                    ])
                })
                .collect(),
            None => (0..self.vertex_count() / 3)
                .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
                .collect(),
        }
    }

    pub fn position(&self, i: usize) -> Option<Point3<f32>> {
        let p = self.positions.get(i * 3..i * 3 + 3)?;
        Some(Point3::new(p[0], p[1], p[2]))
    }

    /// Derives tangent and bitangent streams from positions and uvs.
    ///
    /// Each triangle contributes the same tangent frame to its three vertices;
    /// the per-vertex result is the average over all adjacent triangles.
    pub fn compute_tangents(&mut self) -> Result<()> {
        let count = self.vertex_count();
        let uvs = match self.uvs.as_deref() {
            Some(uvs) if uvs.len() >= count * 2 => uvs,
            other => {
                return Err(RenderError::MissingVertexAttribute {
                    kind: "tangent generation".to_string(),
                    attribute: VertexAttribute::Uv,
                    expected: count * 2,
                    actual: other.map_or(0, <[f32]>::len),
                });
            }
        };

        let mut tangents = vec![Vector3::new(0.0f32, 0.0, 0.0); count];
        let mut bitangents = vec![Vector3::new(0.0f32, 0.0, 0.0); count];
        let mut triangles_included = vec![0u32; count];

        for tri in self.triangles() {
            if tri.iter().any(|&i| i >= count) {
                continue;
            }
            let pos = |i: usize| {
                Vector3::new(
                    self.positions[i * 3],
                    self.positions[i * 3 + 1],
                    self.positions[i * 3 + 2],
                )
            };
            let uv = |i: usize| Vector2::new(uvs[i * 2], uvs[i * 2 + 1]);

            let delta_pos1 = pos(tri[1]) - pos(tri[0]);
            let delta_pos2 = pos(tri[2]) - pos(tri[0]);
            let delta_uv1 = uv(tri[1]) - uv(tri[0]);
            let delta_uv2 = uv(tri[2]) - uv(tri[0]);

            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // flipped for right-handed normal maps in wgpu's texture space
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for &i in &tri {
                tangents[i] += tangent;
                bitangents[i] += bitangent;
                triangles_included[i] += 1;
            }
        }

        let mut tangent_stream = Vec::with_capacity(count * 3);
        let mut bitangent_stream = Vec::with_capacity(count * 3);
        for i in 0..count {
            let (t, b) = match triangles_included[i] {
                0 => (tangents[i], bitangents[i]),
                n => {
                    let denom = 1.0 / n as f32;
                    (tangents[i] * denom, bitangents[i] * denom)
                }
            };
            let t = if t.magnitude2() > 0.0 { t.normalize() } else { t };
            let b = if b.magnitude2() > 0.0 { b.normalize() } else { b };
            tangent_stream.extend_from_slice(&[t.x, t.y, t.z]);
            bitangent_stream.extend_from_slice(&[b.x, b.y, b.z]);
        }
        self.tangents = Some(tangent_stream);
        self.bitangents = Some(bitangent_stream);
        Ok(())
    }
}

//! Per-drawable GPU resources.
//!
//! Every [`Mesh`] the renderer draws owns a vertex buffer, an optional index
//! buffer, a uniform buffer sized to its material and the bind groups that
//! expose them to the material's pipeline. Entries live until the mesh is
//! disposed and are rebuilt piecemeal:
//!
//! - a different pipeline (material kind or topology changed) rebuilds everything
//! - new texture identities in the material's slots rebuild the bind groups
//! - `Mesh::needs_update` rebuilds the vertex and index buffers

use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{
    context::{BindingResource, BufferDescriptor, RenderDevice},
    data_structures::{
        mesh::{Mesh, MeshId},
        texture::TextureId,
    },
    error::Result,
    materials::MaterialContract,
};

use super::{fallback::FallbackResources, texture::TextureCache};

pub struct IndexBinding<D: RenderDevice> {
    pub buffer: D::Buffer,
    pub count: u32,
    pub format: wgpu::IndexFormat,
}

pub struct MeshResources<D: RenderDevice> {
    pub pipeline: Arc<D::Pipeline>,
    pub vertex_buffer: D::Buffer,
    pub vertex_count: u32,
    pub index: Option<IndexBinding<D>>,
    pub uniform_buffer: D::Buffer,
    pub uniform_size: u64,
    pub bind_group: D::BindGroup,
    /// Environment lighting at group 1, for materials that declare one.
    pub ibl_bind_group: Option<D::BindGroup>,
    texture_signature: Vec<Option<TextureId>>,
}

impl<D: RenderDevice> MeshResources<D> {
    fn destroy(&self, device: &D) {
        device.destroy_buffer(&self.vertex_buffer);
        if let Some(index) = &self.index {
            device.destroy_buffer(&index.buffer);
        }
        device.destroy_buffer(&self.uniform_buffer);
    }
}

/// Texture identities bound by `material`, slots first, environment last.
fn texture_signature(material: &dyn MaterialContract) -> Vec<Option<TextureId>> {
    material
        .texture_slots()
        .iter()
        .chain(material.environment().as_ref())
        .map(|slot| slot.texture.as_ref().map(|t| t.id()))
        .collect()
}

type GeometryBuffers<D> = (<D as RenderDevice>::Buffer, u32, Option<IndexBinding<D>>);

pub struct MeshResourceCache<D: RenderDevice> {
    entries: HashMap<MeshId, MeshResources<D>>,
}

impl<D: RenderDevice> Default for MeshResourceCache<D> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<D: RenderDevice> MeshResourceCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MeshId) -> Option<&MeshResources<D>> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `mesh`'s resources for `pipeline`, creating or refreshing them as needed.
    ///
    /// Fails before allocating anything when the geometry lacks a vertex
    /// stream the material requires.
    pub fn get_or_create(
        &mut self,
        device: &D,
        mesh: &Mesh,
        pipeline: Arc<D::Pipeline>,
        textures: &mut TextureCache<D>,
        fallbacks: &FallbackResources<D>,
    ) -> Result<&MeshResources<D>> {
        let material = mesh.material().contract();
        let label = format!("{} mesh {:?}", material.kind(), mesh.id());
        let signature = texture_signature(material);

        let stale = match self.entries.get(&mesh.id()) {
            None => true,
            Some(entry) => {
                !Arc::ptr_eq(&entry.pipeline, &pipeline)
                    || entry.uniform_size != material.uniform_buffer_size()
            }
        };

        if stale {
            let geometry = Self::create_geometry(device, mesh, &label)?;
            if let Some(old) = self.entries.remove(&mesh.id()) {
                debug!("rebuilding resources of {label}");
                old.destroy(device);
            }
            let uniform_size = material.uniform_buffer_size();
            let uniform_buffer = device.create_buffer(&BufferDescriptor {
                label: &label,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                size: uniform_size,
                contents: None,
            });
            let (bind_group, ibl_bind_group) = Self::create_bind_groups(
                device,
                &label,
                &pipeline,
                &uniform_buffer,
                material,
                textures,
                fallbacks,
            );
            let (vertex_buffer, vertex_count, index) = geometry;
            self.entries.insert(
                mesh.id(),
                MeshResources {
                    pipeline,
                    vertex_buffer,
                    vertex_count,
                    index,
                    uniform_buffer,
                    uniform_size,
                    bind_group,
                    ibl_bind_group,
                    texture_signature: signature,
                },
            );
        } else if let Some(entry) = self.entries.get_mut(&mesh.id()) {
            if mesh.needs_update() {
                let (vertex_buffer, vertex_count, index) =
                    Self::create_geometry(device, mesh, &label)?;
                debug!("re-uploading geometry of {label}");
                device.destroy_buffer(&entry.vertex_buffer);
                if let Some(old) = &entry.index {
                    device.destroy_buffer(&old.buffer);
                }
                entry.vertex_buffer = vertex_buffer;
                entry.vertex_count = vertex_count;
                entry.index = index;
            }
            if entry.texture_signature != signature {
                debug!("texture bindings of {label} changed");
                let (bind_group, ibl_bind_group) = Self::create_bind_groups(
                    device,
                    &label,
                    &entry.pipeline,
                    &entry.uniform_buffer,
                    material,
                    textures,
                    fallbacks,
                );
                entry.bind_group = bind_group;
                entry.ibl_bind_group = ibl_bind_group;
                entry.texture_signature = signature;
            }
        }

        Ok(&self.entries[&mesh.id()])
    }

    fn create_geometry(device: &D, mesh: &Mesh, label: &str) -> Result<GeometryBuffers<D>> {
        let vertices = mesh.interleaved_vertices()?;
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label,
            usage: wgpu::BufferUsages::VERTEX,
            size: 0,
            contents: Some(bytemuck::cast_slice(&vertices)),
        });
        let vertex_count = mesh.geometry().vertex_count() as u32;
        let index = mesh
            .geometry()
            .indices()
            .filter(|indices| !indices.is_empty())
            .map(|indices| IndexBinding {
                buffer: device.create_buffer(&BufferDescriptor {
                    label,
                    usage: wgpu::BufferUsages::INDEX,
                    size: 0,
                    contents: Some(&indices.to_bytes()),
                }),
                count: indices.len() as u32,
                format: indices.format(),
            });
        Ok((vertex_buffer, vertex_count, index))
    }

    fn create_bind_groups(
        device: &D,
        label: &str,
        pipeline: &D::Pipeline,
        uniform_buffer: &D::Buffer,
        material: &dyn MaterialContract,
        textures: &mut TextureCache<D>,
        fallbacks: &FallbackResources<D>,
    ) -> (D::BindGroup, Option<D::BindGroup>) {
        let bound: Vec<D::Texture> = material
            .texture_slots()
            .iter()
            .map(|slot| fallbacks.resolve(device, slot, textures))
            .collect();
        let mut entries = vec![BindingResource::Buffer(uniform_buffer)];
        if !bound.is_empty() {
            entries.push(BindingResource::Sampler(fallbacks.sampler()));
            entries.extend(bound.iter().map(BindingResource::Texture));
        }
        let bind_group = device.create_bind_group(label, pipeline, 0, &entries);

        let ibl_bind_group = material.environment().map(|env| {
            let cube = fallbacks.resolve(device, &env, textures);
            device.create_bind_group(
                &format!("{label} environment"),
                pipeline,
                1,
                &[
                    BindingResource::Texture(&cube),
                    BindingResource::Sampler(fallbacks.sampler()),
                ],
            )
        });
        (bind_group, ibl_bind_group)
    }

    /// Ids of every texture some cached bind group was built with.
    pub fn bound_textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.entries
            .values()
            .flat_map(|entry| entry.texture_signature.iter().flatten().copied())
    }

    pub fn dispose_mesh(&mut self, device: &D, id: MeshId) {
        if let Some(entry) = self.entries.remove(&id) {
            entry.destroy(device);
        }
    }

    pub fn dispose_all(&mut self, device: &D) {
        for (_, entry) in self.entries.drain() {
            entry.destroy(device);
        }
    }
}

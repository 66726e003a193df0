use cgmath::{Matrix4, SquareMatrix};
use log::{debug, warn};

use crate::{
    context::{DrawCommand, RenderDevice},
    data_structures::{
        camera::CameraView,
        light::LightInfo,
        scene_graph::{NodeHandle, Scene},
    },
    error::{RenderError, Result},
    materials::{MVP_SIZE, MaterialContract, RenderContext},
    pipelines::cache::PipelineCache,
    resources::{fallback::FallbackResources, mesh::MeshResourceCache, texture::TextureCache},
};

/// Checks that a material's own region starts after the MVP matrix, fits its
/// buffer and starts where a buffer copy may.
pub fn validate_data_offset(material: &dyn MaterialContract) -> Result<()> {
    let offset = material.data_offset();
    let size = material.uniform_buffer_size();
    if offset < MVP_SIZE {
        return Err(RenderError::UniformOffsetViolation {
            kind: material.kind().to_string(),
            offset: offset as usize,
            reserved: MVP_SIZE as usize,
        });
    }
    if offset > size {
        return Err(RenderError::UniformOffsetOutOfRange {
            kind: material.kind().to_string(),
            offset: offset as usize,
            size: size as usize,
        });
    }
    if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
        return Err(RenderError::MisalignedUniformOffset {
            kind: material.kind().to_string(),
            offset: offset as usize,
            alignment: wgpu::COPY_BUFFER_ALIGNMENT as usize,
        });
    }
    Ok(())
}

/// Shared caches the mesh pass resolves drawables through.
pub struct MeshPassResources<'a, D: RenderDevice> {
    pub pipelines: &'a mut PipelineCache<D>,
    pub meshes: &'a mut MeshResourceCache<D>,
    pub textures: &'a mut TextureCache<D>,
    pub fallbacks: &'a FallbackResources<D>,
}

/// Records one draw per visible drawable, in traversal order.
#[derive(Debug, Default)]
pub struct MeshPass {
    scratch: Vec<u8>,
}

impl MeshPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads each drawable's uniforms and appends its draw to `commands`.
    /// Returns the number of draw calls recorded.
    #[allow(clippy::too_many_arguments)]
    pub fn record<D: RenderDevice>(
        &mut self,
        device: &D,
        scene: &Scene,
        drawables: &[NodeHandle],
        lights: &[LightInfo],
        camera: &CameraView,
        caches: MeshPassResources<'_, D>,
        commands: &mut Vec<DrawCommand<D>>,
    ) -> Result<usize> {
        let MeshPassResources {
            pipelines,
            meshes,
            textures,
            fallbacks,
        } = caches;
        let view_projection = camera.view_projection();
        let mut draw_calls = 0;

        for &node in drawables {
            let Some(mesh) = scene.mesh(node) else {
                continue;
            };
            if mesh.material().is_skybox() {
                warn!(
                    "mesh {:?} carries a skybox material; skyboxes are drawn through the scene",
                    mesh.id()
                );
                continue;
            }
            // nothing to bind: wgpu rejects empty vertex buffer slices
            if mesh.geometry().vertex_count() == 0 {
                debug!("mesh {:?} has no vertices, skipping", mesh.id());
                continue;
            }
            let material = mesh.material().contract();
            validate_data_offset(material)?;

            let pipeline = pipelines.get_or_create(device, material)?;
            let res = meshes.get_or_create(device, mesh, pipeline, textures, fallbacks)?;

            let world_matrix = scene.world_matrix(node).unwrap_or_else(Matrix4::identity);
            let mvp: [[f32; 4]; 4] = (view_projection * world_matrix).into();
            device.write_buffer(&res.uniform_buffer, 0, bytemuck::bytes_of(&mvp));

            if let Some(writer) = material.uniform_writer() {
                let offset = material.data_offset() as usize;
                let size = material.uniform_buffer_size() as usize;
                self.scratch.clear();
                self.scratch.resize(size, 0);
                let ctx = RenderContext {
                    camera,
                    scene,
                    node,
                    mesh,
                    world_matrix,
                    lights,
                };
                writer.write_uniform_data(&mut self.scratch, offset, &ctx);
                // bytes below the offset stay whatever the GPU buffer already holds
                if offset < size {
                    device.write_buffer(
                        &res.uniform_buffer,
                        offset as u64,
                        &self.scratch[offset..size],
                    );
                }
            }

            commands.push(DrawCommand::SetPipeline(res.pipeline.clone()));
            commands.push(DrawCommand::SetBindGroup(0, res.bind_group.clone()));
            if let Some(ibl) = &res.ibl_bind_group {
                commands.push(DrawCommand::SetBindGroup(1, ibl.clone()));
            }
            commands.push(DrawCommand::SetVertexBuffer(res.vertex_buffer.clone()));
            match &res.index {
                Some(index) => {
                    commands.push(DrawCommand::SetIndexBuffer(
                        index.buffer.clone(),
                        index.format,
                    ));
                    commands.push(DrawCommand::DrawIndexed(0..index.count));
                }
                None => commands.push(DrawCommand::Draw(0..res.vertex_count)),
            }
            draw_calls += 1;
        }
        Ok(draw_calls)
    }
}

use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix, Vector4};
use log::debug;

use crate::{
    context::{BindingResource, BufferDescriptor, DrawCommand, RenderDevice},
    data_structures::{camera::CameraView, texture::TextureId},
    error::Result,
    materials::{MVP_SIZE, MaterialContract, MaterialId, SkyboxMaterial},
    pipelines::basic::{PassState, PipelineSettings, mk_material_pipeline},
    resources::{fallback::FallbackResources, texture::TextureCache},
};

/// GPU state of the scene's skybox, tagged with the material it was built for.
pub struct SkyboxResources<D: RenderDevice> {
    pub material_id: MaterialId,
    pub binding_revision: u64,
    pub pipeline: Arc<D::Pipeline>,
    pub uniform_buffer: D::Buffer,
    pub bind_group: D::BindGroup,
    bound_textures: Vec<TextureId>,
}

/// Draws the background cube map before any mesh.
pub struct SkyboxPass<D: RenderDevice> {
    resources: Option<SkyboxResources<D>>,
}

impl<D: RenderDevice> Default for SkyboxPass<D> {
    fn default() -> Self {
        Self { resources: None }
    }
}

/// Inverse of the view-projection with the camera translation removed.
fn inverse_rotation_view_projection(camera: &CameraView) -> Matrix4<f32> {
    let mut view = camera.view;
    view.w = Vector4::new(0.0, 0.0, 0.0, 1.0);
    (camera.projection * view)
        .invert()
        .unwrap_or_else(Matrix4::identity)
}

impl<D: RenderDevice> SkyboxPass<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resources(&self) -> Option<&SkyboxResources<D>> {
        self.resources.as_ref()
    }

    /// Ids of the textures the current bind group was built with.
    pub fn bound_textures(&self) -> &[TextureId] {
        self.resources
            .as_ref()
            .map(|res| res.bound_textures.as_slice())
            .unwrap_or_default()
    }

    fn texture_ids(sky: &SkyboxMaterial) -> Vec<TextureId> {
        sky.texture_slots()
            .iter()
            .filter_map(|slot| slot.texture.as_ref().map(|t| t.id()))
            .collect()
    }

    fn bind_group(
        device: &D,
        sky: &SkyboxMaterial,
        pipeline: &D::Pipeline,
        uniform_buffer: &D::Buffer,
        textures: &mut TextureCache<D>,
        fallbacks: &FallbackResources<D>,
    ) -> D::BindGroup {
        let mut entries = vec![
            BindingResource::Buffer(uniform_buffer),
            BindingResource::Sampler(fallbacks.sampler()),
        ];
        let bound: Vec<D::Texture> = sky
            .texture_slots()
            .iter()
            .map(|slot| fallbacks.resolve(device, slot, textures))
            .collect();
        entries.extend(bound.iter().map(BindingResource::Texture));
        device.create_bind_group("skybox", pipeline, 0, &entries)
    }

    /// Brings the GPU state in line with `sky` and uploads this frame's uniforms.
    ///
    /// A different material rebuilds everything. A new binding revision on the
    /// same material rebuilds only the bind group.
    pub fn prepare(
        &mut self,
        device: &D,
        settings: &PipelineSettings,
        sky: &SkyboxMaterial,
        camera: &CameraView,
        textures: &mut TextureCache<D>,
        fallbacks: &FallbackResources<D>,
    ) -> Result<()> {
        let same_material = self
            .resources
            .as_ref()
            .is_some_and(|res| res.material_id == sky.id());

        if !same_material {
            let pipeline = Arc::new(mk_material_pipeline(
                device,
                sky,
                settings,
                PassState::skybox(),
            )?);
            self.release(device);
            debug!("building skybox resources for {:?}", sky.id());
            let uniform_buffer = device.create_buffer(&BufferDescriptor {
                label: "skybox uniforms",
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                size: sky.uniform_buffer_size(),
                contents: None,
            });
            let bind_group =
                Self::bind_group(device, sky, &pipeline, &uniform_buffer, textures, fallbacks);
            self.resources = Some(SkyboxResources {
                material_id: sky.id(),
                binding_revision: sky.binding_revision(),
                pipeline,
                uniform_buffer,
                bind_group,
                bound_textures: Self::texture_ids(sky),
            });
        } else if let Some(res) = &mut self.resources
            && res.binding_revision != sky.binding_revision()
        {
            debug!(
                "skybox binding revision {} -> {}",
                res.binding_revision,
                sky.binding_revision()
            );
            res.bind_group = Self::bind_group(
                device,
                sky,
                &res.pipeline,
                &res.uniform_buffer,
                textures,
                fallbacks,
            );
            res.binding_revision = sky.binding_revision();
            res.bound_textures = Self::texture_ids(sky);
        }

        if let Some(res) = &self.resources {
            let mut scratch = vec![0u8; sky.uniform_buffer_size() as usize];
            let matrix: [[f32; 4]; 4] = inverse_rotation_view_projection(camera).into();
            scratch[..MVP_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&matrix));
            sky.write_params(&mut scratch, MVP_SIZE as usize);
            device.write_buffer(&res.uniform_buffer, 0, &scratch);
        }
        Ok(())
    }

    pub fn record(&self, commands: &mut Vec<DrawCommand<D>>) -> bool {
        let Some(res) = &self.resources else {
            return false;
        };
        commands.push(DrawCommand::SetPipeline(res.pipeline.clone()));
        commands.push(DrawCommand::SetBindGroup(0, res.bind_group.clone()));
        commands.push(DrawCommand::Draw(0..3));
        true
    }

    /// Drops the GPU state, e.g. once the scene no longer has a skybox.
    pub fn release(&mut self, device: &D) {
        if let Some(res) = self.resources.take() {
            device.destroy_buffer(&res.uniform_buffer);
        }
    }
}

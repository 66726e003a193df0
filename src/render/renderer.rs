use std::collections::HashSet;

use cgmath::{Matrix4, SquareMatrix};
use log::{debug, trace};

use crate::{
    context::{DrawCommand, PassDescriptor, RenderDevice},
    data_structures::{
        camera::CameraView,
        mesh::Mesh,
        scene_graph::{NodeHandle, Scene},
    },
    error::{RenderError, Result},
    pipelines::{basic::PipelineSettings, cache::PipelineCache},
    resources::{
        fallback::FallbackResources,
        mesh::{MeshResourceCache, MeshResources},
        texture::TextureCache,
    },
};

use super::{
    FrameStats, RendererConfig,
    mesh_pass::{MeshPass, MeshPassResources},
    skybox_pass::{SkyboxPass, SkyboxResources},
    targets::RenderTargets,
};

/// Draws scenes through a [`RenderDevice`].
///
/// The renderer owns every GPU object it creates: one pipeline per material
/// kind and topology, one resource record per drawable, one upload per
/// texture and the frame's render targets. Nothing is freed behind the
/// caller's back, apart from texture uploads no cached binding refers to any
/// more; [`Renderer::dispose_mesh`], [`Renderer::dispose`] and
/// [`Renderer::destroy`] release resources explicitly.
pub struct Renderer<D: RenderDevice> {
    device: D,
    config: RendererConfig,
    pipeline_cache: PipelineCache<D>,
    mesh_resources: MeshResourceCache<D>,
    textures: TextureCache<D>,
    fallbacks: FallbackResources<D>,
    skybox_pass: SkyboxPass<D>,
    mesh_pass: MeshPass,
    targets: RenderTargets<D>,
}

impl<D: RenderDevice> Renderer<D> {
    pub fn new(device: D, config: RendererConfig) -> Self {
        let settings = PipelineSettings {
            color_format: device.surface_format(),
            depth_format: config.depth_format,
            sample_count: config.sample_count,
        };
        let fallbacks = FallbackResources::new(&device);
        let targets = RenderTargets::new(
            &device,
            device.surface_size(),
            settings.color_format,
            settings.depth_format,
            settings.sample_count,
        );
        debug!(
            "renderer ready: {:?}, {}x MSAA",
            settings.color_format, settings.sample_count
        );
        Self {
            device,
            config,
            pipeline_cache: PipelineCache::new(settings),
            mesh_resources: MeshResourceCache::new(),
            textures: TextureCache::new(),
            fallbacks,
            skybox_pass: SkyboxPass::new(),
            mesh_pass: MeshPass::new(),
            targets,
        }
    }

    /// Records and submits one frame of `scene` seen through the camera node `camera`.
    ///
    /// Every draw is recorded before the frame is acquired, so an error leaves
    /// nothing half-submitted.
    pub fn render(&mut self, scene: &mut Scene, camera: NodeHandle) -> Result<FrameStats> {
        scene.refresh_all();
        scene.refresh_world_matrix(camera, true, false);

        let lens = match (scene.node(camera), scene.camera(camera)) {
            (_, Some(lens)) => *lens,
            (Some(node), None) => return Err(RenderError::NotACamera(node.name.clone())),
            (None, _) => return Err(RenderError::UnknownNode(format!("{camera:?}"))),
        };

        let (drawables, lights) = scene.partition_visible();

        self.targets
            .ensure_size(&self.device, self.device.surface_size());
        let camera_world = scene
            .world_matrix(camera)
            .unwrap_or_else(Matrix4::identity);
        let view = CameraView::new(&lens, camera_world, self.targets.aspect());

        let mut commands: Vec<DrawCommand<D>> = Vec::new();
        let skybox_drawn = match scene.skybox() {
            Some(sky) => {
                self.skybox_pass.prepare(
                    &self.device,
                    self.pipeline_cache.settings(),
                    sky,
                    &view,
                    &mut self.textures,
                    &self.fallbacks,
                )?;
                self.skybox_pass.record(&mut commands)
            }
            None => {
                self.skybox_pass.release(&self.device);
                false
            }
        };

        let draw_calls = self.mesh_pass.record(
            &self.device,
            scene,
            &drawables,
            &lights,
            &view,
            MeshPassResources {
                pipelines: &mut self.pipeline_cache,
                meshes: &mut self.mesh_resources,
                textures: &mut self.textures,
                fallbacks: &self.fallbacks,
            },
            &mut commands,
        )?;

        for &node in &drawables {
            if let Some(mesh) = scene.mesh_mut(node) {
                mesh.clear_needs_update();
            }
        }
        self.evict_unused_textures();

        let frame = self.device.acquire_frame()?;
        self.device.submit(
            &frame,
            &PassDescriptor {
                color: self.targets.color(),
                depth: self.targets.depth(),
                clear_color: self.config.clear_color,
                clear_depth: 1.0,
            },
            &commands,
        );
        self.device.present(frame);

        let stats = FrameStats {
            drawables: drawables.len(),
            lights: lights.len(),
            draw_calls: draw_calls + usize::from(skybox_drawn),
            skybox_drawn,
        };
        trace!("{stats:?}");
        Ok(stats)
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.config.clear_color = color;
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Resizes the surface; the render targets follow on the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.device.resize_surface(width, height);
    }

    /// Releases the GPU resources of one drawable. They are recreated if it is drawn again.
    pub fn dispose_mesh(&mut self, mesh: &Mesh) {
        self.mesh_resources.dispose_mesh(&self.device, mesh.id());
        self.evict_unused_textures();
    }

    /// Destroys uploads that no cached bind group refers to any more.
    fn evict_unused_textures(&mut self) {
        let live: HashSet<_> = self
            .mesh_resources
            .bound_textures()
            .chain(self.skybox_pass.bound_textures().iter().copied())
            .collect();
        self.textures.retain(&self.device, &live);
    }

    /// Releases every cached GPU resource. Fallback textures and render targets
    /// stay until [`Renderer::destroy`], so it can still render afterwards.
    pub fn dispose(&mut self) {
        self.mesh_resources.dispose_all(&self.device);
        self.skybox_pass.release(&self.device);
        self.textures.dispose_all(&self.device);
        self.pipeline_cache.clear();
    }

    /// Releases everything, fallback textures and render targets included,
    /// and hands the device back.
    pub fn destroy(mut self) -> D {
        self.dispose();
        self.fallbacks.dispose(&self.device);
        self.targets.destroy(&self.device);
        debug!("renderer destroyed");
        self.device
    }

    pub fn pipeline_cache(&self) -> &PipelineCache<D> {
        &self.pipeline_cache
    }

    pub fn skybox_resources(&self) -> Option<&SkyboxResources<D>> {
        self.skybox_pass.resources()
    }

    pub fn mesh_resources(&self, mesh: &Mesh) -> Option<&MeshResources<D>> {
        self.mesh_resources.get(mesh.id())
    }

    pub fn textures(&self) -> &TextureCache<D> {
        &self.textures
    }

    pub fn targets(&self) -> &RenderTargets<D> {
        &self.targets
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

use crate::{
    context::{BindingKind, DepthConfig, PipelineDescriptor, RenderDevice},
    error::Result,
    materials::{MaterialContract, pipeline_key},
};

/// Render target state shared by every pipeline of a renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

/// Fixed-function state that differs between passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassState {
    pub depth_write_enabled: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub cull_mode: Option<wgpu::Face>,
    pub blend: Option<wgpu::BlendState>,
}

impl PassState {
    /// Opaque and alpha-blended geometry: depth written, nearer fragments win,
    /// back faces of triangles culled.
    pub fn mesh(topology: wgpu::PrimitiveTopology) -> Self {
        let triangles = matches!(
            topology,
            wgpu::PrimitiveTopology::TriangleList | wgpu::PrimitiveTopology::TriangleStrip
        );
        Self {
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            cull_mode: triangles.then_some(wgpu::Face::Back),
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        }
    }

    /// Background at the far plane: never writes depth and loses against anything nearer.
    pub fn skybox() -> Self {
        Self {
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            cull_mode: None,
            blend: Some(wgpu::BlendState::REPLACE),
        }
    }
}

/// Bind group layout a material's resources are bound with.
///
/// Group 0 holds the uniform buffer at binding 0 and, when the material
/// samples textures, a sampler at binding 1 followed by one binding per
/// texture slot. Materials with an environment map get group 1: the cube
/// texture at binding 0 and its sampler at binding 1.
pub fn material_bind_groups(material: &dyn MaterialContract) -> Vec<Vec<BindingKind>> {
    let mut group0 = vec![BindingKind::Uniform];
    let slots = material.texture_slots();
    if !slots.is_empty() {
        group0.push(BindingKind::Sampler);
        group0.extend(
            slots
                .iter()
                .map(|slot| BindingKind::Texture(slot.kind().view_dimension())),
        );
    }
    let mut groups = vec![group0];
    if let Some(env) = material.environment() {
        groups.push(vec![
            BindingKind::Texture(env.kind().view_dimension()),
            BindingKind::Sampler,
        ]);
    }
    groups
}

/// Builds the pipeline for `material` through `device`.
pub fn mk_material_pipeline<D: RenderDevice>(
    device: &D,
    material: &dyn MaterialContract,
    settings: &PipelineSettings,
    state: PassState,
) -> Result<D::Pipeline> {
    let label = pipeline_key(material);
    let vertex_layout = material.vertex_layout();
    let bind_groups = material_bind_groups(material);
    device.create_pipeline(&PipelineDescriptor {
        label: &label,
        vertex_source: material.vertex_source(),
        fragment_source: material.fragment_source(),
        vertex_layout: &vertex_layout,
        bind_groups: &bind_groups,
        topology: material.topology(),
        cull_mode: state.cull_mode,
        color_format: settings.color_format,
        blend: state.blend,
        depth: DepthConfig {
            format: settings.depth_format,
            write_enabled: state.depth_write_enabled,
            compare: state.depth_compare,
        },
        sample_count: settings.sample_count,
    })
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    desc: &PipelineDescriptor<'_>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    vertex_shader: &wgpu::ShaderModule,
    fragment_shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment_shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.color_format,
                blend: desc.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: desc.depth.format,
            depth_write_enabled: Some(desc.depth.write_enabled),
            depth_compare: Some(desc.depth.compare),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: desc.sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

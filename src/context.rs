//! The graphics device boundary.
//!
//! Everything the renderer asks of the GPU goes through [`RenderDevice`]:
//! resource creation, uniform uploads and one submission per frame. Draws are
//! recorded as a list of [`DrawCommand`]s first and handed over in a single
//! [`RenderDevice::submit`] call, which lets the per-frame logic run (and be
//! tested) without a GPU.
//!
//! [`Context`] is the wgpu implementation. Adapter and device selection stay
//! with the caller; the context only owns what it was given.

use std::{ops::Range, sync::Arc};

use log::{debug, warn};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::geometry::VertexLayout,
    error::{RenderError, Result},
    pipelines::basic::mk_render_pipeline,
};

/// Kind of one binding inside a bind group, in binding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Uniform,
    Texture(wgpu::TextureViewDimension),
    Sampler,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthConfig {
    pub format: wgpu::TextureFormat,
    pub write_enabled: bool,
    pub compare: wgpu::CompareFunction,
}

/// Everything needed to build one render pipeline.
#[derive(Clone, Debug)]
pub struct PipelineDescriptor<'a> {
    pub label: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub vertex_layout: &'a VertexLayout,
    /// Layout of bind groups 0, 1, ...
    pub bind_groups: &'a [Vec<BindingKind>],
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub color_format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
    pub depth: DepthConfig,
    pub sample_count: u32,
}

#[derive(Clone, Debug)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub usage: wgpu::BufferUsages,
    pub size: u64,
    /// Initial contents; `size` is ignored when present.
    pub contents: Option<&'a [u8]>,
}

#[derive(Clone, Debug)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    /// 1 for plain 2D textures, 6 for cube maps.
    pub layers: u32,
    pub dimension: wgpu::TextureViewDimension,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub usage: wgpu::TextureUsages,
    /// Tightly packed texels for every layer.
    pub data: Option<&'a [u8]>,
}

/// One entry of a bind group; entries are bound at consecutive binding indices.
pub enum BindingResource<'a, D: RenderDevice> {
    Buffer(&'a D::Buffer),
    Texture(&'a D::Texture),
    Sampler(&'a D::Sampler),
}

/// One recorded render pass command.
pub enum DrawCommand<D: RenderDevice> {
    SetPipeline(Arc<D::Pipeline>),
    SetBindGroup(u32, D::BindGroup),
    SetVertexBuffer(D::Buffer),
    SetIndexBuffer(D::Buffer, wgpu::IndexFormat),
    Draw(Range<u32>),
    DrawIndexed(Range<u32>),
}

/// Attachments and clear values of the frame's single render pass.
pub struct PassDescriptor<'a, D: RenderDevice> {
    /// Multisampled colour target resolving into the frame; `None` renders to the frame directly.
    pub color: Option<&'a D::Texture>,
    pub depth: &'a D::Texture,
    pub clear_color: wgpu::Color,
    pub clear_depth: f32,
}

/// Capability provider behind the renderer.
pub trait RenderDevice: Sized {
    type Buffer: Clone;
    type Texture: Clone;
    type Sampler: Clone;
    type BindGroup: Clone;
    type Pipeline;
    type Frame;

    fn surface_size(&self) -> (u32, u32);

    fn surface_format(&self) -> wgpu::TextureFormat;

    fn resize_surface(&mut self, width: u32, height: u32);

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<Self::Pipeline>;

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Self::Buffer;

    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    fn destroy_buffer(&self, buffer: &Self::Buffer);

    fn create_texture(&self, desc: &TextureDescriptor<'_>) -> Self::Texture;

    fn destroy_texture(&self, texture: &Self::Texture);

    fn create_sampler(&self, label: &str) -> Self::Sampler;

    fn create_bind_group(
        &self,
        label: &str,
        pipeline: &Self::Pipeline,
        group: u32,
        entries: &[BindingResource<'_, Self>],
    ) -> Self::BindGroup;

    fn acquire_frame(&mut self) -> Result<Self::Frame>;

    fn submit(
        &self,
        frame: &Self::Frame,
        pass: &PassDescriptor<'_, Self>,
        commands: &[DrawCommand<Self>],
    );

    fn present(&self, frame: Self::Frame);
}

/// A texture together with the view the renderer binds.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// A render pipeline and the bind group layouts it was built with.
#[derive(Clone, Debug)]
pub struct GpuPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layouts: Vec<wgpu::BindGroupLayout>,
}

/// The surface texture of one frame and its view.
pub struct GpuFrame {
    pub output: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

#[derive(Debug)]
pub struct Context {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

impl Context {
    /// Configures `surface` for `adapter` at the given pixel size.
    pub fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let surface_caps = surface.get_capabilities(adapter);
        // Shaders write linear colour and rely on an sRGB surface for the final conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("surface has no supported formats".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        debug!(
            "configured {}x{} surface with {:?}",
            config.width, config.height, config.format
        );
        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    fn bind_group_layout(&self, label: &str, kinds: &[BindingKind]) -> wgpu::BindGroupLayout {
        let entries: Vec<_> = kinds
            .iter()
            .enumerate()
            .map(|(binding, kind)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: match kind {
                    BindingKind::Uniform => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    BindingKind::Texture(view_dimension) => wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: *view_dimension,
                        multisampled: false,
                    },
                    BindingKind::Sampler => {
                        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                    }
                },
                count: None,
            })
            .collect();
        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            })
    }
}

impl RenderDevice for Context {
    type Buffer = wgpu::Buffer;
    type Texture = GpuTexture;
    type Sampler = wgpu::Sampler;
    type BindGroup = wgpu::BindGroup;
    type Pipeline = GpuPipeline;
    type Frame = GpuFrame;

    fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<GpuPipeline> {
        if desc.vertex_source.trim().is_empty() || desc.fragment_source.trim().is_empty() {
            return Err(RenderError::PipelineCreation {
                label: desc.label.to_string(),
                message: "shader source is empty".into(),
            });
        }

        let bind_group_layouts: Vec<_> = desc
            .bind_groups
            .iter()
            .enumerate()
            .map(|(i, kinds)| self.bind_group_layout(&format!("{} group {i}", desc.label), kinds))
            .collect();
        let layout_refs: Vec<_> = bind_group_layouts.iter().map(Some).collect();
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &layout_refs,
                immediate_size: 0,
            });

        let vertex_shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.vertex_source.into()),
            });
        // materials usually keep both stages in one module
        let fragment_shader = if desc.fragment_source == desc.vertex_source {
            vertex_shader.clone()
        } else {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(desc.label),
                    source: wgpu::ShaderSource::Wgsl(desc.fragment_source.into()),
                })
        };

        let attributes = desc.vertex_layout.wgpu_attributes();
        let vertex_buffers = if desc.vertex_layout.is_empty() {
            vec![]
        } else {
            vec![wgpu::VertexBufferLayout {
                array_stride: desc.vertex_layout.stride(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }]
        };

        debug!("compiling pipeline `{}`", desc.label);
        let pipeline = mk_render_pipeline(
            &self.device,
            &layout,
            desc,
            &vertex_buffers,
            &vertex_shader,
            &fragment_shader,
        );
        Ok(GpuPipeline {
            pipeline,
            bind_group_layouts,
        })
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> wgpu::Buffer {
        match desc.contents {
            Some(contents) => self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(desc.label),
                    contents,
                    usage: desc.usage,
                }),
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(desc.label),
                size: desc.size,
                usage: desc.usage,
                mapped_at_creation: false,
            }),
        }
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn destroy_buffer(&self, buffer: &wgpu::Buffer) {
        buffer.destroy();
    }

    fn create_texture(&self, desc: &TextureDescriptor<'_>) -> GpuTexture {
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: desc.layers,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size,
            mip_level_count: 1,
            sample_count: desc.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });
        if let Some(data) = desc.data {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * desc.width),
                    rows_per_image: Some(desc.height),
                },
                size,
            );
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(desc.label),
            dimension: Some(desc.dimension),
            ..Default::default()
        });
        GpuTexture { texture, view }
    }

    fn destroy_texture(&self, texture: &GpuTexture) {
        texture.texture.destroy();
    }

    fn create_sampler(&self, label: &str) -> wgpu::Sampler {
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        })
    }

    fn create_bind_group(
        &self,
        label: &str,
        pipeline: &GpuPipeline,
        group: u32,
        entries: &[BindingResource<'_, Self>],
    ) -> wgpu::BindGroup {
        let entries: Vec<_> = entries
            .iter()
            .enumerate()
            .map(|(binding, entry)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: match entry {
                    BindingResource::Buffer(buffer) => buffer.as_entire_binding(),
                    BindingResource::Texture(texture) => {
                        wgpu::BindingResource::TextureView(&texture.view)
                    }
                    BindingResource::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                },
            })
            .collect();
        let layout = pipeline
            .bind_group_layouts
            .get(group as usize)
            .cloned()
            .unwrap_or_else(|| pipeline.pipeline.get_bind_group_layout(group));
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &entries,
        })
    }

    fn acquire_frame(&mut self) -> Result<GpuFrame> {
        let output = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            // Reconfigure the surface if it's lost or outdated, then try once more
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                match self.surface.get_current_texture() {
                    wgpu::CurrentSurfaceTexture::Success(output)
                    | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
                    e => return Err(RenderError::Surface(format!("{e:?}"))),
                }
            }
            e => return Err(RenderError::Surface(format!("{e:?}"))),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuFrame { output, view })
    }

    fn submit(
        &self,
        frame: &GpuFrame,
        pass: &PassDescriptor<'_, Self>,
        commands: &[DrawCommand<Self>],
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let (view, resolve_target) = match pass.color {
                Some(msaa) => (&msaa.view, Some(&frame.view)),
                None => (&frame.view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pass.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &pass.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pass.clear_depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for command in commands {
                match command {
                    DrawCommand::SetPipeline(pipeline) => render_pass.set_pipeline(&pipeline.pipeline),
                    DrawCommand::SetBindGroup(index, bind_group) => {
                        render_pass.set_bind_group(*index, bind_group, &[])
                    }
                    DrawCommand::SetVertexBuffer(buffer) => {
                        render_pass.set_vertex_buffer(0, buffer.slice(..))
                    }
                    DrawCommand::SetIndexBuffer(buffer, format) => {
                        render_pass.set_index_buffer(buffer.slice(..), *format)
                    }
                    DrawCommand::Draw(vertices) => render_pass.draw(vertices.clone(), 0..1),
                    DrawCommand::DrawIndexed(indices) => {
                        render_pass.draw_indexed(indices.clone(), 0, 0..1)
                    }
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn present(&self, frame: GpuFrame) {
        frame.output.present();
    }
}

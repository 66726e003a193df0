//! A `RenderDevice` that records instead of rendering, plus scene helpers.

#![allow(dead_code)]

use std::{
    cell::{Ref, RefCell},
    collections::{HashMap, HashSet},
    ops::Range,
};

use flow_scene::{
    cgmath::{Deg, Vector3},
    context::{
        BindingKind, BindingResource, BufferDescriptor, DepthConfig, DrawCommand,
        PassDescriptor, PipelineDescriptor, RenderDevice, TextureDescriptor,
    },
    data_structures::{
        camera::PerspectiveCamera,
        geometry::{Geometry, Indices},
        scene_graph::{NodeHandle, Scene},
        transform::Transform,
    },
    error::{RenderError, Result},
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

#[derive(Debug)]
pub struct MockPipeline {
    pub id: Handle,
    pub label: String,
    pub bind_groups: Vec<Vec<BindingKind>>,
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub depth: DepthConfig,
    pub sample_count: u32,
    pub vertex_stride: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetPipeline(String),
    SetBindGroup(u32, Handle),
    SetVertexBuffer(Handle),
    SetIndexBuffer(Handle, wgpu::IndexFormat),
    Draw(Range<u32>),
    DrawIndexed(Range<u32>),
}

#[derive(Clone, Debug)]
pub struct Submission {
    pub commands: Vec<Command>,
    pub color: Option<Handle>,
    pub depth: Handle,
    pub clear_color: wgpu::Color,
}

#[derive(Clone, Debug)]
pub struct TextureInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub sample_count: u32,
    pub format: wgpu::TextureFormat,
}

#[derive(Clone, Debug)]
pub struct BufferInfo {
    pub label: String,
    pub usage: wgpu::BufferUsages,
    /// Mirror of what the GPU buffer would hold.
    pub contents: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct BufferWrite {
    pub buffer: Handle,
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct DeviceLog {
    next_handle: u64,
    pub textures: HashMap<Handle, TextureInfo>,
    pub live_textures: HashSet<Handle>,
    pub buffers: HashMap<Handle, BufferInfo>,
    pub live_buffers: HashSet<Handle>,
    pub writes: Vec<BufferWrite>,
    pub pipelines_created: usize,
    pub bind_groups_created: usize,
    /// Textures referenced by each bind group.
    pub bind_group_textures: HashMap<Handle, Vec<Handle>>,
    pub frames_acquired: usize,
    pub frames_presented: usize,
    pub submissions: Vec<Submission>,
}

impl DeviceLog {
    fn handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }
}

pub struct RecordingDevice {
    pub size: (u32, u32),
    pub format: wgpu::TextureFormat,
    /// Makes every `create_pipeline` call fail.
    pub fail_pipelines: bool,
    log: RefCell<DeviceLog>,
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            fail_pipelines: false,
            log: RefCell::new(DeviceLog::default()),
        }
    }

    pub fn log(&self) -> Ref<'_, DeviceLog> {
        self.log.borrow()
    }

    pub fn buffer_contents(&self, buffer: Handle) -> Vec<u8> {
        self.log.borrow().buffers[&buffer].contents.clone()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.log.borrow().live_buffers.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.log.borrow().live_textures.len()
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.log.borrow().submissions.last().cloned()
    }
}

impl RenderDevice for RecordingDevice {
    type Buffer = Handle;
    type Texture = Handle;
    type Sampler = Handle;
    type BindGroup = Handle;
    type Pipeline = MockPipeline;
    type Frame = Handle;

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
        }
    }

    fn create_pipeline(&self, desc: &PipelineDescriptor<'_>) -> Result<MockPipeline> {
        if self.fail_pipelines {
            return Err(RenderError::PipelineCreation {
                label: desc.label.to_string(),
                message: "rejected by test device".into(),
            });
        }
        let mut log = self.log.borrow_mut();
        log.pipelines_created += 1;
        Ok(MockPipeline {
            id: log.handle(),
            label: desc.label.to_string(),
            bind_groups: desc.bind_groups.to_vec(),
            topology: desc.topology,
            cull_mode: desc.cull_mode,
            depth: desc.depth,
            sample_count: desc.sample_count,
            vertex_stride: desc.vertex_layout.stride(),
        })
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Handle {
        let mut log = self.log.borrow_mut();
        let handle = log.handle();
        let contents = match desc.contents {
            Some(contents) => contents.to_vec(),
            None => vec![0; desc.size as usize],
        };
        log.buffers.insert(
            handle,
            BufferInfo {
                label: desc.label.to_string(),
                usage: desc.usage,
                contents,
            },
        );
        log.live_buffers.insert(handle);
        handle
    }

    fn write_buffer(&self, buffer: &Handle, offset: u64, data: &[u8]) {
        let mut log = self.log.borrow_mut();
        assert!(log.live_buffers.contains(buffer), "write to destroyed buffer");
        let info = log.buffers.get_mut(buffer).expect("unknown buffer");
        let start = offset as usize;
        // wgpu::COPY_BUFFER_ALIGNMENT
        assert!(
            offset % 4 == 0 && data.len() % 4 == 0,
            "unaligned write of {} bytes at {start} into `{}`",
            data.len(),
            info.label
        );
        assert!(
            start + data.len() <= info.contents.len(),
            "write of {} bytes at {start} overflows `{}`",
            data.len(),
            info.label
        );
        info.contents[start..start + data.len()].copy_from_slice(data);
        log.writes.push(BufferWrite {
            buffer: *buffer,
            offset,
            len: data.len(),
        });
    }

    fn destroy_buffer(&self, buffer: &Handle) {
        let removed = self.log.borrow_mut().live_buffers.remove(buffer);
        assert!(removed, "buffer {buffer:?} destroyed twice");
    }

    fn create_texture(&self, desc: &TextureDescriptor<'_>) -> Handle {
        if let Some(data) = desc.data {
            assert_eq!(
                data.len(),
                (desc.width * desc.height * 4 * desc.layers) as usize,
                "texel data of `{}`",
                desc.label
            );
        }
        let mut log = self.log.borrow_mut();
        let handle = log.handle();
        log.textures.insert(
            handle,
            TextureInfo {
                label: desc.label.to_string(),
                width: desc.width,
                height: desc.height,
                layers: desc.layers,
                sample_count: desc.sample_count,
                format: desc.format,
            },
        );
        log.live_textures.insert(handle);
        handle
    }

    fn destroy_texture(&self, texture: &Handle) {
        let removed = self.log.borrow_mut().live_textures.remove(texture);
        assert!(removed, "texture {texture:?} destroyed twice");
    }

    fn create_sampler(&self, _label: &str) -> Handle {
        self.log.borrow_mut().handle()
    }

    fn create_bind_group(
        &self,
        _label: &str,
        pipeline: &MockPipeline,
        group: u32,
        entries: &[BindingResource<'_, Self>],
    ) -> Handle {
        let layout = &pipeline.bind_groups[group as usize];
        assert_eq!(layout.len(), entries.len(), "bind group {group} of `{}`", pipeline.label);
        let mut log = self.log.borrow_mut();
        let mut textures = Vec::new();
        for (kind, entry) in layout.iter().zip(entries) {
            match (kind, entry) {
                (BindingKind::Uniform, BindingResource::Buffer(b)) => {
                    assert!(log.live_buffers.contains(*b))
                }
                (BindingKind::Texture(_), BindingResource::Texture(t)) => {
                    assert!(log.live_textures.contains(*t));
                    textures.push(**t);
                }
                (BindingKind::Sampler, BindingResource::Sampler(_)) => {}
                _ => panic!("binding kinds of `{}` do not match", pipeline.label),
            }
        }
        log.bind_groups_created += 1;
        let handle = log.handle();
        log.bind_group_textures.insert(handle, textures);
        handle
    }

    fn acquire_frame(&mut self) -> Result<Handle> {
        let mut log = self.log.borrow_mut();
        log.frames_acquired += 1;
        Ok(log.handle())
    }

    fn submit(&self, _frame: &Handle, pass: &PassDescriptor<'_, Self>, commands: &[DrawCommand<Self>]) {
        {
            let log = self.log.borrow();
            for command in commands {
                match command {
                    DrawCommand::SetBindGroup(_, g) => {
                        for texture in &log.bind_group_textures[g] {
                            assert!(log.live_textures.contains(texture), "bound texture {texture:?} was destroyed");
                        }
                    }
                    // wgpu panics on empty buffer slices
                    DrawCommand::SetVertexBuffer(b) | DrawCommand::SetIndexBuffer(b, _) => {
                        assert!(log.live_buffers.contains(b), "bound buffer {b:?} was destroyed");
                        assert!(!log.buffers[b].contents.is_empty(), "empty buffer {b:?} bound");
                    }
                    _ => {}
                }
            }
        }
        let commands = commands
            .iter()
            .map(|command| match command {
                DrawCommand::SetPipeline(p) => Command::SetPipeline(p.label.clone()),
                DrawCommand::SetBindGroup(i, g) => Command::SetBindGroup(*i, *g),
                DrawCommand::SetVertexBuffer(b) => Command::SetVertexBuffer(*b),
                DrawCommand::SetIndexBuffer(b, f) => Command::SetIndexBuffer(*b, *f),
                DrawCommand::Draw(r) => Command::Draw(r.clone()),
                DrawCommand::DrawIndexed(r) => Command::DrawIndexed(r.clone()),
            })
            .collect();
        self.log.borrow_mut().submissions.push(Submission {
            commands,
            color: pass.color.copied(),
            depth: *pass.depth,
            clear_color: pass.clear_color,
        });
    }

    fn present(&self, _frame: Handle) {
        self.log.borrow_mut().frames_presented += 1;
    }
}

/// A scene with a camera at (0, 0, 5) looking down -Z.
pub fn scene_with_camera() -> (Scene, NodeHandle) {
    let mut scene = Scene::new();
    let camera = scene
        .spawn(
            scene.root(),
            "camera",
            PerspectiveCamera::new(Deg(60.0), 1.0, 0.1, 100.0),
        )
        .unwrap();
    scene
        .set_local_transform(camera, Transform::from_position(Vector3::new(0.0, 0.0, 5.0)))
        .unwrap();
    (scene, camera)
}

const TRIANGLE: [f32; 9] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
const NORMALS: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];

/// One triangle with positions and normals only.
pub fn triangle() -> Geometry {
    Geometry::new(TRIANGLE.to_vec(), NORMALS.to_vec())
}

pub fn textured_triangle() -> Geometry {
    triangle().with_uvs(vec![0.0, 1.0, 1.0, 1.0, 0.5, 0.0])
}

/// A quad of two indexed triangles in the XY plane.
pub fn quad() -> Geometry {
    Geometry::new(
        vec![
            -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0,
        ],
        [0.0, 0.0, 1.0].repeat(4),
    )
    .with_uvs(vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0])
    .with_indices(Indices::U16(vec![0, 1, 2, 0, 2, 3]))
}

mod common;

use std::sync::Arc;

use common::{RecordingDevice, init_logging, scene_with_camera, triangle};
use flow_scene::{
    Renderer, RendererConfig,
    data_structures::mesh::Mesh,
    error::RenderError,
    materials::{BasicMaterial, LineMaterial, SkyboxMaterial, pipeline_key},
    pipelines::{basic::PipelineSettings, cache::PipelineCache},
};

fn settings() -> PipelineSettings {
    PipelineSettings {
        color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
        depth_format: wgpu::TextureFormat::Depth32Float,
        sample_count: 4,
    }
}

#[test]
fn same_kind_and_topology_share_one_pipeline() {
    init_logging();
    let device = RecordingDevice::new(320, 240);
    let mut cache = PipelineCache::new(settings());

    let red = BasicMaterial::new([1.0, 0.0, 0.0, 1.0]);
    let blue = BasicMaterial::new([0.0, 0.0, 1.0, 1.0]);
    let a = cache.get_or_create(&device, &red).unwrap();
    let b = cache.get_or_create(&device, &blue).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
    assert_eq!(device.log().pipelines_created, 1);
}

#[test]
fn a_different_topology_gets_its_own_entry() {
    let device = RecordingDevice::new(320, 240);
    let mut cache = PipelineCache::new(settings());

    let triangles = BasicMaterial::default();
    let points = BasicMaterial::default().with_topology(wgpu::PrimitiveTopology::PointList);
    let a = cache.get_or_create(&device, &triangles).unwrap();
    let b = cache.get_or_create(&device, &points).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(cache.contains("basic_triangle-list"));
    assert!(cache.contains("basic_point-list"));
    assert_eq!(b.topology, wgpu::PrimitiveTopology::PointList);
    assert_eq!(b.cull_mode, None);

    let strip = LineMaterial::new([1.0; 4]).strip();
    assert_eq!(pipeline_key(&strip), "line_line-strip");
    cache.get_or_create(&device, &strip).unwrap();
    assert_eq!(cache.len(), 3);
}

#[test]
fn mesh_pipelines_write_depth_and_use_the_shared_settings() {
    let device = RecordingDevice::new(320, 240);
    let mut cache = PipelineCache::new(settings());
    let pipeline = cache.get_or_create(&device, &BasicMaterial::default()).unwrap();
    assert!(pipeline.depth.write_enabled);
    assert_eq!(pipeline.depth.compare, wgpu::CompareFunction::Less);
    assert_eq!(pipeline.depth.format, wgpu::TextureFormat::Depth32Float);
    assert_eq!(pipeline.sample_count, 4);
    // position only
    assert_eq!(pipeline.vertex_stride, 12);
}

#[test]
fn creation_failures_are_not_cached() {
    let mut device = RecordingDevice::new(320, 240);
    device.fail_pipelines = true;
    let mut cache = PipelineCache::new(settings());
    let err = cache.get_or_create(&device, &BasicMaterial::default()).unwrap_err();
    assert!(matches!(err, RenderError::PipelineCreation { label, .. } if label == "basic_triangle-list"));
    assert!(cache.is_empty());

    device.fail_pipelines = false;
    assert!(cache.get_or_create(&device, &BasicMaterial::default()).is_ok());
}

#[test]
fn clear_drops_every_entry() {
    let device = RecordingDevice::new(320, 240);
    let mut cache = PipelineCache::new(settings());
    cache.get_or_create(&device, &BasicMaterial::default()).unwrap();
    cache
        .get_or_create(&device, &SkyboxMaterial::new(Arc::new(
            flow_scene::data_structures::texture::Texture::solid_cube("sky", [0; 4]),
        )))
        .unwrap();
    assert_eq!(cache.len(), 2);
    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.get("basic_triangle-list").is_none());
}

#[test]
fn the_renderer_compiles_once_per_kind() {
    init_logging();
    let mut renderer = Renderer::new(RecordingDevice::new(320, 240), RendererConfig::default());
    let (mut scene, camera) = scene_with_camera();
    for i in 0..5 {
        let color = [i as f32 / 5.0, 0.0, 0.0, 1.0];
        scene
            .spawn(
                scene.root(),
                &format!("mesh {i}"),
                Mesh::new(triangle(), BasicMaterial::new(color)),
            )
            .unwrap();
    }
    renderer.render(&mut scene, camera).unwrap();
    renderer.render(&mut scene, camera).unwrap();
    assert_eq!(renderer.pipeline_cache().len(), 1);
    assert_eq!(renderer.device().log().pipelines_created, 1);
}

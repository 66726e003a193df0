mod common;

use std::sync::Arc;

use common::{Command, RecordingDevice, init_logging, scene_with_camera, triangle};
use flow_scene::{
    Renderer, RendererConfig,
    data_structures::{mesh::Mesh, texture::Texture},
    materials::{BasicMaterial, SkyboxMaterial},
};

fn renderer() -> Renderer<RecordingDevice> {
    init_logging();
    Renderer::new(RecordingDevice::new(800, 600), RendererConfig::default())
}

fn cube(label: &str) -> Arc<Texture> {
    Arc::new(Texture::solid_cube(label, [40, 80, 160, 255]))
}

#[test]
fn skybox_is_drawn_before_meshes() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    scene.set_skybox(Some(SkyboxMaterial::new(cube("sky"))));
    scene
        .spawn(scene.root(), "triangle", Mesh::new(triangle(), BasicMaterial::default()))
        .unwrap();

    let stats = renderer.render(&mut scene, camera).unwrap();
    assert!(stats.skybox_drawn);
    assert_eq!(stats.draw_calls, 2);

    let commands = renderer.device().last_submission().unwrap().commands;
    assert_eq!(commands[0], Command::SetPipeline("skybox_triangle-list".into()));
    assert_eq!(commands[2], Command::Draw(0..3));
    assert_eq!(commands[3], Command::SetPipeline("basic_triangle-list".into()));
}

#[test]
fn skybox_pipeline_never_writes_depth() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    scene.set_skybox(Some(SkyboxMaterial::new(cube("sky"))));
    renderer.render(&mut scene, camera).unwrap();

    let sky = renderer.skybox_resources().unwrap();
    assert!(!sky.pipeline.depth.write_enabled);
    assert_eq!(sky.pipeline.depth.compare, wgpu::CompareFunction::LessEqual);
    assert!(sky.pipeline.vertex_stride == 0);
    // kept out of the mesh pipeline cache
    assert!(renderer.pipeline_cache().is_empty());
}

#[test]
fn unchanged_revision_reuses_everything() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    scene.set_skybox(Some(SkyboxMaterial::new(cube("sky"))));

    renderer.render(&mut scene, camera).unwrap();
    let (bind_group, uniform) = {
        let sky = renderer.skybox_resources().unwrap();
        (sky.bind_group, sky.uniform_buffer)
    };
    let pipeline = renderer.skybox_resources().unwrap().pipeline.clone();

    renderer.render(&mut scene, camera).unwrap();
    let sky = renderer.skybox_resources().unwrap();
    assert_eq!(sky.bind_group, bind_group);
    assert_eq!(sky.uniform_buffer, uniform);
    assert!(Arc::ptr_eq(&sky.pipeline, &pipeline));
}

#[test]
fn new_revision_rebuilds_only_the_bind_group() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    scene.set_skybox(Some(SkyboxMaterial::new(cube("day"))));

    renderer.render(&mut scene, camera).unwrap();
    let (bind_group, uniform) = {
        let sky = renderer.skybox_resources().unwrap();
        (sky.bind_group, sky.uniform_buffer)
    };
    let pipeline = renderer.skybox_resources().unwrap().pipeline.clone();

    scene
        .skybox_mut()
        .unwrap()
        .set_cube_map(Some(cube("night")));
    renderer.render(&mut scene, camera).unwrap();

    let sky = renderer.skybox_resources().unwrap();
    assert_ne!(sky.bind_group, bind_group);
    assert_eq!(sky.binding_revision, 1);
    assert_eq!(sky.uniform_buffer, uniform);
    assert!(Arc::ptr_eq(&sky.pipeline, &pipeline));
    assert_eq!(renderer.device().log().pipelines_created, 1);
}

#[test]
fn a_new_material_rebuilds_everything() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    scene.set_skybox(Some(SkyboxMaterial::new(cube("a"))));
    renderer.render(&mut scene, camera).unwrap();
    let uniform = renderer.skybox_resources().unwrap().uniform_buffer;
    let pipeline = renderer.skybox_resources().unwrap().pipeline.clone();

    scene.set_skybox(Some(SkyboxMaterial::new(cube("b"))));
    renderer.render(&mut scene, camera).unwrap();

    let sky = renderer.skybox_resources().unwrap();
    assert_ne!(sky.uniform_buffer, uniform);
    assert!(!Arc::ptr_eq(&sky.pipeline, &pipeline));
    assert!(!renderer.device().log().live_buffers.contains(&uniform));
}

#[test]
fn removing_the_skybox_releases_it() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    scene.set_skybox(Some(SkyboxMaterial::new(cube("sky"))));
    renderer.render(&mut scene, camera).unwrap();
    assert_eq!(renderer.device().live_buffer_count(), 1);

    scene.set_skybox(None);
    let stats = renderer.render(&mut scene, camera).unwrap();
    assert!(!stats.skybox_drawn);
    assert!(renderer.skybox_resources().is_none());
    assert_eq!(renderer.device().live_buffer_count(), 0);
}

#[test]
fn intensity_is_uploaded_after_the_matrix() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    let mut sky = SkyboxMaterial::new(cube("sky"));
    sky.intensity = 0.5;
    scene.set_skybox(Some(sky));
    renderer.render(&mut scene, camera).unwrap();

    let uniform = renderer.skybox_resources().unwrap().uniform_buffer;
    let contents = renderer.device().buffer_contents(uniform);
    assert_eq!(contents.len(), 80);
    assert_eq!(&contents[64..68], &0.5f32.to_le_bytes());
}

#[test]
fn clones_of_one_material_are_told_apart() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    let base = SkyboxMaterial::new(cube("base"));
    let (day_map, night_map) = (cube("day"), cube("night"));
    let mut day = base.clone();
    day.set_cube_map(Some(day_map.clone()));
    let mut night = base.clone();
    night.set_cube_map(Some(night_map.clone()));
    assert_eq!(day.binding_revision(), night.binding_revision());

    scene.set_skybox(Some(day));
    renderer.render(&mut scene, camera).unwrap();
    let bind_group = renderer.skybox_resources().unwrap().bind_group;

    scene.set_skybox(Some(night));
    renderer.render(&mut scene, camera).unwrap();
    let sky = renderer.skybox_resources().unwrap();
    assert_ne!(sky.bind_group, bind_group);
    assert!(renderer.textures().contains(night_map.id()));
    assert!(!renderer.textures().contains(day_map.id()));
}

#[test]
fn swapped_out_cube_maps_are_released() {
    let mut renderer = renderer();
    let (mut scene, camera) = scene_with_camera();
    scene.set_skybox(Some(SkyboxMaterial::new(cube("sky 0"))));
    renderer.render(&mut scene, camera).unwrap();
    let baseline = renderer.device().live_texture_count();

    for i in 1..50 {
        scene
            .skybox_mut()
            .unwrap()
            .set_cube_map(Some(cube(&format!("sky {i}"))));
        renderer.render(&mut scene, camera).unwrap();
    }
    assert_eq!(renderer.textures().len(), 1);
    assert_eq!(renderer.device().live_texture_count(), baseline);

    scene.set_skybox(None);
    renderer.render(&mut scene, camera).unwrap();
    assert!(renderer.textures().is_empty());
    assert_eq!(renderer.device().live_texture_count(), baseline - 1);
}

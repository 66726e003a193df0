//! flow-scene
//!
//! A retained-mode 3D scene renderer on top of wgpu. Scenes are trees of
//! transform nodes holding drawables, lights and cameras; the renderer turns
//! one scene plus one camera into one submitted frame, reusing pipelines and
//! per-drawable GPU resources across frames.
//!
//! High-level modules
//! - `context`: the graphics device boundary and its wgpu implementation
//! - `data_structures`: transforms, the scene graph, geometry, meshes, lights, cameras, textures
//! - `error`: the crate error type
//! - `materials`: the material contract and the built-in shading techniques
//! - `pipelines`: pipeline construction and the per-kind pipeline cache
//! - `render`: render targets, the skybox and mesh passes and the `Renderer`
//! - `resources`: texture loading and the GPU resource caches
//!

pub mod context;
pub mod data_structures;
pub mod error;
pub mod materials;
pub mod pipelines;
pub mod render;
pub mod resources;

pub use cgmath;
pub use error::{RenderError, Result};
pub use render::{FrameStats, Renderer, RendererConfig};

//! Engine data structures: scene graph, drawables, geometry and textures.
//!
//! - `transform` holds the position / rotation / scale triple of a node
//! - `scene_graph` is the node arena with hierarchical world matrices
//! - `mesh` pairs a geometry with a material
//! - `geometry` holds de-interleaved vertex streams and vertex layouts
//! - `texture` contains CPU-side texel data awaiting upload
//! - `light` and `camera` are the node payloads besides meshes
//! - `ray` implements the intersection tests behind scene raycasts

pub mod camera;
pub mod geometry;
pub mod light;
pub mod mesh;
pub mod ray;
pub mod scene_graph;
pub mod texture;
pub mod transform;

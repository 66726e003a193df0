//! Perspective camera and the per-frame view it produces.

use cgmath::{EuclideanSpace, Matrix4, Point3, Rad, SquareMatrix, perspective};

/// cgmath builds OpenGL clip space (z in -1..1); wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Perspective projection parameters. The camera's placement comes from the
/// scene node it is attached to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y: Rad<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    /// When set, the renderer replaces `aspect` with the render target's aspect ratio.
    pub auto_aspect: bool,
}

impl PerspectiveCamera {
    pub fn new<F: Into<Rad<f32>>>(fov_y: F, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self {
            fov_y: fov_y.into(),
            aspect,
            znear,
            zfar,
            auto_aspect: true,
        }
    }

    pub fn with_fixed_aspect(mut self) -> Self {
        self.auto_aspect = false;
        self
    }

    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fov_y, aspect, self.znear, self.zfar)
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(cgmath::Deg(45.0), 1.0, 0.1, 500.0)
    }
}

/// Matrices of the active camera for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub position: Point3<f32>,
}

impl CameraView {
    /// Derives the view from the camera node's world matrix.
    pub fn new(camera: &PerspectiveCamera, world_matrix: Matrix4<f32>, target_aspect: f32) -> Self {
        let aspect = if camera.auto_aspect {
            target_aspect
        } else {
            camera.aspect
        };
        let view = world_matrix.invert().unwrap_or_else(Matrix4::identity);
        let position = Point3::from_vec(world_matrix.w.truncate());
        Self {
            view,
            projection: camera.projection_matrix(aspect),
            position,
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }
}

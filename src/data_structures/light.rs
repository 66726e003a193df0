//! Light sources.
//!
//! A [`Light`] lives on a scene node; the node's world matrix supplies its
//! position. During traversal the renderer resolves every visible light into
//! a [`LightInfo`] with world-space position and direction, which is what
//! materials read when packing their uniforms.

use cgmath::{InnerSpace, Point3, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Constant contribution from every direction.
    Ambient,
    /// Parallel rays shining from the light's position towards the world origin.
    Directional,
    /// Omnidirectional light with distance falloff.
    Point { range: f32, decay: f32 },
}

impl LightKind {
    /// Numeric tag shared with the shaders.
    pub fn type_id(&self) -> f32 {
        match self {
            LightKind::Ambient => 0.0,
            LightKind::Directional => 1.0,
            LightKind::Point { .. } => 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl Light {
    pub fn ambient(color: Vector3<f32>, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
        }
    }

    pub fn directional(color: Vector3<f32>, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
        }
    }

    /// `range` of zero means no cutoff.
    pub fn point(color: Vector3<f32>, intensity: f32, range: f32, decay: f32) -> Self {
        Self {
            kind: LightKind::Point { range, decay },
            color,
            intensity,
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, LightKind::Ambient)
    }
}

/// A light resolved to world space for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightInfo {
    pub light: Light,
    pub position: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl LightInfo {
    pub fn new(light: Light, position: Point3<f32>) -> Self {
        let to_origin = Point3::new(0.0, 0.0, 0.0) - position;
        let direction = if to_origin.magnitude2() > f32::EPSILON {
            to_origin.normalize()
        } else {
            Vector3::new(0.0, -1.0, 0.0)
        };
        Self {
            light,
            position,
            direction,
        }
    }

    pub fn is_ambient(&self) -> bool {
        self.light.is_ambient()
    }
}

//! Rays and ray intersection tests.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Transform, Vector3};

use crate::data_structures::geometry::BoundingBox;

const EPSILON: f32 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

/// Where a ray met a triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Ray parameter; equals the travelled distance for a normalized direction.
    pub distance: f32,
    pub point: Point3<f32>,
    /// Unit normal of the triangle's front face (counter-clockwise winding).
    pub normal: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Moves the ray into another space. The direction is not renormalized, so
    /// ray parameters stay comparable between both spaces.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        Self {
            origin: matrix.transform_point(self.origin),
            direction: matrix.transform_vector(self.direction),
        }
    }

    /// Möller–Trumbore intersection. Both faces count as hits; hits behind the
    /// origin and rays parallel to the triangle's plane do not.
    pub fn intersect_triangle(
        &self,
        a: Point3<f32>,
        b: Point3<f32>,
        c: Point3<f32>,
    ) -> Option<TriangleHit> {
        let edge1 = b - a;
        let edge2 = c - a;
        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = self.origin - a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = self.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(qvec) * inv_det;
        if t <= EPSILON {
            return None;
        }

        Some(TriangleHit {
            distance: t,
            point: self.at(t),
            normal: edge1.cross(edge2).normalize(),
        })
    }

    /// Slab test; returns the entry parameter (zero when the origin is inside).
    pub fn intersect_box(&self, bbox: &BoundingBox) -> Option<f32> {
        let origin = self.origin.to_vec();
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let (o, d, lo, hi) = (origin[axis], self.direction[axis], bbox.min[axis], bbox.max[axis]);
            if d.abs() < EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = {
                let t0 = (lo - o) * inv;
                let t1 = (hi - o) * inv;
                if t0 <= t1 { (t0, t1) } else { (t1, t0) }
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> (Point3<f32>, Point3<f32>, Point3<f32>) {
        (
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn ray_hits_triangle_head_on() {
        let (a, b, c) = triangle();
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = ray.intersect_triangle(a, b, c).expect("hit");
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!(hit.point.x.abs() < 1e-5 && hit.point.y.abs() < 1e-5 && hit.point.z.abs() < 1e-5);
        assert!(hit.normal.z > 0.0);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let (a, b, c) = triangle();
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(ray.intersect_triangle(a, b, c), None);
    }

    #[test]
    fn parallel_ray_misses() {
        let (a, b, c) = triangle();
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(ray.intersect_triangle(a, b, c), None);
    }

    #[test]
    fn ray_outside_triangle_misses() {
        let (a, b, c) = triangle();
        let ray = Ray::new(Point3::new(3.0, 3.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.intersect_triangle(a, b, c), None);
    }

    #[test]
    fn box_entry_distance() {
        let bbox = BoundingBox {
            min: Point3::new(-1.0, -1.0, -1.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.intersect_box(&bbox), Some(4.0));

        let inside = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(inside.intersect_box(&bbox), Some(0.0));

        let miss = Ray::new(Point3::new(3.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(miss.intersect_box(&bbox), None);
    }
}

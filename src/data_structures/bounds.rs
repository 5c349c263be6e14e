//! Axis-aligned bounding boxes.

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

/// Minimal axis-aligned box. An empty box has `min > max` on every axis and
/// becomes valid after the first point is added.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    pub fn extend(&mut self, point: Point3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Midpoint of the box. The origin for an empty box.
    pub fn center(&self) -> Point3<f32> {
        if self.is_empty() {
            return Point3::origin();
        }
        self.min.midpoint(self.max)
    }

    pub fn extent(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }

    /// Length of the box diagonal.
    pub fn size(&self) -> f32 {
        self.extent().magnitude()
    }

    pub fn translated(&self, offset: Vector3<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb::new(self.min + offset, self.max + offset)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

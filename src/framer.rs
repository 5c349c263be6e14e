//! Automatic framing of a freshly loaded model.
//!
//! The model is moved so its world-space bounding box is centered on the
//! origin, and a camera is placed at a fixed offset proportional to the box
//! diagonal. Clip planes scale with the same size so small and huge assets
//! render alike.

use cgmath::{Deg, EuclideanSpace, Point3, Vector3};

use crate::{
    camera::{CameraState, Viewport},
    data_structures::{bounds::Aabb, scene_graph::Model},
};

/// Sizes below this (and non-finite sizes) are treated as this value.
pub const MIN_FRAMING_SIZE: f32 = 1e-6;

/// Camera position as multiples of the model size.
pub const CAMERA_OFFSET: [f32; 3] = [-0.2, 0.4, 3.5];

const NEAR_DIVISOR: f32 = 100.0;
const FAR_FACTOR: f32 = 100.0;

/// What `frame` measured and the camera it produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Framing {
    /// Center of the world bounds before recentering.
    pub original_center: Point3<f32>,
    /// World bounds after recentering.
    pub bounds: Aabb,
    /// Clamped bounding box diagonal.
    pub size: f32,
    pub camera: CameraState,
}

/// Recenter `model` on the origin and compute a camera that shows all of it.
///
/// The model's root transform is shifted by the negated bounds center, so the
/// world bounds are centered on the origin afterwards whatever transform the
/// root already had.
pub fn frame(model: &mut Model, viewport: Viewport, fov_y: Deg<f32>) -> Framing {
    let bounds = model.world_bounds();
    let center = bounds.center();
    let size = framing_size(&bounds);

    model.root.transform.position -= center.to_vec();
    let bounds = bounds.translated(-center.to_vec());

    log::debug!(
        "Framed {}: center {:?}, size {}",
        model.source,
        center,
        size
    );

    Framing {
        original_center: center,
        bounds,
        size,
        camera: camera_for_size(size, viewport, fov_y),
    }
}

/// Diagonal of `bounds`, clamped away from zero.
pub fn framing_size(bounds: &Aabb) -> f32 {
    let size = bounds.size();
    if size.is_finite() && size >= MIN_FRAMING_SIZE {
        size
    } else {
        MIN_FRAMING_SIZE
    }
}

/// Near and far planes for a model of the given size.
pub fn clip_planes(size: f32) -> (f32, f32) {
    (size / NEAR_DIVISOR, size * FAR_FACTOR)
}

/// A camera looking at the origin from the standard offset.
pub fn camera_for_size(size: f32, viewport: Viewport, fov_y: Deg<f32>) -> CameraState {
    let (near, far) = clip_planes(size);
    let offset = Vector3::from(CAMERA_OFFSET) * size;
    CameraState {
        position: Point3::origin() + offset,
        target: Point3::origin(),
        up: Vector3::unit_y(),
        fov_y,
        near,
        far,
        aspect: viewport.aspect().unwrap_or(1.0),
    }
}

use approx::assert_abs_diff_eq;
use cgmath::{Deg, Quaternion, Rotation3, Vector3};
use swatch_viewer::{
    camera::Viewport,
    data_structures::{
        instance::Instance,
        scene_graph::{Model, SceneNode},
    },
    framer::{self, MIN_FRAMING_SIZE},
};

use crate::common::test_utils::{VIEWPORT, box_geometry, mesh_node, unit_cube_model};

mod common;

const FOV: Deg<f32> = Deg(20.0);

#[test]
fn frames_the_unit_cube() {
    let mut model = unit_cube_model();
    let framing = framer::frame(&mut model, VIEWPORT, FOV);

    let size = 12f32.sqrt();
    assert_abs_diff_eq!(framing.size, size, epsilon = 1e-4);
    assert_abs_diff_eq!(framing.size, 3.46, epsilon = 0.01);
    assert_abs_diff_eq!(framing.camera.near, 0.0346, epsilon = 1e-4);
    assert_abs_diff_eq!(framing.camera.far, 346.41, epsilon = 0.01);

    let camera = &framing.camera;
    assert_abs_diff_eq!(camera.position.x, -0.2 * size, epsilon = 1e-4);
    assert_abs_diff_eq!(camera.position.y, 0.4 * size, epsilon = 1e-4);
    assert_abs_diff_eq!(camera.position.z, 3.5 * size, epsilon = 1e-4);
    assert_eq!(camera.target, cgmath::Point3::new(0.0, 0.0, 0.0));
    assert_abs_diff_eq!(camera.aspect, 1280.0 / 720.0, epsilon = 1e-6);
}

#[test]
fn recenters_an_offset_model() {
    let cube = mesh_node("cube", box_geometry([10.0, 4.0, -8.0], [12.0, 6.0, -2.0]));
    let mut model = Model::new("offset.glb", SceneNode::group("Scene", vec![cube]));

    let framing = framer::frame(&mut model, VIEWPORT, FOV);
    assert_abs_diff_eq!(framing.original_center.x, 11.0, epsilon = 1e-5);
    assert_abs_diff_eq!(framing.original_center.y, 5.0, epsilon = 1e-5);
    assert_abs_diff_eq!(framing.original_center.z, -5.0, epsilon = 1e-5);

    let center = model.world_bounds().center();
    assert_abs_diff_eq!(center.x, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(center.y, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(center.z, 0.0, epsilon = 1e-5);
    assert_eq!(framing.bounds, model.world_bounds());
}

#[test]
fn recenters_through_nested_transforms() {
    let rotated = mesh_node("panel", box_geometry([0.0; 3], [2.0, 1.0, 0.5])).with_transform(Instance {
        position: Vector3::new(3.0, 0.0, 0.0),
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        scale: Vector3::new(2.0, 2.0, 2.0),
    });
    let group = SceneNode::group("Torso", vec![rotated])
        .with_transform(Instance::from(Vector3::new(0.0, 100.0, 0.0)));
    let root = SceneNode::group("Scene", vec![group])
        .with_transform(Instance::from(Vector3::new(-7.0, 0.0, 2.0)));
    let mut model = Model::new("nested.glb", root);

    framer::frame(&mut model, VIEWPORT, FOV);

    let center = model.world_bounds().center();
    assert_abs_diff_eq!(center.x, 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(center.y, 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(center.z, 0.0, epsilon = 1e-4);
}

#[test]
fn clip_planes_bracket_the_model_at_any_scale() {
    for scale in [0.001f32, 0.5, 1.0, 250.0, 10_000.0] {
        let mut model = Model::new(
            "scaled.glb",
            SceneNode::group("Scene", vec![mesh_node("m", box_geometry([0.0; 3], [scale; 3]))]),
        );
        let framing = framer::frame(&mut model, VIEWPORT, FOV);
        let camera = framing.camera;
        assert!(camera.near > 0.0, "near must be positive at scale {scale}");
        assert!(camera.near < framing.size, "near < size at scale {scale}");
        assert!(framing.size < camera.far, "size < far at scale {scale}");
    }
}

#[test]
fn degenerate_models_are_clamped() {
    let point = mesh_node("dot", box_geometry([2.0; 3], [2.0; 3]));
    let mut single_point = Model::new("dot.glb", SceneNode::group("Scene", vec![point]));
    let mut no_meshes = Model::new(
        "empty.glb",
        SceneNode::group("Scene", vec![SceneNode::empty("Camera")]),
    );

    for model in [&mut single_point, &mut no_meshes] {
        let framing = framer::frame(model, VIEWPORT, FOV);
        assert_eq!(framing.size, MIN_FRAMING_SIZE);
        assert!(framing.camera.near > 0.0);
        assert!(framing.camera.far > framing.camera.near);
        assert!(framing.camera.position.x.is_finite());
    }

    let center = single_point.world_bounds().center();
    assert_abs_diff_eq!(center.x, 0.0, epsilon = 1e-6);
}

#[test]
fn resize_only_changes_aspect() {
    let mut model = unit_cube_model();
    let mut camera = framer::frame(&mut model, VIEWPORT, FOV).camera;
    let before = camera.clone();

    camera.resize(Viewport::new(600, 600));
    assert_eq!(camera.aspect, 1.0);
    assert_eq!(camera.position, before.position);
    assert_eq!(camera.target, before.target);
    assert_eq!(camera.near, before.near);
    assert_eq!(camera.far, before.far);
    assert_eq!(camera.fov_y, before.fov_y);
}

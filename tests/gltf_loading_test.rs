use approx::assert_abs_diff_eq;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures::executor::block_on;
use swatch_viewer::{
    data_structures::{material::Tint, scene_graph::NodeKind},
    resources::load_model_gltf,
};

use crate::common::test_utils::{MemorySource, garment_gltf_json, glb_bytes, triangle_bin};

mod common;

fn glb_source() -> MemorySource {
    MemorySource::new().with_file(
        "garment.glb",
        glb_bytes(&garment_gltf_json(None), &triangle_bin()),
    )
}

fn separate_source() -> MemorySource {
    MemorySource::new()
        .with_file(
            "dresses/garment.gltf",
            garment_gltf_json(Some("garment.bin")).into_bytes(),
        )
        .with_file("dresses/garment.bin", triangle_bin())
}

#[test]
fn loads_binary_gltf() {
    let model = block_on(load_model_gltf(&glb_source(), "garment.glb")).unwrap();

    assert_eq!(model.source, "garment.glb");
    assert_eq!(model.root.name, "Scene");
    assert!(matches!(model.root.kind, NodeKind::Group));
    assert_eq!(model.mesh_names(), vec!["body", "sleeve"]);
}

#[test]
fn loads_gltf_with_external_buffer() {
    let model = block_on(load_model_gltf(&separate_source(), "dresses/garment.gltf")).unwrap();
    assert_eq!(model.mesh_names(), vec!["body", "sleeve"]);
}

#[test]
fn keeps_node_kinds_and_hierarchy() {
    let model = block_on(load_model_gltf(&glb_source(), "garment.glb")).unwrap();

    let root = &model.root.children[0];
    assert_eq!(root.name, "Root");
    assert!(matches!(root.kind, NodeKind::Group));
    assert_eq!(root.children.len(), 3);

    let camera = &root.children[2];
    assert_eq!(camera.name, "Camera");
    assert!(matches!(camera.kind, NodeKind::Empty));
    assert!(camera.as_mesh().is_none());
}

#[test]
fn reads_material_and_uvs() {
    let model = block_on(load_model_gltf(&glb_source(), "garment.glb")).unwrap();

    for (_, mesh, _) in model.meshes() {
        let material = mesh.material();
        assert_eq!(material.name(), "Fabric");
        assert_eq!(material.tint(), Tint::new(255, 0, 0));
        assert!(material.texture().is_none());

        let uvs = mesh
            .geometry
            .vertices
            .iter()
            .map(|v| v.tex_coords)
            .collect::<Vec<_>>();
        assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(mesh.geometry.indices, vec![0, 1, 2]);
    }
}

#[test]
fn world_bounds_follow_node_transforms() {
    let model = block_on(load_model_gltf(&glb_source(), "garment.glb")).unwrap();
    let bounds = model.world_bounds();

    assert_abs_diff_eq!(bounds.min.x, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(bounds.min.y, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(bounds.min.z, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(bounds.max.x, 3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(bounds.max.y, 3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(bounds.max.z, 0.0, epsilon = 1e-6);
}

#[test]
fn missing_asset_is_an_error() {
    let result = block_on(load_model_gltf(&MemorySource::new(), "absent.glb"));
    assert!(result.is_err());

    let no_buffer = MemorySource::new().with_file(
        "garment.gltf",
        garment_gltf_json(Some("garment.bin")).into_bytes(),
    );
    let err = block_on(load_model_gltf(&no_buffer, "garment.gltf")).unwrap_err();
    assert!(format!("{err:#}").contains("garment.bin"));
}

#[test]
fn loads_embedded_base64_buffers() {
    let uri = format!(
        "data:application/octet-stream;base64,{}",
        BASE64.encode(triangle_bin())
    );
    let source = MemorySource::new().with_file("inline.gltf", garment_gltf_json(Some(&uri)).into_bytes());

    let model = block_on(load_model_gltf(&source, "inline.gltf")).unwrap();
    assert_eq!(model.mesh_names(), vec!["body", "sleeve"]);
    assert_abs_diff_eq!(model.world_bounds().max.y, 3.0, epsilon = 1e-6);
}

#[test]
fn unsupported_or_short_buffers_are_errors() {
    let percent_encoded = MemorySource::new().with_file(
        "inline.gltf",
        garment_gltf_json(Some("data:application/octet-stream,%00%01")).into_bytes(),
    );
    let err = block_on(load_model_gltf(&percent_encoded, "inline.gltf")).unwrap_err();
    assert!(format!("{err:#}").contains("only base64"));

    let short = MemorySource::new()
        .with_file("garment.gltf", garment_gltf_json(Some("garment.bin")).into_bytes())
        .with_file("garment.bin", triangle_bin()[..40].to_vec());
    let err = block_on(load_model_gltf(&short, "garment.gltf")).unwrap_err();
    assert!(err.to_string().contains("40 bytes"));
}

#[test]
fn garbage_bytes_fail_to_parse() {
    let source = MemorySource::new().with_file("broken.glb", b"definitely not gltf".to_vec());
    let err = block_on(load_model_gltf(&source, "broken.glb")).unwrap_err();
    assert!(format!("{err:#}").contains("broken.glb"));
}

use std::{cell::RefCell, collections::HashMap, io::Cursor, rc::Rc};

use anyhow::anyhow;
use swatch_viewer::{
    camera::Viewport,
    config::ViewerConfig,
    data_structures::{
        instance::Instance,
        material::{Material, Tint},
        model::MeshGeometry,
        scene_graph::{Mesh, Model, SceneNode},
    },
    resources::{AssetSource, BytesFuture},
    session::{Selection, SelectionStore, SessionBridge},
    viewer::ViewerState,
};

pub const VIEWPORT: Viewport = Viewport {
    width: 1280,
    height: 720,
};

/// The 12 triangles of an axis-aligned box from `min` to `max`.
pub fn box_geometry(min: [f32; 3], max: [f32; 3]) -> MeshGeometry {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let corners = [
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    let faces: [[usize; 4]; 6] = [
        [0, 1, 2, 3],
        [5, 4, 7, 6],
        [4, 0, 3, 7],
        [1, 5, 6, 2],
        [3, 2, 6, 7],
        [4, 5, 1, 0],
    ];
    let positions = faces
        .iter()
        .flat_map(|[a, b, c, d]| [*a, *b, *c, *a, *c, *d])
        .map(|idx| corners[idx])
        .collect::<Vec<_>>();
    MeshGeometry::from_positions(&positions)
}

pub fn triangle_geometry() -> MeshGeometry {
    MeshGeometry::from_positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
}

pub fn mesh_node(name: &str, geometry: MeshGeometry) -> SceneNode {
    SceneNode::mesh(name, Mesh::new(geometry, Material::new(name, Tint::WHITE)))
}

/// The box from (-1,-1,-1) to (1,1,1) as a single mesh named `cube`.
pub fn unit_cube_model() -> Model {
    let root = SceneNode::group(
        "Scene",
        vec![mesh_node("cube", box_geometry([-1.0; 3], [1.0; 3]))],
    );
    Model::new("cube.glb", root)
}

/// A group of triangle meshes with the given names plus one empty node.
pub fn garment_model(source: &str, mesh_names: &[&str]) -> Model {
    let mut children = mesh_names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            mesh_node(name, triangle_geometry())
                .with_transform(Instance::from(cgmath::Vector3::new(idx as f32, 0.0, 0.0)))
        })
        .collect::<Vec<_>>();
    children.push(SceneNode::empty("Light"));
    Model::new(source, SceneNode::group("Scene", children))
}

/// Asset bytes held in memory, keyed by path.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn load(&self, path: &str) -> BytesFuture {
        let result = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("{path} not found"));
        Box::pin(async move { result })
    }
}

/// A store whose contents stay inspectable after it has been boxed.
#[derive(Clone, Default)]
pub struct SharedStore {
    pub values: Rc<RefCell<HashMap<String, String>>>,
}

impl SharedStore {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (key, value) in entries {
            store
                .values
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl SelectionStore for SharedStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A store that fails every read and write, like storage disabled by the browser.
pub struct FailingStore;

impl SelectionStore for FailingStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Err(anyhow!("storage disabled while reading {key}"))
    }

    fn write(&mut self, key: &str, _value: &str) -> anyhow::Result<()> {
        Err(anyhow!("storage disabled while writing {key}"))
    }
}

pub fn test_config() -> ViewerConfig {
    ViewerConfig {
        default_model: "a.glb".to_string(),
        default_texture: "1.png".to_string(),
        models: vec!["a.glb".to_string(), "b.glb".to_string()],
        textures: vec!["1.png".to_string(), "2.png".to_string()],
        ..Default::default()
    }
}

pub fn bridge(config: &ViewerConfig, store: impl SelectionStore + 'static) -> SessionBridge {
    SessionBridge::new(Box::new(store), Selection::defaults(config))
}

pub fn viewer_with(source: MemorySource, store: SharedStore) -> ViewerState {
    let config = test_config();
    let session = bridge(&config, store);
    ViewerState::new(config, Rc::new(source), session, VIEWPORT)
}

pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encoding a png in memory");
    bytes.into_inner()
}

/// One indexed triangle: positions (0,0,0) (1,0,0) (0,2,0), uvs, u16 indices.
pub fn triangle_bin() -> Vec<u8> {
    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    bin
}

/// A scene `Scene` with a `Root` node lifted by one unit holding two meshes
/// (`body` at the origin, `sleeve` two units along x) and an empty `Camera`.
/// `buffer_uri` of `None` means the buffer lives in a GLB binary chunk.
pub fn garment_gltf_json(buffer_uri: Option<&str>) -> String {
    let uri = buffer_uri
        .map(|uri| format!(r#""uri": "{uri}","#))
        .unwrap_or_default();
    format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "name": "Scene", "nodes": [0] }}],
  "nodes": [
    {{ "name": "Root", "translation": [0.0, 1.0, 0.0], "children": [1, 2, 3] }},
    {{ "name": "body", "mesh": 0 }},
    {{ "name": "sleeve", "mesh": 0, "translation": [2.0, 0.0, 0.0] }},
    {{ "name": "Camera" }}
  ],
  "meshes": [{{
    "name": "Triangle",
    "primitives": [{{ "attributes": {{ "POSITION": 0, "TEXCOORD_0": 1 }}, "indices": 2, "material": 0 }}]
  }}],
  "materials": [{{ "name": "Fabric", "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }} }}],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 2.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" }},
    {{ "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 24 }},
    {{ "buffer": 0, "byteOffset": 60, "byteLength": 6 }}
  ],
  "buffers": [{{ {uri} "byteLength": 66 }}]
}}"#
    )
}

/// Pack a JSON document and a binary buffer into a GLB container.
pub fn glb_bytes(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

/// A source serving the garment both as `a.glb` and `b.glb`, plus two swatches.
pub fn garment_source() -> MemorySource {
    let glb = glb_bytes(&garment_gltf_json(None), &triangle_bin());
    MemorySource::new()
        .with_file("a.glb", glb.clone())
        .with_file("b.glb", glb)
        .with_file("1.png", png_bytes(2, 2, [255, 0, 0, 255]))
        .with_file("2.png", png_bytes(4, 4, [0, 0, 255, 255]))
}

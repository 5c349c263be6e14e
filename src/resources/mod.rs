use std::{future::Future, pin::Pin};

use anyhow::{Context as _, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::data_structures::{
    instance::Instance,
    material::{Material, Tint},
    model::{MeshGeometry, ModelVertex},
    scene_graph::{Mesh, Model, SceneNode},
};

/**
 * This module contains all logic for loading models and textures from external files.
 */
pub mod texture;

pub type BytesFuture = Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>>>>;

/// Where asset bytes come from. Paths are relative to the source's root.
pub trait AssetSource {
    fn load(&self, path: &str) -> BytesFuture;
}

/// Reads assets from a directory on disk.
#[cfg(not(target_arch = "wasm32"))]
pub struct DirectorySource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl DirectorySource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for DirectorySource {
    fn load(&self, path: &str) -> BytesFuture {
        let path = self.root.join(path);
        Box::pin(async move {
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
        })
    }
}

/// Fetches assets relative to the page origin.
#[cfg(target_arch = "wasm32")]
pub struct HttpSource {
    base: reqwest::Url,
}

#[cfg(target_arch = "wasm32")]
impl HttpSource {
    pub fn from_location(asset_root: &str) -> anyhow::Result<Self> {
        let window = web_sys::window().context("no window")?;
        let origin = window
            .location()
            .origin()
            .map_err(|_| anyhow::anyhow!("page origin unavailable"))?;
        let base = reqwest::Url::parse(&format!("{}/{}/", origin, asset_root.trim_matches('/')))?;
        Ok(Self { base })
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetSource for HttpSource {
    fn load(&self, path: &str) -> BytesFuture {
        let url = self.base.join(path);
        Box::pin(async move {
            let url = url?;
            let response = reqwest::get(url.clone()).await?.error_for_status()?;
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("fetching {url}"))?;
            Ok(bytes.to_vec())
        })
    }
}

/// Decode a `.glb` or `.gltf` asset into a scene graph rooted at a group
/// named after the glTF scene. Buffers may live in the GLB binary chunk, in
/// files next to the asset, or inline as base64 `data:` URIs.
pub async fn load_model_gltf(source: &dyn AssetSource, file_name: &str) -> anyhow::Result<Model> {
    let gltf_bytes = source.load(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("parsing glTF {file_name}"))?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .with_context(|| format!("{file_name} references a missing binary chunk"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = match uri.strip_prefix("data:") {
                    Some(data) => decode_data_uri(data).with_context(|| {
                        format!("{file_name}: decoding embedded buffer {}", buffer.index())
                    })?,
                    None => source.load(&sibling_path(file_name, uri)).await?,
                };
                buffer_data.push(bin);
            }
        }
        let loaded = buffer_data.last().map_or(0, Vec::len);
        if loaded < buffer.length() {
            bail!(
                "{file_name}: buffer {} holds {loaded} bytes, {} expected",
                buffer.index(),
                buffer.length()
            );
        }
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{file_name} contains no scene"))?;
    let children = scene
        .nodes()
        .map(|node| to_scene_node(node, &buffer_data))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let root = SceneNode::group(scene.name().unwrap_or(file_name), children);

    Ok(Model::new(file_name, root))
}

fn to_scene_node(node: gltf::Node, buffers: &[Vec<u8>]) -> anyhow::Result<SceneNode> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut scene_node = match node.mesh() {
        Some(mesh) => {
            let mut meshes = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping primitive {} of {name}: only triangle lists are rendered.",
                        primitive.index()
                    );
                    continue;
                }
                meshes.push(to_mesh(&primitive, buffers, &name)?);
            }
            if meshes.len() == 1 {
                let mesh = meshes.remove(0);
                SceneNode::mesh(name, mesh)
            } else {
                // Multi-primitive meshes become a group with one mesh child per primitive.
                let children = meshes
                    .into_iter()
                    .enumerate()
                    .map(|(idx, mesh)| SceneNode::mesh(format!("{name}_{idx}"), mesh))
                    .collect();
                SceneNode::group(name, children)
            }
        }
        None if node.children().count() > 0 => SceneNode::group(name, Vec::new()),
        None => SceneNode::empty(name),
    };

    let (translation, rotation, scale) = node.transform().decomposed();
    scene_node.transform = Instance {
        position: translation.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };

    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffers)?);
    }
    Ok(scene_node)
}

fn to_mesh(primitive: &gltf::Primitive, buffers: &[Vec<u8>], name: &str) -> anyhow::Result<Mesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let positions = reader
        .read_positions()
        .with_context(|| format!("mesh {name} has no positions"))?;
    let mut vertices = positions
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect::<Vec<_>>();
    if let Some(normals) = reader.read_normals() {
        for (vertex, normal) in vertices.iter_mut().zip(normals) {
            vertex.normal = normal;
        }
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords.into_f32()) {
            vertex.tex_coords = tex_coord;
        }
    }
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    let material = primitive.material();
    let base_color = material.pbr_metallic_roughness().base_color_factor();
    let material = Material::new(material.name().unwrap_or(name), Tint::from_linear(base_color));

    Ok(Mesh::new(MeshGeometry::new(vertices, indices), material))
}

/// Payload of a `data:` URI given without its scheme.
fn decode_data_uri(data: &str) -> anyhow::Result<Vec<u8>> {
    let (header, payload) = data.split_once(',').context("data URI without payload")?;
    if !header.ends_with(";base64") {
        bail!("only base64 data URIs are supported");
    }
    Ok(BASE64.decode(payload)?)
}

fn sibling_path(file_name: &str, uri: &str) -> String {
    match file_name.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{uri}"),
        None => uri.to_string(),
    }
}

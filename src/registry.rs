//! Name-indexed, non-owning view of the active model's materials.
//!
//! The registry never keeps a material alive: entries are weak links and the
//! owning meshes go away with their model. Before a different model becomes
//! active the registry must be cleared or rebuilt, so a selection can only
//! ever reach materials of the current model.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use crate::{
    data_structures::{
        instance::Instance,
        material::{Material, Tint},
        scene_graph::{Mesh, Model, SceneNode, SceneVisitor},
    },
    resources::texture::TextureHandle,
};

#[derive(Debug, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, Weak<RefCell<Material>>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all entries with the mesh materials of `model`, keyed by mesh
    /// node name. When names repeat the mesh visited last wins.
    pub fn rebuild(&mut self, model: &Model) {
        self.clear();
        let mut collector = Collector {
            materials: &mut self.materials,
        };
        model.walk(&mut collector);
        log::debug!(
            "Material registry rebuilt for {}: {} entries",
            model.source,
            self.materials.len()
        );
    }

    pub fn clear(&mut self) {
        self.materials.clear();
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Registered mesh names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.materials.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// The material registered under `name`, while its mesh is still alive.
    pub fn get(&self, name: &str) -> Option<Rc<RefCell<Material>>> {
        self.materials.get(name).and_then(Weak::upgrade)
    }

    /// Set `texture` on every registered material and flag it for re-upload.
    /// A no-op on an empty registry.
    pub fn apply_texture(&self, texture: &TextureHandle) {
        self.for_each_material(|material| material.set_texture(texture.clone()));
    }

    /// Set `tint` on every registered material and flag it for re-upload.
    pub fn apply_color(&self, tint: Tint) {
        self.for_each_material(|material| material.set_tint(tint));
    }

    fn for_each_material(&self, mut f: impl FnMut(&mut Material)) {
        for (name, link) in &self.materials {
            match link.upgrade() {
                Some(material) => f(&mut material.borrow_mut()),
                None => log::warn!("Material of mesh {name} outlived its model entry"),
            }
        }
    }
}

struct Collector<'r> {
    materials: &'r mut HashMap<String, Weak<RefCell<Material>>>,
}

impl SceneVisitor for Collector<'_> {
    fn visit_mesh(&mut self, node: &SceneNode, mesh: &Mesh, _world: &Instance) {
        if self
            .materials
            .insert(node.name.clone(), mesh.material_link())
            .is_some()
        {
            log::debug!("Mesh name {} appears more than once; keeping the last", node.name);
        }
    }
}

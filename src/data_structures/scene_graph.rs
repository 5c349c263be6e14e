//! Scene graph of a loaded model.
//!
//! A model is a tree of [`SceneNode`]s. Each node carries a local transform and
//! one of a closed set of kinds: a renderable [`Mesh`], a [`NodeKind::Group`] that
//! only exists to hold children, or an [`NodeKind::Empty`] placeholder (cameras,
//! lights and other glTF nodes without geometry). Traversal goes through
//! [`SceneVisitor`], which hands every node its world transform.

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::{Rc, Weak},
};

use crate::data_structures::{
    bounds::Aabb,
    instance::Instance,
    material::Material,
    model::MeshGeometry,
};

/// A material shared between its owning mesh and non-owning lookups.
pub type SharedMaterial = Rc<RefCell<Material>>;

/// Geometry plus the material it is drawn with. The mesh is the only strong
/// owner of its material.
#[derive(Debug)]
pub struct Mesh {
    pub geometry: MeshGeometry,
    material: SharedMaterial,
}

impl Mesh {
    pub fn new(geometry: MeshGeometry, material: Material) -> Self {
        Self {
            geometry,
            material: Rc::new(RefCell::new(material)),
        }
    }

    pub fn material(&self) -> Ref<'_, Material> {
        self.material.borrow()
    }

    pub fn material_mut(&self) -> RefMut<'_, Material> {
        self.material.borrow_mut()
    }

    /// A lookup reference that does not keep the material alive.
    pub fn material_link(&self) -> Weak<RefCell<Material>> {
        Rc::downgrade(&self.material)
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Mesh(Mesh),
    Group,
    Empty,
}

#[derive(Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: Instance,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::with_kind(name, NodeKind::Mesh(mesh))
    }

    pub fn group(name: impl Into<String>, children: Vec<SceneNode>) -> Self {
        let mut node = Self::with_kind(name, NodeKind::Group);
        node.children = children;
        node
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Empty)
    }

    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Instance::default(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// The renderable capability of this node, if it has one.
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group | NodeKind::Empty => None,
        }
    }

    /// Depth-first walk; `parent_world` is the accumulated transform above this node.
    pub fn walk(&self, parent_world: &Instance, visitor: &mut dyn SceneVisitor) {
        let world = parent_world * &self.transform;
        match &self.kind {
            NodeKind::Mesh(mesh) => visitor.visit_mesh(self, mesh, &world),
            NodeKind::Group => visitor.visit_group(self, &world),
            NodeKind::Empty => visitor.visit_empty(self, &world),
        }
        for child in &self.children {
            child.walk(&world, visitor);
        }
    }
}

/// Typed traversal over the closed set of node kinds. Every hook defaults to a no-op.
pub trait SceneVisitor {
    fn visit_mesh(&mut self, _node: &SceneNode, _mesh: &Mesh, _world: &Instance) {}

    fn visit_group(&mut self, _node: &SceneNode, _world: &Instance) {}

    fn visit_empty(&mut self, _node: &SceneNode, _world: &Instance) {}
}

/// Accumulates the world-space box of every mesh vertex.
#[derive(Default)]
struct BoundsVisitor {
    aabb: Aabb,
}

impl SceneVisitor for BoundsVisitor {
    fn visit_mesh(&mut self, _: &SceneNode, mesh: &Mesh, world: &Instance) {
        for point in mesh.geometry.positions() {
            self.aabb.extend(world.transform_point(point));
        }
    }
}

/// A decoded 3D asset: one root node plus the reference it was loaded from.
#[derive(Debug)]
pub struct Model {
    pub source: String,
    pub root: SceneNode,
}

impl Model {
    pub fn new(source: impl Into<String>, root: SceneNode) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    pub fn walk(&self, visitor: &mut dyn SceneVisitor) {
        self.root.walk(&Instance::default(), visitor);
    }

    /// World-space bounds of all mesh geometry under the current root transform.
    pub fn world_bounds(&self) -> Aabb {
        let mut visitor = BoundsVisitor::default();
        self.walk(&mut visitor);
        visitor.aabb
    }

    /// Every mesh node together with its world transform, in depth-first order.
    pub fn meshes(&self) -> Vec<(&SceneNode, &Mesh, Instance)> {
        let mut meshes = Vec::new();
        collect_meshes(&self.root, &Instance::default(), &mut meshes);
        meshes
    }

    pub fn mesh_names(&self) -> Vec<String> {
        self.meshes()
            .into_iter()
            .map(|(node, _, _)| node.name.clone())
            .collect()
    }
}

// Visitor hooks only borrow nodes for the duration of a call, so handing out
// references that outlive the walk needs its own recursion.
fn collect_meshes<'m>(
    node: &'m SceneNode,
    parent_world: &Instance,
    out: &mut Vec<(&'m SceneNode, &'m Mesh, Instance)>,
) {
    let world = parent_world * &node.transform;
    if let Some(mesh) = node.as_mesh() {
        out.push((node, mesh, world.clone()));
    }
    for child in &node.children {
        collect_meshes(child, &world, out);
    }
}

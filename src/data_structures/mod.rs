//! Viewer data structures: scene graph, geometry, materials and transforms.
//!
//! - `scene_graph` holds the model tree of mesh, group and empty nodes
//! - `model` contains mesh geometry and the shared vertex layout
//! - `material` holds the per-mesh tint and texture state
//! - `instance` holds node transforms and their GPU form
//! - `bounds` is the axis-aligned box used for framing
//! - `texture` contains the GPU texture wrapper

pub mod bounds;
pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;

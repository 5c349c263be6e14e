//! swatch-viewer
//!
//! A single-model 3D viewer for native and WASM targets. It loads a glTF/GLB
//! asset, frames it automatically whatever its native scale or origin, and
//! lets the user swap the surface texture and tint of every mesh in real time.
//! The last selections are persisted across reloads.
//!
//! High-level modules
//! - `framer`: recentering and camera/clip-plane computation from model bounds
//! - `registry`: mesh name to live material mapping with batch texture/color apply
//! - `resources`: asset sources, glTF decoding and texture resolution
//! - `session`: persisted selection with in-memory fallback
//! - `viewer`: the controller state machine tying the above together
//! - `camera`: camera state, GPU uniform and orbit controls
//! - `context`, `pipelines`, `render`: GPU setup and drawing
//! - `flow`: the winit event loop
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod framer;
pub mod pipelines;
pub mod registry;
pub mod render;
pub mod resources;
pub mod session;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use flow::ViewerEvent;
pub use viewer::{LoadOutcome, LoadPhase, ViewerState};

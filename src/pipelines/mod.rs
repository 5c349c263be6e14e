//! Render pipeline for textured, tinted meshes under a hemisphere light.

pub mod basic;
pub mod light;

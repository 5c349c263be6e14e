//! CPU-side mesh geometry and the vertex layout shared with the shaders.

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Triangle list geometry of a single mesh in its local space.
#[derive(Clone, Debug, Default)]
pub struct MeshGeometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn new(vertices: Vec<ModelVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Unindexed geometry built from raw positions. Handy for synthetic scenes.
    pub fn from_positions(positions: &[[f32; 3]]) -> Self {
        let vertices = positions
            .iter()
            .map(|&position| ModelVertex {
                position,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let indices = (0..vertices.len() as u32).collect();
        Self { vertices, indices }
    }

    pub fn positions(&self) -> impl Iterator<Item = cgmath::Point3<f32>> + '_ {
        self.vertices.iter().map(|v| v.position.into())
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }
}

//! Node transforms and their GPU representation.
//!
//! Every scene node carries a local [`Instance`]. World transforms are built by
//! multiplying parent and child instances on the way down the graph; the
//! renderer uploads one [`InstanceRaw`] per mesh.

use std::ops::Mul;

use cgmath::{
    ElementWise, EuclideanSpace, Matrix, Matrix3, Matrix4, One, Point3, Quaternion, SquareMatrix,
    Vector3,
};

use crate::data_structures::model;

/// Translation, rotation (as quaternion) and scale of a scene node.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Apply scale, then rotation, then translation to a point.
    pub fn transform_point(&self, point: Point3<f32>) -> Point3<f32> {
        let scaled = point.to_vec().mul_element_wise(self.scale);
        Point3::from_vec(self.position + self.rotation * scaled)
    }

    /// Inverse transpose of the linear part, so normals stay perpendicular
    /// under non-uniform scale. Degenerate scales fall back to the rotation.
    pub fn normal_matrix(&self) -> Matrix3<f32> {
        let m = self.to_matrix();
        Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(|| Matrix3::from(self.rotation))
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            normal: self.normal_matrix().into(),
        }
    }
}

/// `parent * child`: the child's transform expressed in the parent's space.
impl Mul<&Instance> for &Instance {
    type Output = Instance;

    fn mul(self, child: &Instance) -> Instance {
        let scaled_offset = child.position.mul_element_wise(self.scale);
        Instance {
            position: self.position + self.rotation * scaled_offset,
            rotation: self.rotation * child.rotation,
            scale: self.scale.mul_element_wise(child.scale),
        }
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// World matrix of one mesh plus the rotation used for its normals.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl InstanceRaw {
    // A mat4 takes four vertex slots and a mat3 three.
    const ATTRIBS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
    ];
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

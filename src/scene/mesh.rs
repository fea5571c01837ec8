use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::color::Color;

/// Up to four bone influences of one vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoneWeight {
    pub indices: [u32; 4],
    pub weights: [f32; 4],
}

/// Per-vertex deltas applied on top of the base mesh.
///
/// Empty delta arrays are simply not exported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendShape {
    pub name: String,
    pub delta_positions: Vec<Vec3>,
    pub delta_normals: Vec<Vec3>,
    pub delta_tangents: Vec<Vec3>,
}

/// Triangle mesh data in the source (left-handed) coordinate system.
///
/// Every non-empty per-vertex array must have as many entries as
/// `positions`; `indices` lists triangles, three indices each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    /// UV sets 0 to 3, V pointing up.
    pub uvs: [Vec<Vec2>; 4],
    pub colors: Vec<Color>,
    pub indices: Vec<u32>,
    pub bone_weights: Vec<BoneWeight>,
    pub bind_poses: Vec<Mat4>,
    pub blend_shapes: Vec<BlendShape>,
}

impl SourceMesh {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            positions,
            indices,
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_uvs(mut self, set: usize, uvs: Vec<Vec2>) -> Self {
        if let Some(slot) = self.uvs.get_mut(set) {
            *slot = uvs;
        }
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

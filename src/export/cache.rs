use std::collections::HashMap;

use glam::Mat4;

use crate::material::TextureRef;
use crate::scene::{ClipId, MaterialId, MeshId, NodeId, SkinBinding};

/// Structural identity of a skin: two renderers sharing bind poses and
/// bones share one glTF skin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SkinKey {
    bind_poses: Vec<[u32; 16]>,
    root_bone: Option<NodeId>,
    bones: Vec<NodeId>,
}

impl SkinKey {
    pub fn new(bind_poses: &[Mat4], binding: &SkinBinding) -> Self {
        Self {
            bind_poses: bind_poses
                .iter()
                .map(|pose| pose.to_cols_array().map(f32::to_bits))
                .collect(),
            root_bone: binding.root_bone,
            bones: binding.bones.clone(),
        }
    }
}

/// Source entities that map to exactly one output index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    Node(NodeId),
    Material(MaterialId),
    /// Normal maps are encoded differently, so the flag is part of the key.
    Texture { texture: TextureRef, normal_map: bool },
    /// A mesh together with the material slot it is drawn with.
    Mesh { mesh: MeshId, material: Option<usize> },
    Skin(SkinKey),
    /// A clip played by the animator on a node.
    Animation { node: NodeId, clip: ClipId },
}

/// Source identity to output index, so shared entities are written once.
#[derive(Debug, Default)]
pub struct ObjectCache {
    indices: HashMap<ObjectKey, usize>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, key: &ObjectKey) -> Option<usize> {
        self.indices.get(key).copied()
    }

    /// Remembers `index` for `key`. The first recorded index wins.
    pub fn record(&mut self, key: ObjectKey, index: usize) {
        self.indices.entry(key).or_insert(index);
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

//! In-memory scene graph handed to the exporter.
//!
//! All entities live in arenas owned by [`Scene`]; the typed ids double as
//! the reference identity the exporter uses to deduplicate shared meshes,
//! materials and textures. Transforms are left-handed with Y up, the exporter
//! converts them on the way out.

mod animation;
mod material;
mod mesh;
mod texture;

pub use animation::{AnimatedProperty, AnimationClip, AnimationCurve, CurveBinding, Keyframe};
pub use material::{
    ColorParam, FloatParam, MaterialDescription, STANDARD_SHADER, STANDARD_SPECULAR_SHADER,
    SourceMaterial, TextureParam,
};
pub use mesh::{BlendShape, BoneWeight, SourceMesh};
pub use texture::Texture;

use glam::{Quat, Vec3};
use id_arena::{Arena, Id};

pub type NodeId = Id<SceneNode>;
pub type MeshId = Id<SourceMesh>;
pub type MaterialId = Id<SourceMaterial>;
pub type TextureId = Id<Texture>;
pub type ClipId = Id<AnimationClip>;

/// Local transform relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Bones driving a skinned renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinBinding {
    pub root_bone: Option<NodeId>,
    pub bones: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renderer {
    pub material: MaterialId,
    pub mesh: Option<MeshId>,
    pub skin: Option<SkinBinding>,
    /// Current blend shape weights in percent (0-100).
    pub blend_shape_weights: Vec<f32>,
}

impl Renderer {
    pub fn new(material: MaterialId, mesh: MeshId) -> Self {
        Self {
            material,
            mesh: Some(mesh),
            skin: None,
            blend_shape_weights: Vec::new(),
        }
    }

    pub fn with_skin(mut self, skin: SkinBinding) -> Self {
        self.skin = Some(skin);
        self
    }

    pub fn with_blend_shape_weights(mut self, weights: Vec<f32>) -> Self {
        self.blend_shape_weights = weights;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Clip(ClipId),
    /// Blend trees have no glTF counterpart.
    BlendTree { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatorState {
    pub name: String,
    pub motion: Option<Motion>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animator {
    pub states: Vec<AnimatorState>,
}

impl Animator {
    pub fn with_clip(mut self, name: impl Into<String>, clip: ClipId) -> Self {
        self.states.push(AnimatorState {
            name: name.into(),
            motion: Some(Motion::Clip(clip)),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Inactive nodes are skipped when they appear as children.
    pub active: bool,
    pub transform: Transform,
    pub children: Vec<NodeId>,
    pub renderer: Option<Renderer>,
    pub animator: Option<Animator>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            transform: Transform::IDENTITY,
            children: Vec::new(),
            renderer: None,
            animator: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_animator(mut self, animator: Animator) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

pub struct Scene {
    nodes: Arena<SceneNode>,
    meshes: Arena<SourceMesh>,
    materials: Arena<SourceMaterial>,
    textures: Arena<Texture>,
    clips: Arena<AnimationClip>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            meshes: Arena::new(),
            materials: Arena::new(),
            textures: Arena::new(),
            clips: Arena::new(),
        }
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        self.nodes.alloc(node)
    }

    /// Allocates `node` and appends it to the children of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: SceneNode) -> NodeId {
        let id = self.nodes.alloc(node);
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.push(id);
        }
        id
    }

    pub fn add_mesh(&mut self, mesh: SourceMesh) -> MeshId {
        self.meshes.alloc(mesh)
    }

    pub fn add_material(&mut self, material: SourceMaterial) -> MaterialId {
        self.materials.alloc(material)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.alloc(texture)
    }

    pub fn add_clip(&mut self, clip: AnimationClip) -> ClipId {
        self.clips.alloc(clip)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&SourceMesh> {
        self.meshes.get(id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&SourceMaterial> {
        self.materials.get(id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&AnimationClip> {
        self.clips.get(id)
    }

    /// Resolves a `/`-separated path of child names starting at `from`.
    ///
    /// The empty path is `from` itself. Inactive children are still found.
    pub fn find_path(&self, from: NodeId, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(from, |current, segment| {
                self.node(current)?
                    .children
                    .iter()
                    .copied()
                    .find(|child| self.node(*child).is_some_and(|node| node.name == segment))
            })
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

//! scene2gltf exports in-memory 3D scene graphs to glTF 2.0.
//!
//! A [`Scene`] holds nodes, meshes, materials, textures and animation clips
//! in the left-handed, Y-up convention of common game engines. The exporter
//! converts it to a right-handed glTF document and writes it as a single
//! `.glb` file or as a `.gltf` file with a sidecar `.bin` buffer and images.
//!
//! Specular-workflow materials are converted to metallic-roughness, and the
//! `KHR_materials_pbrSpecularGlossiness` extension can attach the
//! specular-glossiness form as well. Custom [`Extension`]s can take over or
//! decorate the export of any entity.
//!
//! ```
//! use glam::Vec3;
//! use scene2gltf::filesystem::MemoryFileSystem;
//! use scene2gltf::{ExportOptions, Renderer, Scene, SceneNode, SourceMaterial, SourceMesh};
//! use std::path::Path;
//!
//! let mut scene = Scene::new();
//! let mesh = scene.add_mesh(SourceMesh::new(
//!     "Triangle",
//!     vec![Vec3::ZERO, Vec3::X, Vec3::Y],
//!     vec![0, 1, 2],
//! ));
//! let material = scene.add_material(SourceMaterial::standard("Default"));
//! let renderer = Renderer::new(material, mesh);
//! let node = scene.add_node(SceneNode::new("Triangle").with_renderer(renderer));
//!
//! let fs = MemoryFileSystem::new();
//! let options = ExportOptions::new();
//! let written = scene2gltf::export(&scene, &[node], Path::new("out"), "triangle", &options, &fs)?;
//! assert_eq!(written, vec![Path::new("out/triangle.glb")]);
//! # Ok::<(), scene2gltf::ExportError>(())
//! ```

pub mod color;
pub mod error;
pub mod export;
pub mod filesystem;
pub mod gltf;
pub mod image_codec;
pub mod material;
pub mod options;
pub mod pbr;
pub mod scene;

pub use color::Color;
pub use error::{ExportError, ExportResult};
pub use export::{
    ExportSession, ExportedAsset, Extension, KhrMaterialsPbrSpecularGlossiness, export,
};
pub use filesystem::{FileSystem, MemoryFileSystem, RealFileSystem};
pub use options::{ExportOptions, ExtensionKind, GltfFormat, ImageCodec, JsonFormatting};
pub use scene::{
    AnimatedProperty, AnimationClip, AnimationCurve, Animator, AnimatorState, BlendShape,
    BoneWeight, ColorParam, FloatParam, Keyframe, MaterialDescription, Motion, NodeId, Renderer,
    Scene, SceneNode, SkinBinding, SourceMaterial, SourceMesh, Texture, TextureParam, Transform,
};

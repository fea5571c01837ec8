#![allow(dead_code)]

use glam::Vec3;
use scene2gltf::export::read_glb;
use scene2gltf::filesystem::MemoryFileSystem;
use scene2gltf::scene::{ClipId, MaterialId, MeshId};
use scene2gltf::{Animator, NodeId, Renderer, Scene, SceneNode, SourceMaterial, SourceMesh};
use serde_json::Value;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One triangle at z = 1, indexed 0, 1, 2.
pub fn triangle_mesh(name: &str) -> SourceMesh {
    SourceMesh::new(
        name,
        vec![
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        vec![0, 1, 2],
    )
}

/// A scene with a single node drawing [`triangle_mesh`] with a default
/// standard material.
pub fn triangle_scene() -> (Scene, NodeId) {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(triangle_mesh("Triangle"));
    let material = scene.add_material(SourceMaterial::standard("Default"));
    let node = scene.add_node(drawn("Triangle", material, mesh));
    (scene, node)
}

/// A node drawing `mesh` with `material`.
pub fn drawn(name: &str, material: MaterialId, mesh: MeshId) -> SceneNode {
    SceneNode::new(name).with_renderer(Renderer::new(material, mesh))
}

/// A node whose animator plays `clip` as its only state.
pub fn animated(name: &str, clip: ClipId) -> SceneNode {
    SceneNode::new(name).with_animator(Animator::default().with_clip("Idle", clip))
}

/// Parses a GLB file from `fs` into its JSON document and binary chunk.
pub fn read_glb_file(fs: &MemoryFileSystem, path: &str) -> (Value, Vec<u8>) {
    let bytes = fs
        .get_file(path)
        .unwrap_or_else(|| panic!("{path} not written, have {:?}", fs.list_files()));
    let chunks = read_glb(&mut bytes.as_slice()).expect("valid GLB");
    let json = serde_json::from_slice(&chunks.json).expect("valid JSON chunk");
    (json, chunks.bin.unwrap_or_default())
}

/// The bytes of the buffer view behind `accessor`.
pub fn accessor_bytes<'b>(json: &Value, bin: &'b [u8], accessor: usize) -> &'b [u8] {
    let view_index = json["accessors"][accessor]["bufferView"]
        .as_u64()
        .expect("accessor has a buffer view") as usize;
    let view = &json["bufferViews"][view_index];
    let offset = view["byteOffset"].as_u64().expect("byteOffset") as usize;
    let length = view["byteLength"].as_u64().expect("byteLength") as usize;
    &bin[offset..offset + length]
}

pub fn read_f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn read_u16s(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

mod common;

use common::{
    accessor_bytes, drawn, init_logging, read_f32s, read_glb_file, read_u16s, triangle_mesh,
    triangle_scene,
};
use glam::{Vec2, Vec3};
use pretty_assertions::assert_eq;
use scene2gltf::filesystem::MemoryFileSystem;
use scene2gltf::gltf::{Bounds, MaterialBuilder};
use scene2gltf::scene::MaterialId;
use scene2gltf::{
    Color, ColorParam, ExportError, ExportOptions, ExportResult, ExportSession, Extension,
    ExtensionKind, FloatParam, GltfFormat, ImageCodec, Motion, NodeId, Renderer, Scene, SceneNode,
    SourceMaterial, SourceMesh, Texture, TextureParam,
};
use serde_json::json;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use testresult::TestResult;

#[test]
fn test_triangle_glb() -> TestResult {
    init_logging();
    let (scene, node) = triangle_scene();
    let fs = MemoryFileSystem::new();

    let options = ExportOptions::new();
    let written = scene2gltf::export(&scene, &[node], Path::new("out"), "triangle", &options, &fs)?;

    assert_eq!(written, vec![PathBuf::from("out/triangle.glb")]);
    assert_eq!(fs.list_files(), vec!["out/triangle.glb".to_string()]);

    let (json, bin) = read_glb_file(&fs, "out/triangle.glb");
    assert_eq!(json["asset"]["version"], json!("2.0"));
    assert_eq!(json["scene"], json!(0));
    assert_eq!(json["scenes"], json!([{ "nodes": [0] }]));
    assert_eq!(json["nodes"][0]["name"], json!("Triangle"));
    assert_eq!(json["nodes"][0]["mesh"], json!(0));

    let primitive = &json["meshes"][0]["primitives"][0];
    assert_eq!(primitive["mode"], json!(4));
    assert_eq!(primitive["material"], json!(0));

    let position = primitive["attributes"]["POSITION"].as_u64().unwrap() as usize;
    assert_eq!(json["accessors"][position]["count"], json!(3));
    assert_eq!(json["accessors"][position]["type"], json!("VEC3"));
    assert_eq!(json["accessors"][position]["min"], json!([0.0, 0.0, -1.0]));
    assert_eq!(json["accessors"][position]["max"], json!([1.0, 1.0, -1.0]));
    assert_eq!(
        read_f32s(accessor_bytes(&json, &bin, position)),
        vec![0.0, 0.0, -1.0, 1.0, 0.0, -1.0, 0.0, 1.0, -1.0]
    );

    let indices = primitive["indices"].as_u64().unwrap() as usize;
    assert_eq!(json["accessors"][indices]["componentType"], json!(5123));
    assert_eq!(read_u16s(accessor_bytes(&json, &bin, indices)), vec![2, 1, 0]);

    // 36 bytes of positions and 6 of indices, padded to 44 in the chunk
    assert_eq!(json["buffers"], json!([{ "byteLength": 42 }]));
    assert_eq!(bin.len(), 44);
    assert_eq!(&bin[42..], &[0, 0]);
    Ok(())
}

#[test]
fn test_default_material_values() -> TestResult {
    let (scene, node) = triangle_scene();
    let options = ExportOptions::new();
    let mut session = ExportSession::new(&scene, "triangle", &options);
    session.add_root(node)?;
    let asset = session.finish()?;

    let material = &asset.document.materials[0];
    assert_eq!(material.name.as_deref(), Some("Default"));
    assert_eq!(material.pbr_metallic_roughness.base_color_factor, [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(material.pbr_metallic_roughness.metallic_factor, 0.0);
    assert_eq!(material.pbr_metallic_roughness.roughness_factor, 0.5);
    assert!(!material.double_sided);

    let position = asset.document.meshes[0].primitives[0].attributes["POSITION"];
    assert_eq!(
        asset.document.accessors[position].min,
        Some(Bounds::Float(vec![0.0, 0.0, -1.0]))
    );
    Ok(())
}

#[test]
fn test_shared_mesh_and_material_are_exported_once() -> TestResult {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(triangle_mesh("Shared"));
    let material = scene.add_material(SourceMaterial::standard("Shared"));
    let root = scene.add_node(SceneNode::new("Root"));
    for name in ["A", "B", "C"] {
        scene.add_child(root, SceneNode::new(name).with_renderer(Renderer::new(material, mesh)));
    }
    let options = ExportOptions::new();

    let mut session = ExportSession::new(&scene, "shared", &options);
    session.add_root(root)?;
    let asset = session.finish()?;

    let document = &asset.document;
    assert_eq!(document.nodes.len(), 4);
    assert_eq!(document.meshes.len(), 1);
    assert_eq!(document.materials.len(), 1);
    assert!(document.nodes[..3].iter().all(|node| node.mesh == Some(0)));
    assert_eq!(document.nodes[3].children, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn test_same_mesh_with_different_materials() -> TestResult {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(triangle_mesh("Shared"));
    let red = scene.add_material(SourceMaterial::standard("Red").with_color(
        ColorParam::Color,
        Color::rgb(1.0, 0.0, 0.0),
    ));
    let blue = scene.add_material(SourceMaterial::standard("Blue").with_color(
        ColorParam::Color,
        Color::rgb(0.0, 0.0, 1.0),
    ));
    let root = scene.add_node(SceneNode::new("Root"));
    scene.add_child(root, SceneNode::new("A").with_renderer(Renderer::new(red, mesh)));
    scene.add_child(root, SceneNode::new("B").with_renderer(Renderer::new(blue, mesh)));
    let options = ExportOptions::new();

    let mut session = ExportSession::new(&scene, "two", &options);
    session.add_root(root)?;
    let document = session.document();

    assert_eq!(document.meshes.len(), 2);
    assert_eq!(document.meshes[0].primitives[0].material, Some(0));
    assert_eq!(document.meshes[1].primitives[0].material, Some(1));
    Ok(())
}

fn textured_scene() -> (Scene, NodeId) {
    let mut scene = Scene::new();
    let red = scene.add_texture(Texture::solid("albedo", 2, 2, Color::rgb(1.0, 0.0, 0.0)));
    let green = scene.add_texture(Texture::solid("albedo", 2, 2, Color::rgb(0.0, 1.0, 0.0)));
    let mesh = scene.add_mesh(
        triangle_mesh("Quadish").with_uvs(0, vec![Vec2::ZERO, Vec2::X, Vec2::Y]),
    );
    let first = SourceMaterial::standard("First").with_texture(TextureParam::MainTex, red);
    let first = scene.add_material(first);
    let second = SourceMaterial::standard("Second").with_texture(TextureParam::MainTex, green);
    let second = scene.add_material(second);
    let root = scene.add_node(SceneNode::new("Root"));
    scene.add_child(root, SceneNode::new("A").with_renderer(Renderer::new(first, mesh)));
    scene.add_child(root, SceneNode::new("B").with_renderer(Renderer::new(second, mesh)));
    (scene, root)
}

#[test]
fn test_gltf_writes_sidecar_files() -> TestResult {
    init_logging();
    let (scene, root) = textured_scene();
    let fs = MemoryFileSystem::new();
    let options = ExportOptions::new().format(GltfFormat::Gltf);

    let written = scene2gltf::export(&scene, &[root], Path::new("out"), "props", &options, &fs)?;

    assert_eq!(
        fs.list_files(),
        vec![
            "out/props.bin".to_string(),
            "out/props.gltf".to_string(),
            "out/props_albedo.png".to_string(),
            "out/props_albedo_1.png".to_string(),
        ]
    );
    assert_eq!(written.len(), 4);

    let json: serde_json::Value = serde_json::from_slice(&fs.get_file("out/props.gltf").unwrap())?;
    let bin = fs.get_file("out/props.bin").unwrap();
    assert_eq!(json["buffers"][0]["uri"], json!("props.bin"));
    assert_eq!(json["buffers"][0]["byteLength"], json!(bin.len()));
    assert_eq!(json["images"][0]["uri"], json!("props_albedo.png"));
    assert_eq!(json["images"][1]["uri"], json!("props_albedo_1.png"));
    assert!(json["images"][0].get("bufferView").is_none());
    assert_eq!(json["samplers"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["textures"][1]["sampler"], json!(0));

    let png = fs.get_file("out/props_albedo.png").unwrap();
    assert_eq!(&png[..4], b"\x89PNG");

    // V is flipped
    let mesh = &json["meshes"][0]["primitives"][0];
    let uvs = mesh["attributes"]["TEXCOORD_0"].as_u64().unwrap() as usize;
    assert_eq!(
        read_f32s(accessor_bytes(&json, &bin, uvs)),
        vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0]
    );
    Ok(())
}

#[test]
fn test_glb_embeds_images() -> TestResult {
    let (scene, root) = textured_scene();
    let fs = MemoryFileSystem::new();
    let options = ExportOptions::new().image_codec(ImageCodec::Jpeg);

    scene2gltf::export(&scene, &[root], Path::new(""), "props", &options, &fs)?;

    assert_eq!(fs.list_files(), vec!["props.glb".to_string()]);
    let (json, bin) = read_glb_file(&fs, "props.glb");
    let image = &json["images"][0];
    assert_eq!(image["mimeType"], json!("image/jpeg"));
    assert!(image.get("uri").is_none());

    let view = &json["bufferViews"][image["bufferView"].as_u64().unwrap() as usize];
    let offset = view["byteOffset"].as_u64().unwrap() as usize;
    assert_eq!(offset % 4, 0);
    assert_eq!(&bin[offset..offset + 2], &[0xFF, 0xD8]);
    assert!(view.get("target").is_none());
    Ok(())
}

#[test]
fn test_normal_maps_stay_lossless() -> TestResult {
    let mut scene = Scene::new();
    let normal = scene.add_texture(Texture::solid("bumps", 2, 2, Color::rgb(0.5, 0.5, 1.0)));
    let mesh = scene.add_mesh(triangle_mesh("Bumpy"));
    let material = SourceMaterial::standard("Bumpy").with_texture(TextureParam::BumpMap, normal);
    let material = scene.add_material(material);
    let node = scene.add_node(drawn("Bumpy", material, mesh));
    let options = ExportOptions::new().image_codec(ImageCodec::Jpeg);

    let mut session = ExportSession::new(&scene, "bumpy", &options);
    session.add_root(node)?;
    let document = session.document();

    assert_eq!(document.materials[0].normal_texture.as_ref().map(|info| info.index), Some(0));
    assert_eq!(document.images[0].mime_type.as_deref(), Some("image/png"));
    Ok(())
}

#[test]
#[cfg(not(target_family = "wasm"))]
fn test_export_to_real_filesystem() -> TestResult {
    use scene2gltf::RealFileSystem;
    use testdir::testdir;

    init_logging();
    let dir: PathBuf = testdir!();
    let (scene, root) = textured_scene();
    let options = ExportOptions::new().format(GltfFormat::Gltf);

    let written = scene2gltf::export(&scene, &[root], &dir, "props", &options, &RealFileSystem)?;

    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }
    let mut names: Vec<_> = std::fs::read_dir(&dir)?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().to_string()))
        .collect::<Result<_, _>>()?;
    names.sort();
    assert_eq!(names, vec!["props.bin", "props.gltf", "props_albedo.png", "props_albedo_1.png"]);
    Ok(())
}

#[derive(Default)]
struct MaterialReplacer {
    nodes_seen: Cell<usize>,
}

impl Extension for MaterialReplacer {
    fn name(&self) -> &str {
        "EXT_test_material_replacer"
    }

    fn export_material(
        &self,
        session: &mut ExportSession<'_>,
        material: MaterialId,
    ) -> ExportResult<Option<usize>> {
        let name = session.material(material)?.name.clone();
        let document = session.document_mut();
        document
            .materials
            .push(MaterialBuilder::new(format!("Replaced {name}")).double_sided_if(true).build());
        Ok(Some(document.materials.len() - 1))
    }

    fn post_export_node(
        &self,
        _session: &mut ExportSession<'_>,
        _node: NodeId,
        _index: usize,
    ) -> ExportResult<()> {
        self.nodes_seen.set(self.nodes_seen.get() + 1);
        Ok(())
    }
}

#[test]
fn test_extension_overrides_material_export() -> TestResult {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(triangle_mesh("Tri"));
    // the custom shader would be rejected by the built-in export
    let material = scene.add_material(SourceMaterial::new("Toon", "Custom/Toon"));
    let root = scene.add_node(SceneNode::new("Root"));
    scene.add_child(root, SceneNode::new("A").with_renderer(Renderer::new(material, mesh)));
    scene.add_child(root, SceneNode::new("B").with_renderer(Renderer::new(material, mesh)));
    let options = ExportOptions::new();

    let replacer = Rc::new(MaterialReplacer::default());
    let mut session =
        ExportSession::new(&scene, "custom", &options).with_extension(replacer.clone());
    session.add_root(root)?;
    let asset = session.finish()?;

    let document = &asset.document;
    assert_eq!(document.extensions_used, vec!["EXT_test_material_replacer".to_string()]);
    assert_eq!(document.materials.len(), 1);
    assert_eq!(document.materials[0].name.as_deref(), Some("Replaced Toon"));
    assert!(document.materials[0].double_sided);
    assert_eq!(replacer.nodes_seen.get(), 3);
    Ok(())
}

#[test]
fn test_specular_glossiness_extension_payload() -> TestResult {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(triangle_mesh("Tri"));
    let material = scene.add_material(
        SourceMaterial::standard_specular("Shiny")
            .with_color(ColorParam::SpecColor, Color::gray(0.2))
            .with_float(FloatParam::Glossiness, 0.8),
    );
    let node = scene.add_node(drawn("Shiny", material, mesh));
    let options = ExportOptions::new().extension(ExtensionKind::KhrMaterialsPbrSpecularGlossiness);

    let mut session = ExportSession::new(&scene, "shiny", &options);
    session.add_root(node)?;
    let document = session.document();

    assert_eq!(
        document.extensions_used,
        vec!["KHR_materials_pbrSpecularGlossiness".to_string()]
    );
    let payload = &document.materials[0].extensions["KHR_materials_pbrSpecularGlossiness"];
    assert_eq!(payload["glossinessFactor"].as_f64().map(|v| v as f32), Some(0.8));
    assert!(payload.get("specularFactor").is_some());
    Ok(())
}

#[test]
fn test_unsupported_shader() {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(triangle_mesh("Tri"));
    let material = scene.add_material(SourceMaterial::new("Toon", "Custom/Toon"));
    let node = scene.add_node(drawn("Toon", material, mesh));
    let fs = MemoryFileSystem::new();

    let options = ExportOptions::new();
    let result = scene2gltf::export(&scene, &[node], Path::new("out"), "toon", &options, &fs);

    match result {
        Err(ExportError::UnsupportedShader(shader)) => assert_eq!(shader, "Custom/Toon"),
        other => panic!("expected an unsupported shader error, got {other:?}"),
    }
    assert!(fs.list_files().is_empty());
}

#[test]
fn test_index_count_not_multiple_of_three() {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(SourceMesh::new(
        "Broken",
        vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
        vec![0, 1, 2, 3],
    ));
    let material = scene.add_material(SourceMaterial::standard("Default"));
    let node = scene.add_node(drawn("Broken", material, mesh));
    let options = ExportOptions::new();

    let mut session = ExportSession::new(&scene, "broken", &options);
    assert!(matches!(session.add_root(node), Err(ExportError::UnsupportedFeature(_))));
}

#[test]
fn test_blend_tree_is_rejected() -> TestResult {
    let mut scene = Scene::new();
    let mut animator = scene2gltf::Animator::default();
    animator.states.push(scene2gltf::AnimatorState {
        name: "Locomotion".to_string(),
        motion: Some(Motion::BlendTree {
            name: "Walk/Run".to_string(),
        }),
    });
    let node = scene.add_node(SceneNode::new("Character").with_animator(animator));
    let fs = MemoryFileSystem::new();

    let options = ExportOptions::new();
    let error = scene2gltf::export(&scene, &[node], Path::new("out"), "walker", &options, &fs)
        .expect_err("blend trees cannot be exported");

    assert!(matches!(error, ExportError::UnsupportedFeature(_)));
    assert!(error.to_string().contains("Walk/Run"), "{error}");
    assert!(fs.list_files().is_empty());
    Ok(())
}

#[test]
fn test_root_that_is_also_a_child() -> TestResult {
    let mut scene = Scene::new();
    let parent = scene.add_node(SceneNode::new("Parent"));
    let child = scene.add_child(parent, SceneNode::new("Child"));
    let options = ExportOptions::new();

    let mut session = ExportSession::new(&scene, "roots", &options);
    session.add_root(parent)?;
    assert!(matches!(session.add_root(child), Err(ExportError::UnsupportedFeature(_))));
    // adding the same root twice is harmless
    assert_eq!(session.add_root(parent)?, 1);
    assert_eq!(session.finish()?.document.scenes[0].nodes, vec![1]);
    Ok(())
}

#[test]
fn test_red_triangle_material_and_counts() -> TestResult {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(triangle_mesh("Triangle"));
    let material = scene.add_material(
        SourceMaterial::standard("Red")
            .with_color(ColorParam::Color, Color::new(1.0, 0.0, 0.0, 1.0))
            .with_float(FloatParam::Metallic, 0.0)
            .with_float(FloatParam::Glossiness, 0.0),
    );
    let node = scene.add_node(drawn("Triangle", material, mesh));
    let fs = MemoryFileSystem::new();

    scene2gltf::export(&scene, &[node], Path::new("out"), "red", &ExportOptions::new(), &fs)?;

    let (json, _) = read_glb_file(&fs, "out/red.glb");
    assert_eq!(json["nodes"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["meshes"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["materials"].as_array().map(Vec::len), Some(1));
    // positions and indices
    assert_eq!(json["accessors"].as_array().map(Vec::len), Some(2));
    let attributes = &json["meshes"][0]["primitives"][0]["attributes"];
    assert_eq!(attributes, &json!({ "POSITION": 0 }));
    assert_eq!(
        json["materials"][0]["pbrMetallicRoughness"],
        json!({ "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.0 })
    );
    Ok(())
}

#[test]
fn test_texcoord_sets_are_numbered_from_zero() -> TestResult {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(
        triangle_mesh("Lightmapped")
            .with_uvs(1, vec![Vec2::ZERO, Vec2::X, Vec2::Y])
            .with_uvs(3, vec![Vec2::ONE; 3]),
    );
    let material = scene.add_material(SourceMaterial::standard("Default"));
    let node = scene.add_node(drawn("Lightmapped", material, mesh));
    let options = ExportOptions::new();

    let mut session = ExportSession::new(&scene, "uvs", &options);
    session.add_root(node)?;
    let asset = session.finish()?;

    let attributes = &asset.document.meshes[0].primitives[0].attributes;
    let names: Vec<&str> = attributes.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["POSITION", "TEXCOORD_0", "TEXCOORD_1"]);

    let first_set = asset.document.accessors[attributes["TEXCOORD_0"]].buffer_view;
    let view = &asset.document.buffer_views[first_set];
    let uvs = read_f32s(&asset.buffer[view.byte_offset..view.byte_offset + view.byte_length]);
    assert_eq!(uvs, vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    Ok(())
}

#[test]
fn test_image_names_never_collide() -> TestResult {
    let mut scene = Scene::new();
    let root = scene.add_node(SceneNode::new("Root"));
    let mesh = scene.add_mesh(triangle_mesh("Triangle"));
    for (index, name) in ["x_2", "x", "x", "x"].into_iter().enumerate() {
        let shade = index as f32 / 4.0;
        let texture = Texture::solid(name, 2, 2, Color::rgb(shade, shade, shade));
        let texture = scene.add_texture(texture);
        let material = SourceMaterial::standard(format!("M{index}"))
            .with_texture(TextureParam::MainTex, texture);
        let material = scene.add_material(material);
        scene.add_child(root, drawn(&format!("N{index}"), material, mesh));
    }
    let fs = MemoryFileSystem::new();
    let options = ExportOptions::new().format(GltfFormat::Gltf);

    scene2gltf::export(&scene, &[root], Path::new("out"), "t", &options, &fs)?;

    let json: serde_json::Value = serde_json::from_slice(&fs.get_file("out/t.gltf").unwrap())?;
    let uris: Vec<&str> = json["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["uri"].as_str().unwrap())
        .collect();
    assert_eq!(uris, vec!["t_x_2.png", "t_x.png", "t_x_1.png", "t_x_3.png"]);
    assert_eq!(
        fs.list_files(),
        vec![
            "out/t.bin".to_string(),
            "out/t.gltf".to_string(),
            "out/t_x.png".to_string(),
            "out/t_x_1.png".to_string(),
            "out/t_x_2.png".to_string(),
            "out/t_x_3.png".to_string(),
        ]
    );
    Ok(())
}

// Example showing how to build a small scene in memory and export it
//
// Writes a textured, spinning triangle as `triangle.glb` (or as
// `triangle.gltf` with sidecar files when `--gltf` is passed) into the given
// directory. The result can be opened in any glTF viewer or in Blender.

use glam::{Quat, Vec2, Vec3};
use image::{Rgba, RgbaImage};
use std::path::PathBuf;

use scene2gltf::filesystem::RealFileSystem;
use scene2gltf::{
    AnimatedProperty, AnimationClip, AnimationCurve, Animator, Color, ColorParam, ExportOptions,
    GltfFormat, Keyframe, Renderer, Scene, SceneNode, SourceMaterial, SourceMesh, Texture,
    TextureParam,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let output_dir = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: cargo run --example export_triangle <output_dir> [--gltf]");
            std::process::exit(1);
        }
    };
    let format = if args.any(|arg| arg == "--gltf") {
        GltfFormat::Gltf
    } else {
        GltfFormat::Glb
    };

    let mut scene = Scene::new();

    // 4x4 checkerboard
    let checker = RgbaImage::from_fn(4, 4, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([51, 51, 51, 255])
        }
    });
    let checker = Texture::from_rgba8("checker", &checker);
    let checker = scene.add_texture(checker);

    let material = scene.add_material(
        SourceMaterial::standard("Checker")
            .with_texture(TextureParam::MainTex, checker)
            .with_color(ColorParam::Color, Color::rgb(1.0, 0.8, 0.6)),
    );

    let mesh = scene.add_mesh(
        SourceMesh::new(
            "Triangle",
            vec![
                Vec3::new(-0.5, 0.0, 0.0),
                Vec3::new(0.5, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        )
        .with_normals(vec![Vec3::NEG_Z; 3])
        .with_uvs(0, vec![Vec2::ZERO, Vec2::X, Vec2::new(0.5, 1.0)]),
    );

    // eighth turn around Y per second, as quaternion component curves
    let spin = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
    let curve = |from: f32, to: f32| {
        let slope = to - from;
        AnimationCurve::new(vec![
            Keyframe::new(0.0, from).with_tangents(slope, slope),
            Keyframe::new(1.0, to).with_tangents(slope, slope),
        ])
    };
    let clip = scene.add_clip(
        AnimationClip::new("Spin", 1.0)
            .with_curve("Triangle", AnimatedProperty::LocalRotation, "x", curve(0.0, spin.x))
            .with_curve("Triangle", AnimatedProperty::LocalRotation, "y", curve(0.0, spin.y))
            .with_curve("Triangle", AnimatedProperty::LocalRotation, "z", curve(0.0, spin.z))
            .with_curve("Triangle", AnimatedProperty::LocalRotation, "w", curve(1.0, spin.w)),
    );

    let animator = Animator::default().with_clip("Spin", clip);
    let root = scene.add_node(SceneNode::new("Root").with_animator(animator));
    scene.add_child(root, SceneNode::new("Triangle").with_renderer(Renderer::new(material, mesh)));

    let options = ExportOptions::new().format(format);
    let written =
        scene2gltf::export(&scene, &[root], &output_dir, "triangle", &options, &RealFileSystem)?;

    println!("✓ Export complete!");
    for path in written {
        let size = std::fs::metadata(&path)?.len();
        println!("  {} ({} bytes)", path.display(), size);
    }

    Ok(())
}

//! The export run.
//!
//! An [`ExportSession`] walks the scene from the given roots and builds the
//! glTF document and its binary buffer. Every node, mesh, material, texture,
//! skin and animation goes through the same steps: look it up in the object
//! cache, offer it to the registered extensions, fall back to the built-in
//! export, run the extension post hooks and remember the resulting index.
//!
//! Skins and animations reference nodes by index, so they are exported in
//! [`ExportSession::finish`] after the whole node tree is known.

mod animation;
mod cache;
mod container;
mod extension;
mod handedness;
mod khr_materials_pbr_specular_glossiness;
mod packer;

pub use animation::{BAKE_FRAME_RATE, SampledTrack, Slot, can_export_as_spline, sample_track};
pub use cache::{ObjectCache, ObjectKey, SkinKey};
pub use container::{ExportedAsset, GlbChunks, read_glb, write_glb};
pub use extension::{Extension, ExtensionChain};
pub use khr_materials_pbr_specular_glossiness::KhrMaterialsPbrSpecularGlossiness;
pub use packer::{DataPacker, Element};

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glam::{Mat4, Quat, Vec3, Vec4};
use log::{debug, info, warn};
use serde_json::json;
use tracing::instrument;

use crate::color::gamma_to_linear;
use crate::error::{ExportError, ExportResult};
use crate::filesystem::FileSystem;
use crate::gltf::{
    self, AnimationSampler, BufferTarget, Channel, ChannelTarget, Document, MaterialBuilder,
    PrimitiveMode, Sampler, TargetPath,
};
use crate::image_codec::encode_texture;
use crate::material::{AlphaInfo, CommonInfo, MaterialConverter, RenderMode, TextureRef};
use crate::options::{ExportOptions, ExtensionKind, GltfFormat};
use crate::scene::{
    AnimatedProperty, AnimationCurve, ClipId, CurveBinding, MaterialDescription, MaterialId,
    MeshId, Motion, NodeId, Scene, SceneNode, SkinBinding, SourceMaterial, SourceMesh,
};

/// Largest vertex count that still fits 16-bit indices.
const MAX_SHORT_INDEXED_VERTICES: usize = 65536;

pub(crate) fn unknown(kind: &str) -> ExportError {
    ExportError::unsupported(format!("unknown {kind} id"))
}

/// Exports the subtrees below `roots` and writes the result into
/// `output_dir`. Returns the paths of all written files.
#[instrument(
    skip(scene, roots, options, fs),
    fields(roots = roots.len(), format = ?options.get_format())
)]
pub fn export(
    scene: &Scene,
    roots: &[NodeId],
    output_dir: &Path,
    name: &str,
    options: &ExportOptions,
    fs: &dyn FileSystem,
) -> ExportResult<Vec<PathBuf>> {
    let mut session = ExportSession::new(scene, name, options);
    for root in roots {
        session.add_root(*root)?;
    }
    session.finish()?.write(output_dir, fs)
}

/// State of one export run.
pub struct ExportSession<'a> {
    scene: &'a Scene,
    options: &'a ExportOptions,
    name: String,
    document: Document,
    packer: DataPacker,
    cache: ObjectCache,
    converter: MaterialConverter,
    chain: ExtensionChain,
    /// Nodes on the current export path, to detect cycles.
    in_progress: HashSet<NodeId>,
    /// Output indices of nodes that are some node's child.
    parented: HashSet<usize>,
    roots: Vec<usize>,
    /// Exported skinned renderers as (output node index, source node).
    skinned: Vec<(usize, NodeId)>,
    animated: Vec<NodeId>,
    images: Vec<(String, Vec<u8>)>,
    image_names: HashSet<String>,
    sampler: Option<usize>,
}

impl<'a> ExportSession<'a> {
    /// Starts a run named `name`, registering the extensions enabled in
    /// `options`.
    pub fn new(scene: &'a Scene, name: &str, options: &'a ExportOptions) -> Self {
        let name = sanitize_filename::sanitize(name);
        let mut session = Self {
            scene,
            options,
            name: if name.is_empty() { "scene".to_string() } else { name },
            document: Document::new(options.get_generator()),
            packer: DataPacker::new(),
            cache: ObjectCache::new(),
            converter: MaterialConverter::new(),
            chain: ExtensionChain::new(),
            in_progress: HashSet::new(),
            parented: HashSet::new(),
            roots: Vec::new(),
            skinned: Vec::new(),
            animated: Vec::new(),
            images: Vec::new(),
            image_names: HashSet::new(),
            sampler: None,
        };
        for kind in options.extensions() {
            match kind {
                ExtensionKind::KhrMaterialsPbrSpecularGlossiness => {
                    session.register_extension(Rc::new(KhrMaterialsPbrSpecularGlossiness));
                }
            }
        }
        session
    }

    /// Adds `extension` after the already registered ones.
    pub fn register_extension(&mut self, extension: Rc<dyn Extension>) {
        let name = extension.name().to_string();
        info!("Registering extension {name}");
        if !self.document.extensions_used.contains(&name) {
            self.document.extensions_used.push(name);
        }
        self.chain.register(extension);
    }

    pub fn with_extension(mut self, extension: Rc<dyn Extension>) -> Self {
        self.register_extension(extension);
        self
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    pub fn options(&self) -> &'a ExportOptions {
        self.options
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn converter(&self) -> &MaterialConverter {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut MaterialConverter {
        &mut self.converter
    }

    pub fn packer_mut(&mut self) -> &mut DataPacker {
        &mut self.packer
    }

    /// Packs `values` into the buffer and returns the new accessor index.
    pub fn append<T: Element>(
        &mut self,
        values: &[T],
        with_bounds: bool,
        target: Option<BufferTarget>,
    ) -> ExportResult<usize> {
        self.packer.append(&mut self.document, values, with_bounds, target)
    }

    pub fn node(&self, node: NodeId) -> ExportResult<&'a SceneNode> {
        self.scene.node(node).ok_or_else(|| unknown("node"))
    }

    pub fn mesh(&self, mesh: MeshId) -> ExportResult<&'a SourceMesh> {
        self.scene.mesh(mesh).ok_or_else(|| unknown("mesh"))
    }

    pub fn material(&self, material: MaterialId) -> ExportResult<&'a SourceMaterial> {
        self.scene.material(material).ok_or_else(|| unknown("material"))
    }

    /// Exports the subtree below `node` as a scene root.
    pub fn add_root(&mut self, node: NodeId) -> ExportResult<usize> {
        let index = self.export_node(node)?;
        if self.parented.contains(&index) {
            return Err(ExportError::unsupported(format!(
                "root '{}' is also a child of another exported node",
                self.node(node)?.name
            )));
        }
        if !self.roots.contains(&index) {
            self.roots.push(index);
        }
        Ok(index)
    }

    /// Exports skins and animations and hands out the finished asset.
    #[instrument(skip(self), fields(name = %self.name))]
    pub fn finish(mut self) -> ExportResult<ExportedAsset> {
        self.export_skins()?;
        self.export_animations()?;

        self.document.scene = 0;
        self.document.scenes.push(gltf::Scene {
            nodes: self.roots.clone(),
        });

        let format = self.options.get_format();
        if !self.packer.is_empty() {
            self.document.buffers.push(gltf::Buffer {
                byte_length: self.packer.len(),
                uri: match format {
                    GltfFormat::Glb => None,
                    GltfFormat::Gltf => Some(format!("{}.bin", self.name)),
                },
            });
        }

        info!(
            "Exported '{}': {} nodes, {} meshes, {} materials, {} textures, {} buffer bytes",
            self.name,
            self.document.nodes.len(),
            self.document.meshes.len(),
            self.document.materials.len(),
            self.document.textures.len(),
            self.packer.len()
        );

        Ok(ExportedAsset {
            name: self.name,
            format,
            json_formatting: self.options.get_json_formatting(),
            document: self.document,
            buffer: self.packer.into_bytes(),
            images: self.images,
        })
    }

    fn export_entity(
        &mut self,
        key: ObjectKey,
        try_extension: impl Fn(&dyn Extension, &mut Self) -> ExportResult<Option<usize>>,
        core: impl FnOnce(&mut Self) -> ExportResult<usize>,
        post_export: impl Fn(&dyn Extension, &mut Self, usize) -> ExportResult<()>,
    ) -> ExportResult<usize> {
        if let Some(index) = self.cache.resolve(&key) {
            return Ok(index);
        }

        let chain = self.chain.clone();
        let overridden = chain.try_override(|extension| try_extension(extension, self))?;
        let index = match overridden {
            Some(index) => index,
            None => core(self)?,
        };
        chain.notify(|extension| post_export(extension, self, index))?;

        self.cache.record(key, index);
        Ok(index)
    }

    pub fn export_node(&mut self, node: NodeId) -> ExportResult<usize> {
        let key = ObjectKey::Node(node);
        if self.cache.resolve(&key).is_none() && !self.in_progress.insert(node) {
            return Err(ExportError::unsupported(format!(
                "node '{}' is its own ancestor",
                self.node(node)?.name
            )));
        }

        let result = self.export_entity(
            key,
            |extension, session| extension.export_node(session, node),
            |session| session.export_node_core(node),
            |extension, session, index| extension.post_export_node(session, node, index),
        );
        self.in_progress.remove(&node);
        result
    }

    fn export_node_core(&mut self, id: NodeId) -> ExportResult<usize> {
        let node = self.node(id)?;

        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            if !self.node(*child)?.active {
                continue;
            }
            if self.cache.resolve(&ObjectKey::Node(*child)).is_some() {
                return Err(ExportError::unsupported(format!(
                    "node '{}' has more than one parent",
                    self.node(*child)?.name
                )));
            }
            let index = self.export_node(*child)?;
            self.parented.insert(index);
            children.push(index);
        }

        let translation = handedness::position(node.transform.translation);
        let rotation = handedness::rotation(node.transform.rotation);
        let scale = node.transform.scale;
        let mut output = gltf::Node {
            name: Some(node.name.clone()),
            children,
            translation: (translation != Vec3::ZERO).then(|| translation.to_array()),
            rotation: (rotation != Quat::IDENTITY).then(|| rotation.to_array()),
            scale: (scale != Vec3::ONE).then(|| scale.to_array()),
            ..Default::default()
        };

        let mut skinned = false;
        if let Some(renderer) = &node.renderer {
            if let Some(mesh_id) = renderer.mesh {
                let mesh = self.mesh(mesh_id)?;
                if mesh.indices.is_empty() {
                    debug!("Skipping empty mesh '{}' on node '{}'", mesh.name, node.name);
                } else {
                    let material = self.export_material(renderer.material)?;
                    output.mesh = Some(self.export_mesh(mesh_id, Some(material))?);
                    output.weights = (0..mesh.blend_shapes.len())
                        .map(|shape| {
                            renderer.blend_shape_weights.get(shape).copied().unwrap_or(0.0) / 100.0
                        })
                        .collect();
                    skinned = renderer.skin.is_some();
                }
            }
        }

        let index = self.document.nodes.len();
        self.document.nodes.push(output);
        if skinned {
            self.skinned.push((index, id));
        }
        if node.animator.is_some() {
            self.animated.push(id);
        }
        Ok(index)
    }

    /// `material` is the output material index the primitive is drawn with.
    pub fn export_mesh(&mut self, mesh: MeshId, material: Option<usize>) -> ExportResult<usize> {
        self.export_entity(
            ObjectKey::Mesh { mesh, material },
            |extension, session| extension.export_mesh(session, mesh, material),
            |session| session.export_mesh_core(mesh, material),
            |extension, session, index| extension.post_export_mesh(session, mesh, material, index),
        )
    }

    fn export_mesh_core(&mut self, id: MeshId, material: Option<usize>) -> ExportResult<usize> {
        let mesh = self.mesh(id)?;
        validate_mesh(mesh)?;

        let mut attributes = BTreeMap::new();
        let vertex = Some(BufferTarget::ArrayBuffer);

        let positions: Vec<Vec3> = mesh
            .positions
            .iter()
            .copied()
            .map(handedness::position)
            .collect();
        attributes.insert("POSITION".to_string(), self.append(&positions, true, vertex)?);

        if !mesh.normals.is_empty() {
            let normals: Vec<Vec3> = mesh.normals.iter().copied().map(handedness::normal).collect();
            attributes.insert("NORMAL".to_string(), self.append(&normals, false, vertex)?);
        }

        if !mesh.tangents.is_empty() {
            let tangents: Vec<Vec4> = mesh
                .tangents
                .iter()
                .copied()
                .map(handedness::tangent)
                .collect();
            attributes.insert("TANGENT".to_string(), self.append(&tangents, false, vertex)?);
        }

        // empty slots are skipped so the exported sets stay contiguous from 0
        let uv_sets = mesh.uvs.iter().filter(|uvs| !uvs.is_empty());
        for (set, uvs) in uv_sets.enumerate() {
            let uvs: Vec<_> = uvs.iter().copied().map(handedness::uv).collect();
            attributes.insert(format!("TEXCOORD_{set}"), self.append(&uvs, false, vertex)?);
        }

        if !mesh.colors.is_empty() {
            let colors: Vec<Vec4> = mesh
                .colors
                .iter()
                .map(|color| Vec4::from_array(color.to_array()))
                .collect();
            attributes.insert("COLOR_0".to_string(), self.append(&colors, false, vertex)?);
        }

        if !mesh.bone_weights.is_empty() {
            let joints = mesh
                .bone_weights
                .iter()
                .map(|weight| joint_indices(weight.indices))
                .collect::<ExportResult<Vec<_>>>()?;
            let weights: Vec<Vec4> = mesh
                .bone_weights
                .iter()
                .map(|weight| Vec4::from_array(weight.weights))
                .collect();
            attributes.insert("JOINTS_0".to_string(), self.append(&joints, false, vertex)?);
            attributes.insert("WEIGHTS_0".to_string(), self.append(&weights, false, vertex)?);
        }

        let indices = handedness::flip_faces(&mesh.indices)?;
        let index_target = Some(BufferTarget::ElementArrayBuffer);
        let indices = if mesh.vertex_count() <= MAX_SHORT_INDEXED_VERTICES {
            let short: Vec<u16> = indices.iter().map(|index| *index as u16).collect();
            self.append(&short, false, index_target)?
        } else {
            self.append(&indices, false, index_target)?
        };

        let mut targets = Vec::with_capacity(mesh.blend_shapes.len());
        for shape in &mesh.blend_shapes {
            let mut target = BTreeMap::new();
            if !shape.delta_positions.is_empty() {
                let deltas: Vec<Vec3> = shape
                    .delta_positions
                    .iter()
                    .copied()
                    .map(handedness::position)
                    .collect();
                target.insert("POSITION".to_string(), self.append(&deltas, true, vertex)?);
            }
            if !shape.delta_normals.is_empty() {
                let deltas: Vec<Vec3> = shape
                    .delta_normals
                    .iter()
                    .copied()
                    .map(handedness::normal)
                    .collect();
                target.insert("NORMAL".to_string(), self.append(&deltas, false, vertex)?);
            }
            if !shape.delta_tangents.is_empty() {
                let deltas: Vec<Vec3> = shape
                    .delta_tangents
                    .iter()
                    .copied()
                    .map(handedness::normal)
                    .collect();
                target.insert("TANGENT".to_string(), self.append(&deltas, false, vertex)?);
            }
            if target.is_empty() {
                return Err(ExportError::unsupported(format!(
                    "blend shape '{}' of mesh '{}' has no deltas",
                    shape.name, mesh.name
                )));
            }
            targets.push(target);
        }

        let extras = (!mesh.blend_shapes.is_empty()).then(|| {
            let names: Vec<&str> = mesh
                .blend_shapes
                .iter()
                .map(|shape| shape.name.as_str())
                .collect();
            json!({ "targetNames": names })
        });

        let index = self.document.meshes.len();
        self.document.meshes.push(gltf::Mesh {
            name: Some(mesh.name.clone()),
            primitives: vec![gltf::Primitive {
                attributes,
                indices: Some(indices),
                material,
                mode: PrimitiveMode::Triangles,
                targets,
            }],
            extras,
        });
        Ok(index)
    }

    pub fn export_material(&mut self, material: MaterialId) -> ExportResult<usize> {
        self.export_entity(
            ObjectKey::Material(material),
            |extension, session| extension.export_material(session, material),
            |session| session.export_material_core(material, true),
            |extension, session, index| extension.post_export_material(session, material, index),
        )
    }

    /// The built-in material export, without cache or extensions.
    ///
    /// Without `include_occlusion` the occlusion map is left for the caller.
    pub fn export_material_core(
        &mut self,
        id: MaterialId,
        include_occlusion: bool,
    ) -> ExportResult<usize> {
        let scene = self.scene;
        let material = self.material(id)?;
        let metallic = self.converter.to_metallic(scene, material)?;
        let common = CommonInfo::read(material);
        let alpha = AlphaInfo::read(material);

        let mut builder =
            MaterialBuilder::new(material.name()).base_color(metallic.color.linear().to_array());
        if let Some(main_tex) = metallic.main_tex {
            builder = builder.base_color_texture(Some(self.export_texture(main_tex, false)?));
        }

        let mut occlusion_done = !include_occlusion;
        match metallic.metallic_gloss_map {
            Some(map) => {
                let packed = common
                    .occlusion
                    .occlusion_map
                    .filter(|_| include_occlusion && self.options.is_packing_occlusion());
                let derived = self.converter.metallic_roughness_texture(
                    scene,
                    map,
                    metallic.gloss_map_scale,
                    packed,
                )?;
                let texture = self.export_texture(derived, false)?;
                builder = builder.metallic_roughness_texture(texture);
                if packed.is_some() {
                    builder =
                        builder.occlusion_texture(texture, common.occlusion.occlusion_strength);
                    occlusion_done = true;
                }
            }
            None => {
                builder = builder.metallic_roughness(
                    gamma_to_linear(metallic.metallic),
                    1.0 - metallic.glossiness,
                );
            }
        }

        if let Some(bump_map) = common.bump_map {
            let normal_map = if self.converter.texture(scene, bump_map)?.packed_normal {
                self.converter.unpacked_normal(scene, bump_map)?
            } else {
                bump_map
            };
            let texture = self.export_texture(normal_map, true)?;
            builder = builder.normal_texture(texture, common.bump_scale);
        }

        if let (false, Some(occlusion_map)) = (occlusion_done, common.occlusion.occlusion_map) {
            builder = builder.occlusion_texture(
                self.export_texture(occlusion_map, false)?,
                common.occlusion.occlusion_strength,
            );
        }

        let emission = common.emission_color.linear();
        builder = builder.emissive([
            emission.r.clamp(0.0, 1.0),
            emission.g.clamp(0.0, 1.0),
            emission.b.clamp(0.0, 1.0),
        ]);
        if let Some(emission_map) = common.emission_map {
            builder = builder.emissive_texture(Some(self.export_texture(emission_map, false)?));
        }

        builder = match alpha.mode {
            RenderMode::Opaque => builder,
            RenderMode::Cutout => builder.alpha_mask(alpha.cutoff),
            RenderMode::Transparent => builder.alpha_blend(),
        };
        let double_sided_mask =
            alpha.mode == RenderMode::Cutout && self.options.is_double_sided_mask();
        builder = builder.double_sided_if(alpha.cull_off || double_sided_mask);

        let index = self.document.materials.len();
        self.document.materials.push(builder.build());
        Ok(index)
    }

    /// Exports a scene or derived texture. Normal maps are never lossy
    /// compressed.
    pub fn export_texture(&mut self, texture: TextureRef, normal_map: bool) -> ExportResult<usize> {
        self.export_entity(
            ObjectKey::Texture { texture, normal_map },
            |extension, session| extension.export_texture(session, texture, normal_map),
            |session| session.export_texture_core(texture, normal_map),
            |extension, session, index| {
                extension.post_export_texture(session, texture, normal_map, index)
            },
        )
    }

    fn export_texture_core(
        &mut self,
        texture: TextureRef,
        normal_map: bool,
    ) -> ExportResult<usize> {
        let source = self.converter.texture(self.scene, texture)?;
        let encoded = encode_texture(
            source,
            self.options.get_image_codec(),
            self.options.get_jpeg_quality(),
            normal_map,
        )?;
        let texture_name = source.name.clone();

        let image_index = self.document.images.len();
        let image = match self.options.get_format() {
            GltfFormat::Glb => {
                let buffer_view = self.packer.append_bytes(&mut self.document, &encoded.bytes)?;
                gltf::Image {
                    name: Some(texture_name.clone()),
                    uri: None,
                    mime_type: Some(encoded.mime_type.to_string()),
                    buffer_view: Some(buffer_view),
                }
            }
            GltfFormat::Gltf => {
                let file_name = self.image_file_name(&texture_name, encoded.extension);
                debug!("Writing image '{texture_name}' as {file_name}");
                self.images.push((file_name.clone(), encoded.bytes));
                gltf::Image {
                    name: Some(texture_name.clone()),
                    uri: Some(file_name),
                    mime_type: None,
                    buffer_view: None,
                }
            }
        };
        self.document.images.push(image);

        let sampler = self.shared_sampler();
        let index = self.document.textures.len();
        self.document.textures.push(gltf::Texture {
            name: Some(texture_name),
            sampler,
            source: image_index,
        });
        Ok(index)
    }

    fn image_file_name(&mut self, texture_name: &str, extension: &str) -> String {
        let stem = sanitize_filename::sanitize(format!("{}_{texture_name}", self.name))
            .replace(' ', "_");
        let mut file_name = format!("{stem}.{extension}");
        let mut suffix = 1;
        while self.image_names.contains(&file_name) {
            file_name = format!("{stem}_{suffix}.{extension}");
            suffix += 1;
        }
        self.image_names.insert(file_name.clone());
        file_name
    }

    fn shared_sampler(&mut self) -> usize {
        *self.sampler.get_or_insert_with(|| {
            self.document.samplers.push(Sampler::linear_repeat());
            self.document.samplers.len() - 1
        })
    }

    fn exported_node(&self, node: NodeId) -> ExportResult<usize> {
        self.cache.resolve(&ObjectKey::Node(node)).ok_or_else(|| {
            let name = self.scene.node(node).map_or("?", |node| node.name.as_str());
            ExportError::unsupported(format!("node '{name}' is referenced but was not exported"))
        })
    }

    fn skinned_renderer(&self, node: NodeId) -> ExportResult<(&'a SourceMesh, &'a SkinBinding)> {
        let scene_node = self.node(node)?;
        let renderer = scene_node.renderer.as_ref();
        match renderer.and_then(|renderer| Some((renderer.mesh?, renderer.skin.as_ref()?))) {
            Some((mesh, skin)) => Ok((self.mesh(mesh)?, skin)),
            None => Err(ExportError::unsupported(format!(
                "node '{}' has no skinned renderer",
                scene_node.name
            ))),
        }
    }

    fn export_skins(&mut self) -> ExportResult<()> {
        for (index, node) in std::mem::take(&mut self.skinned) {
            let skin = self.export_skin(node)?;
            self.document.nodes[index].skin = Some(skin);
        }
        Ok(())
    }

    /// Exports the skin of the renderer on `node`. Renderers with equal bind
    /// poses and bones share one skin.
    pub fn export_skin(&mut self, node: NodeId) -> ExportResult<usize> {
        let (mesh, binding) = self.skinned_renderer(node)?;
        self.export_entity(
            ObjectKey::Skin(SkinKey::new(&mesh.bind_poses, binding)),
            |extension, session| extension.export_skin(session, node),
            |session| session.export_skin_core(node),
            |extension, session, index| extension.post_export_skin(session, node, index),
        )
    }

    fn export_skin_core(&mut self, node: NodeId) -> ExportResult<usize> {
        let (mesh, binding) = self.skinned_renderer(node)?;

        let joints = binding
            .bones
            .iter()
            .map(|bone| self.exported_node(*bone))
            .collect::<ExportResult<Vec<_>>>()?;
        let skeleton = binding.root_bone.map(|root| self.exported_node(root)).transpose()?;

        let inverse_bind_matrices = if mesh.bind_poses.is_empty() {
            None
        } else {
            if mesh.bind_poses.len() != binding.bones.len() {
                return Err(ExportError::unsupported(format!(
                    "mesh '{}' has {} bind poses for {} bones",
                    mesh.name,
                    mesh.bind_poses.len(),
                    binding.bones.len()
                )));
            }
            let matrices: Vec<Mat4> = mesh
                .bind_poses
                .iter()
                .copied()
                .map(handedness::matrix)
                .collect();
            Some(self.append(&matrices, false, None)?)
        };

        let index = self.document.skins.len();
        self.document.skins.push(gltf::Skin {
            inverse_bind_matrices,
            skeleton,
            joints,
        });
        Ok(index)
    }

    fn export_animations(&mut self) -> ExportResult<()> {
        for node in std::mem::take(&mut self.animated) {
            let Some(animator) = &self.node(node)?.animator else {
                continue;
            };
            for state in &animator.states {
                match &state.motion {
                    None => {}
                    Some(Motion::BlendTree { name }) => {
                        return Err(ExportError::unsupported(format!(
                            "blend tree '{name}' in state '{}'",
                            state.name
                        )));
                    }
                    Some(Motion::Clip(clip)) => {
                        let scene_clip = self.scene.clip(*clip).ok_or_else(|| unknown("clip"))?;
                        if scene_clip.bindings.is_empty() {
                            debug!("Skipping clip '{}' without curves", scene_clip.name);
                            continue;
                        }
                        self.export_animation(node, *clip)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Exports `clip` as played by the animator on `node`. Curve paths are
    /// resolved relative to `node`.
    pub fn export_animation(&mut self, node: NodeId, clip: ClipId) -> ExportResult<usize> {
        self.export_entity(
            ObjectKey::Animation { node, clip },
            |extension, session| extension.export_animation(session, node, clip),
            |session| session.export_animation_core(node, clip),
            |extension, session, index| extension.post_export_animation(session, node, clip, index),
        )
    }

    fn export_animation_core(&mut self, node: NodeId, clip_id: ClipId) -> ExportResult<usize> {
        let scene = self.scene;
        let clip = scene.clip(clip_id).ok_or_else(|| unknown("clip"))?;
        let bake = self.options.is_baking_animations();

        let mut groups: BTreeMap<(&str, AnimatedProperty), Vec<&CurveBinding>> = BTreeMap::new();
        for binding in &clip.bindings {
            groups
                .entry((binding.path.as_str(), binding.property))
                .or_default()
                .push(binding);
        }
        if groups.is_empty() {
            return Err(ExportError::unsupported(format!("clip '{}' has no curves", clip.name)));
        }

        let mut animation = gltf::Animation {
            name: Some(clip.name.clone()),
            channels: Vec::new(),
            samplers: Vec::new(),
        };

        for ((path, property), bindings) in groups {
            let target_node = scene.find_path(node, path).ok_or_else(|| {
                ExportError::unsupported(format!(
                    "clip '{}' animates missing node '{path}'",
                    clip.name
                ))
            })?;
            let target = self.exported_node(target_node)?;

            let (target_path, sampler) = match property {
                AnimatedProperty::LocalPosition => {
                    let curves = member_curves(&bindings, &["x", "y", "z"], &clip.name)?;
                    let track = sample_track(&curves, bake, |_, c| {
                        handedness::position(Vec3::new(c[0], c[1], c[2]))
                    });
                    (TargetPath::Translation, self.append_track(&track)?)
                }
                AnimatedProperty::LocalRotation => {
                    let curves = member_curves(&bindings, &["x", "y", "z", "w"], &clip.name)?;
                    let track = sample_track(&curves, bake, |slot, c| {
                        let rotation = Vec4::new(-c[0], -c[1], c[2], c[3]);
                        match slot {
                            Slot::Value => rotation.normalize_or_zero(),
                            Slot::InTangent | Slot::OutTangent => rotation,
                        }
                    });
                    (TargetPath::Rotation, self.append_track(&track)?)
                }
                AnimatedProperty::LocalScale => {
                    let curves = member_curves(&bindings, &["x", "y", "z"], &clip.name)?;
                    let track = sample_track(&curves, bake, |_, c| Vec3::new(c[0], c[1], c[2]));
                    (TargetPath::Scale, self.append_track(&track)?)
                }
                AnimatedProperty::BlendShape => {
                    let track =
                        self.sample_weights(target_node, &bindings, clip.length, &clip.name)?;
                    (TargetPath::Weights, self.append_track(&track)?)
                }
            };

            animation.channels.push(Channel {
                sampler: animation.samplers.len(),
                target: ChannelTarget {
                    node: target,
                    path: target_path,
                },
            });
            animation.samplers.push(sampler);
        }

        let index = self.document.animations.len();
        self.document.animations.push(animation);
        Ok(index)
    }

    /// One weight per blend shape and sample, in percent divided by 100.
    /// Blend shapes without a curve keep the renderer's current weight.
    fn sample_weights(
        &self,
        node: NodeId,
        bindings: &[&CurveBinding],
        length: f32,
        clip_name: &str,
    ) -> ExportResult<SampledTrack<f32>> {
        let scene_node = self.node(node)?;
        let renderer = scene_node.renderer.as_ref();
        let mesh = match renderer.and_then(|renderer| renderer.mesh) {
            Some(mesh) => self.mesh(mesh)?,
            None => {
                return Err(ExportError::unsupported(format!(
                    "clip '{clip_name}' animates blend shapes of '{}' which has no mesh",
                    scene_node.name
                )));
            }
        };
        if mesh.blend_shapes.is_empty() {
            return Err(ExportError::unsupported(format!(
                "clip '{clip_name}' animates blend shapes of mesh '{}' which has none",
                mesh.name
            )));
        }

        for binding in bindings {
            if !mesh.blend_shapes.iter().any(|shape| shape.name == binding.member) {
                warn!(
                    "Ignoring curve for unknown blend shape '{}' in clip '{clip_name}'",
                    binding.member
                );
            }
        }

        let current_weights =
            renderer.map_or(&[][..], |renderer| &renderer.blend_shape_weights[..]);
        let constants: Vec<AnimationCurve> = (0..mesh.blend_shapes.len())
            .map(|shape| {
                let weight = current_weights.get(shape).copied().unwrap_or(0.0);
                AnimationCurve::constant(length, weight)
            })
            .collect();
        let curves: Vec<&AnimationCurve> = mesh
            .blend_shapes
            .iter()
            .zip(&constants)
            .map(|(shape, constant)| {
                bindings
                    .iter()
                    .find(|binding| binding.member == shape.name)
                    .map_or(constant, |binding| &binding.curve)
            })
            .collect();

        let track = sample_track(&curves, self.options.is_baking_animations(), |_, c| {
            c.iter().map(|weight| weight / 100.0).collect::<Vec<_>>()
        });
        Ok(SampledTrack {
            interpolation: track.interpolation,
            times: track.times,
            values: track.values.into_iter().flatten().collect(),
        })
    }

    fn append_track<T: Element>(
        &mut self,
        track: &SampledTrack<T>,
    ) -> ExportResult<AnimationSampler> {
        let input = self.append(&track.times, true, None)?;
        let output = self.append(&track.values, false, None)?;
        Ok(AnimationSampler {
            input,
            interpolation: track.interpolation,
            output,
        })
    }
}

fn member_curves<'c>(
    bindings: &[&'c CurveBinding],
    members: &[&str],
    clip_name: &str,
) -> ExportResult<Vec<&'c AnimationCurve>> {
    members
        .iter()
        .map(|member| {
            bindings
                .iter()
                .find(|binding| binding.member == *member)
                .map(|binding| &binding.curve)
                .ok_or_else(|| {
                    let binding = bindings
                        .first()
                        .map(|binding| (binding.path.as_str(), binding.property));
                    ExportError::unsupported(format!(
                        "clip '{clip_name}' has no '{member}' curve for {binding:?}"
                    ))
                })
        })
        .collect()
}

fn joint_indices(indices: [u32; 4]) -> ExportResult<[u16; 4]> {
    let mut joints = [0u16; 4];
    for (joint, index) in joints.iter_mut().zip(indices) {
        *joint = u16::try_from(index).map_err(|_| {
            ExportError::unsupported(format!("bone index {index} does not fit 16 bits"))
        })?;
    }
    Ok(joints)
}

fn validate_mesh(mesh: &SourceMesh) -> ExportResult<()> {
    let vertex_count = mesh.vertex_count();
    if vertex_count == 0 {
        return Err(ExportError::unsupported(format!("mesh '{}' has no vertices", mesh.name)));
    }

    let check = |attribute: &str, length: usize| {
        if length == 0 || length == vertex_count {
            Ok(())
        } else {
            Err(ExportError::unsupported(format!(
                "mesh '{}' has {length} {attribute} for {vertex_count} vertices",
                mesh.name
            )))
        }
    };
    check("normals", mesh.normals.len())?;
    check("tangents", mesh.tangents.len())?;
    for uvs in &mesh.uvs {
        check("uvs", uvs.len())?;
    }
    check("colors", mesh.colors.len())?;
    check("bone weights", mesh.bone_weights.len())?;
    for shape in &mesh.blend_shapes {
        check("blend shape positions", shape.delta_positions.len())?;
        check("blend shape normals", shape.delta_normals.len())?;
        check("blend shape tangents", shape.delta_tangents.len())?;
    }

    let max = mesh.indices.iter().copied().max().unwrap_or(0);
    if max as usize >= vertex_count {
        return Err(ExportError::unsupported(format!(
            "mesh '{}' indexes vertex {max} of {vertex_count}",
            mesh.name
        )));
    }
    Ok(())
}

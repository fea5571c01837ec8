//! glTF 2.0 document model.
//!
//! Only the parts of the schema the exporter writes are modelled. Fields that
//! carry their glTF default value are left out of the serialized JSON.
//!
//! <https://registry.khronos.org/glTF/specs/2.0/glTF-2.0.html>
//!

use serde::Serialize;
use serde_json::Value;
use serde_repr::Serialize_repr;
use std::collections::BTreeMap;

use crate::options::JsonFormatting;

// Sampler filter modes (from OpenGL ES 2.0)
pub(crate) const GLTF_FILTER_LINEAR: u32 = 9729;
pub(crate) const GLTF_FILTER_LINEAR_MIPMAP_LINEAR: u32 = 9987;

// Sampler wrap modes (from OpenGL ES 2.0)
pub(crate) const GLTF_WRAP_REPEAT: u32 = 10497;

fn is_zero(value: &usize) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_one(value: &f32) -> bool {
    *value == 1.0
}

fn is_white(value: &[f32; 4]) -> bool {
    *value == [1.0, 1.0, 1.0, 1.0]
}

fn is_black(value: &[f32; 3]) -> bool {
    *value == [0.0, 0.0, 0.0]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_repr)]
#[repr(u32)]
pub enum ComponentType {
    Byte = 5120,
    UnsignedByte = 5121,
    Short = 5122,
    UnsignedShort = 5123,
    UnsignedInt = 5125,
    Float = 5126,
}

impl ComponentType {
    pub fn byte_size(&self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl AccessorType {
    /// Number of components per element.
    pub fn arity(&self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 => 4,
            AccessorType::Mat4 => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr)]
#[repr(u32)]
pub enum PrimitiveMode {
    Triangles = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr)]
#[repr(u32)]
pub enum BufferTarget {
    ArrayBuffer = 34962,
    ElementArrayBuffer = 34963,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpolation {
    Linear,
    CubicSpline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
}

/// Alpha blending mode for glTF materials.
///
/// According to the glTF 2.0 specification, when `alphaMode` is not specified,
/// the default is `OPAQUE`, so opaque materials do not write the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaMode {
    /// The rendered output is fully opaque and any alpha value is ignored. (default)
    #[default]
    Opaque,
    /// Alpha values below `alphaCutoff` are rendered as fully transparent,
    /// above as fully opaque.
    Mask,
    /// Alpha value is used to composite source and destination areas.
    Blend,
}

impl AlphaMode {
    fn is_opaque(&self) -> bool {
        *self == AlphaMode::Opaque
    }
}

/// Texture reference info for glTF.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    /// The index of the texture in the glTF textures array.
    pub index: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub tex_coord: usize,
}

impl TextureInfo {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            tex_coord: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureInfo {
    pub index: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub tex_coord: usize,
    #[serde(skip_serializing_if = "is_one")]
    pub scale: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureInfo {
    pub index: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub tex_coord: usize,
    #[serde(skip_serializing_if = "is_one")]
    pub strength: f32,
}

/// PBR metallic roughness properties for glTF materials.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    /// The linear RGBA base color factor.
    #[serde(skip_serializing_if = "is_white")]
    pub base_color_factor: [f32; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfo>,
    /// The metalness of the material (0.0 = dielectric, 1.0 = metal).
    #[serde(skip_serializing_if = "is_one")]
    pub metallic_factor: f32,
    /// The roughness of the material (0.0 = smooth, 1.0 = rough).
    #[serde(skip_serializing_if = "is_one")]
    pub roughness_factor: f32,
    /// Roughness in G, metalness in B.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<NormalTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureInfo>,
    #[serde(skip_serializing_if = "is_black")]
    pub emissive_factor: [f32; 3],
    #[serde(skip_serializing_if = "AlphaMode::is_opaque")]
    pub alpha_mode: AlphaMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_cutoff: Option<f32>,
    #[serde(skip_serializing_if = "is_false")]
    pub double_sided: bool,
    /// Extension payloads keyed by extension name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
}

/// A builder for glTF materials.
///
/// Everything except the name is optional; unset properties keep their glTF
/// defaults and are not serialized.
///
/// - `.base_color()` - linear RGBA base color factor
/// - `.base_color_texture()` - base color texture index
/// - `.metallic_roughness()` - scalar factors
/// - `.alpha_blend()` / `.alpha_mask()` - alpha blending mode
/// - `.double_sided()` - render both sides
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialBuilder {
    material: Material,
}

impl MaterialBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            material: Material {
                name: Some(name.into()),
                pbr_metallic_roughness: PbrMetallicRoughness::default(),
                normal_texture: None,
                occlusion_texture: None,
                emissive_texture: None,
                emissive_factor: [0.0, 0.0, 0.0],
                alpha_mode: AlphaMode::Opaque,
                alpha_cutoff: None,
                double_sided: false,
                extensions: BTreeMap::new(),
            },
        }
    }

    /// Set the base color factor (linear RGBA, 0-1 range).
    ///
    /// This color is multiplied with the base color texture if one is set.
    pub fn base_color(mut self, color: [f32; 4]) -> Self {
        self.material.pbr_metallic_roughness.base_color_factor = color;
        self
    }

    /// Optionally set the base color texture index.
    pub fn base_color_texture(mut self, texture_idx: Option<usize>) -> Self {
        self.material.pbr_metallic_roughness.base_color_texture = texture_idx.map(TextureInfo::new);
        self
    }

    pub fn metallic_roughness(mut self, metallic: f32, roughness: f32) -> Self {
        self.material.pbr_metallic_roughness.metallic_factor = metallic;
        self.material.pbr_metallic_roughness.roughness_factor = roughness;
        self
    }

    pub fn metallic_roughness_texture(mut self, texture_idx: usize) -> Self {
        self.material.pbr_metallic_roughness.metallic_roughness_texture =
            Some(TextureInfo::new(texture_idx));
        self
    }

    pub fn normal_texture(mut self, texture_idx: usize, scale: f32) -> Self {
        self.material.normal_texture = Some(NormalTextureInfo {
            index: texture_idx,
            tex_coord: 0,
            scale,
        });
        self
    }

    pub fn occlusion_texture(mut self, texture_idx: usize, strength: f32) -> Self {
        self.material.occlusion_texture = Some(OcclusionTextureInfo {
            index: texture_idx,
            tex_coord: 0,
            strength,
        });
        self
    }

    /// Set the linear RGB emissive factor.
    pub fn emissive(mut self, color: [f32; 3]) -> Self {
        self.material.emissive_factor = color;
        self
    }

    pub fn emissive_texture(mut self, texture_idx: Option<usize>) -> Self {
        self.material.emissive_texture = texture_idx.map(TextureInfo::new);
        self
    }

    /// Set alpha mode to BLEND for transparent materials.
    pub fn alpha_blend(mut self) -> Self {
        self.material.alpha_mode = AlphaMode::Blend;
        self.material.alpha_cutoff = None;
        self
    }

    /// Set alpha mode to MASK with the given cutoff value.
    ///
    /// Pixels with alpha below the cutoff are fully transparent, pixels above
    /// it fully opaque.
    pub fn alpha_mask(mut self, cutoff: f32) -> Self {
        self.material.alpha_mode = AlphaMode::Mask;
        self.material.alpha_cutoff = Some(cutoff);
        self
    }

    /// Conditionally mark the material as double-sided.
    pub fn double_sided_if(mut self, condition: bool) -> Self {
        self.material.double_sided |= condition;
        self
    }

    pub fn build(self) -> Material {
        self.material
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    pub mode: PrimitiveMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<BTreeMap<String, usize>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mesh {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Texture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sampler: usize,
    pub source: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sampler {
    pub mag_filter: u32,
    pub min_filter: u32,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

impl Sampler {
    /// Trilinear filtering with repeat wrapping.
    pub fn linear_repeat() -> Self {
        Self {
            mag_filter: GLTF_FILTER_LINEAR,
            min_filter: GLTF_FILTER_LINEAR_MIPMAP_LINEAR,
            wrap_s: GLTF_WRAP_REPEAT,
            wrap_t: GLTF_WRAP_REPEAT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: usize,
    pub component_type: ComponentType,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: AccessorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Bounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Bounds>,
}

/// Per-component accessor bounds, typed like the accessor's components.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Bounds {
    Float(Vec<f32>),
    Integer(Vec<u32>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<BufferTarget>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    /// Unpadded payload length.
    pub byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverse_bind_matrices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<usize>,
    pub joints: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelTarget {
    pub node: usize,
    pub path: TargetPath,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub sampler: usize,
    pub target: ChannelTarget,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnimationSampler {
    pub input: usize,
    pub interpolation: Interpolation,
    pub output: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Animation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub channels: Vec<Channel>,
    pub samplers: Vec<AnimationSampler>,
}

/// The root of a glTF asset.
///
/// Every index stored in one of the entities points into one of the
/// sequences of the same document. Sequences only ever grow during an export.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Asset,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    pub scene: usize,
    pub scenes: Vec<Scene>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samplers: Vec<Sampler>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skins: Vec<Skin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<Animation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
}

impl Document {
    pub fn new(generator: &str) -> Self {
        Self {
            asset: Asset {
                version: "2.0".to_string(),
                generator: (!generator.is_empty()).then(|| generator.to_string()),
            },
            extensions_used: Vec::new(),
            scene: 0,
            scenes: Vec::new(),
            nodes: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            images: Vec::new(),
            samplers: Vec::new(),
            skins: Vec::new(),
            animations: Vec::new(),
            accessors: Vec::new(),
            buffer_views: Vec::new(),
            buffers: Vec::new(),
        }
    }

    pub fn to_json_bytes(&self, formatting: JsonFormatting) -> serde_json::Result<Vec<u8>> {
        match formatting {
            JsonFormatting::Compact => serde_json::to_vec(self),
            JsonFormatting::Indented => serde_json::to_vec_pretty(self),
        }
    }
}

//! Settings for a single export run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Output container for the exported asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GltfFormat {
    /// GLB - Single binary file containing JSON + binary data
    #[default]
    Glb,
    /// glTF - JSON file + separate .bin file and image files
    Gltf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonFormatting {
    Compact,
    #[default]
    Indented,
}

/// Encoding used for images that have no alpha channel.
///
/// Images with alpha are always written as PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCodec {
    #[default]
    Png,
    Jpeg,
}

/// Optional glTF extensions built into the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExtensionKind {
    #[serde(rename = "KHR_materials_pbrSpecularGlossiness")]
    KhrMaterialsPbrSpecularGlossiness,
}

impl ExtensionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExtensionKind::KhrMaterialsPbrSpecularGlossiness => {
                "KHR_materials_pbrSpecularGlossiness"
            }
        }
    }
}

/// Options controlling an export run.
///
/// # Example
///
/// ```
/// use scene2gltf::{ExportOptions, GltfFormat, ExtensionKind};
///
/// let options = ExportOptions::new()
///     .format(GltfFormat::Gltf)
///     .bake_animations(true)
///     .extension(ExtensionKind::KhrMaterialsPbrSpecularGlossiness);
/// assert!(options.is_baking_animations());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    format: GltfFormat,
    json_formatting: JsonFormatting,
    image_codec: ImageCodec,
    jpeg_quality: u8,
    bake_animations: bool,
    extensions: BTreeSet<ExtensionKind>,
    pack_occlusion: bool,
    double_sided_mask: bool,
    generator: String,
}

impl ExportOptions {
    /// Creates a new set of options with default settings.
    ///
    /// Defaults:
    /// - `format`: [`GltfFormat::Glb`]
    /// - `json_formatting`: [`JsonFormatting::Indented`]
    /// - `image_codec`: [`ImageCodec::Png`]
    /// - `jpeg_quality`: `90`
    /// - everything else off / empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads options from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn format(mut self, format: GltfFormat) -> Self {
        self.format = format;
        self
    }

    pub fn json_formatting(mut self, formatting: JsonFormatting) -> Self {
        self.json_formatting = formatting;
        self
    }

    pub fn image_codec(mut self, codec: ImageCodec) -> Self {
        self.image_codec = codec;
        self
    }

    /// JPEG quality from 1 to 100. Out of range values are clamped.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Always re-sample animation curves at a fixed rate instead of keeping
    /// spline keys.
    pub fn bake_animations(mut self, bake: bool) -> Self {
        self.bake_animations = bake;
        self
    }

    pub fn extension(mut self, extension: ExtensionKind) -> Self {
        self.extensions.insert(extension);
        self
    }

    /// Packs the occlusion map into the red channel of the generated
    /// metallic-roughness texture instead of exporting it on its own.
    ///
    /// Default: `false`
    pub fn pack_occlusion(mut self, pack: bool) -> Self {
        self.pack_occlusion = pack;
        self
    }

    /// Marks every alpha-masked material as double-sided.
    ///
    /// Default: `false`
    pub fn double_sided_mask(mut self, enabled: bool) -> Self {
        self.double_sided_mask = enabled;
        self
    }

    pub fn generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = generator.into();
        self
    }

    pub fn get_format(&self) -> GltfFormat {
        self.format
    }

    pub fn get_json_formatting(&self) -> JsonFormatting {
        self.json_formatting
    }

    pub fn get_image_codec(&self) -> ImageCodec {
        self.image_codec
    }

    pub fn get_jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn is_baking_animations(&self) -> bool {
        self.bake_animations
    }

    pub fn extensions(&self) -> impl Iterator<Item = ExtensionKind> + '_ {
        self.extensions.iter().copied()
    }

    pub fn is_packing_occlusion(&self) -> bool {
        self.pack_occlusion
    }

    pub fn is_double_sided_mask(&self) -> bool {
        self.double_sided_mask
    }

    pub fn get_generator(&self) -> &str {
        &self.generator
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: GltfFormat::Glb,
            json_formatting: JsonFormatting::Indented,
            image_codec: ImageCodec::Png,
            jpeg_quality: 90,
            bake_animations: false,
            extensions: BTreeSet::new(),
            pack_occlusion: false,
            double_sided_mask: false,
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

//! Typed snapshots of material parameters.
//!
//! Each info struct lists the parameters it reads from a
//! [`MaterialDescription`]. The structs compare and hash bitwise so they can
//! key the conversion caches.

use std::hash::{Hash, Hasher};

use crate::color::Color;
use crate::scene::{ColorParam, FloatParam, MaterialDescription, TextureId, TextureParam};

/// A texture either owned by the scene or produced during the export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureRef {
    Scene(TextureId),
    /// Index into the converter's arena of derived textures.
    Derived(TextureId),
}

trait FieldBits {
    type Bits: Hash + Eq;
    fn bits(&self) -> Self::Bits;
}

impl FieldBits for f32 {
    type Bits = u32;
    fn bits(&self) -> u32 {
        self.to_bits()
    }
}

impl FieldBits for Color {
    type Bits = Color;
    fn bits(&self) -> Color {
        *self
    }
}

impl FieldBits for Option<TextureRef> {
    type Bits = Option<TextureRef>;
    fn bits(&self) -> Option<TextureRef> {
        *self
    }
}

macro_rules! bitwise_eq_hash {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $(self.$field.bits() == other.$field.bits())&&+
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                $(self.$field.bits().hash(state);)+
            }
        }
    };
}

fn texture(material: &dyn MaterialDescription, param: TextureParam) -> Option<TextureRef> {
    material.texture(param).map(TextureRef::Scene)
}

/// Metallic workflow parameters. `color` and `metallic` are gamma-encoded.
#[derive(Debug, Clone, Copy)]
pub struct MetallicInfo {
    pub color: Color,
    pub main_tex: Option<TextureRef>,
    pub metallic: f32,
    pub glossiness: f32,
    /// Metalness in R, smoothness in A.
    pub metallic_gloss_map: Option<TextureRef>,
    pub gloss_map_scale: f32,
    pub smoothness_texture_channel: f32,
}

impl MetallicInfo {
    pub fn read(material: &dyn MaterialDescription) -> Self {
        Self {
            color: material.color(ColorParam::Color),
            main_tex: texture(material, TextureParam::MainTex),
            metallic: material.float(FloatParam::Metallic),
            glossiness: material.float(FloatParam::Glossiness),
            metallic_gloss_map: texture(material, TextureParam::MetallicGlossMap),
            gloss_map_scale: material.float(FloatParam::GlossMapScale),
            smoothness_texture_channel: material.float(FloatParam::SmoothnessTextureChannel),
        }
    }
}

bitwise_eq_hash!(MetallicInfo {
    color,
    main_tex,
    metallic,
    glossiness,
    metallic_gloss_map,
    gloss_map_scale,
    smoothness_texture_channel,
});

/// Specular workflow parameters, colors gamma-encoded.
#[derive(Debug, Clone, Copy)]
pub struct SpecularInfo {
    pub color: Color,
    pub main_tex: Option<TextureRef>,
    pub spec_color: Color,
    pub glossiness: f32,
    /// Specular in RGB, smoothness in A.
    pub spec_gloss_map: Option<TextureRef>,
    pub gloss_map_scale: f32,
    pub smoothness_texture_channel: f32,
}

impl SpecularInfo {
    pub fn read(material: &dyn MaterialDescription) -> Self {
        Self {
            color: material.color(ColorParam::Color),
            main_tex: texture(material, TextureParam::MainTex),
            spec_color: material.color(ColorParam::SpecColor),
            glossiness: material.float(FloatParam::Glossiness),
            spec_gloss_map: texture(material, TextureParam::SpecGlossMap),
            gloss_map_scale: material.float(FloatParam::GlossMapScale),
            smoothness_texture_channel: material.float(FloatParam::SmoothnessTextureChannel),
        }
    }
}

bitwise_eq_hash!(SpecularInfo {
    color,
    main_tex,
    spec_color,
    glossiness,
    spec_gloss_map,
    gloss_map_scale,
    smoothness_texture_channel,
});

/// Parameters shared by both workflows.
#[derive(Debug, Clone, Copy)]
pub struct CommonInfo {
    pub bump_map: Option<TextureRef>,
    pub bump_scale: f32,
    pub occlusion: OcclusionInfo,
    pub emission_color: Color,
    pub emission_map: Option<TextureRef>,
}

impl CommonInfo {
    pub fn read(material: &dyn MaterialDescription) -> Self {
        Self {
            bump_map: texture(material, TextureParam::BumpMap),
            bump_scale: material.float(FloatParam::BumpScale),
            occlusion: OcclusionInfo::read(material),
            emission_color: material.color(ColorParam::EmissionColor),
            emission_map: texture(material, TextureParam::EmissionMap),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OcclusionInfo {
    pub occlusion_map: Option<TextureRef>,
    pub occlusion_strength: f32,
}

impl OcclusionInfo {
    pub fn read(material: &dyn MaterialDescription) -> Self {
        Self {
            occlusion_map: texture(material, TextureParam::OcclusionMap),
            occlusion_strength: material.float(FloatParam::OcclusionStrength),
        }
    }
}

bitwise_eq_hash!(OcclusionInfo {
    occlusion_map,
    occlusion_strength,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Opaque,
    Cutout,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaInfo {
    pub mode: RenderMode,
    pub cutoff: f32,
    /// Back faces are rendered too.
    pub cull_off: bool,
}

impl AlphaInfo {
    pub fn read(material: &dyn MaterialDescription) -> Self {
        let mode = match material.float(FloatParam::Mode).round() as i32 {
            1 => RenderMode::Cutout,
            2 | 3 => RenderMode::Transparent,
            _ => RenderMode::Opaque,
        };
        Self {
            mode,
            cutoff: material.float(FloatParam::Cutoff),
            cull_off: material.float(FloatParam::Cull) == 0.0,
        }
    }
}

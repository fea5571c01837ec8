//! Material parameter access.
//!
//! Materials are read through canonical parameter enums instead of shader
//! property strings. Every parameter has the default the engine's standard
//! shader uses when a material does not set it.

use std::collections::HashMap;

use crate::color::Color;
use crate::scene::TextureId;

/// Metallic workflow shader.
pub const STANDARD_SHADER: &str = "Standard";
/// Specular workflow shader.
pub const STANDARD_SPECULAR_SHADER: &str = "Standard (Specular setup)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorParam {
    /// Albedo / diffuse tint, gamma-encoded.
    Color,
    SpecColor,
    EmissionColor,
}

impl ColorParam {
    pub fn property_name(&self) -> &'static str {
        match self {
            ColorParam::Color => "_Color",
            ColorParam::SpecColor => "_SpecColor",
            ColorParam::EmissionColor => "_EmissionColor",
        }
    }

    pub fn default_value(&self) -> Color {
        match self {
            ColorParam::Color => Color::WHITE,
            ColorParam::SpecColor => Color::gray(0.2),
            ColorParam::EmissionColor => Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureParam {
    MainTex,
    MetallicGlossMap,
    SpecGlossMap,
    BumpMap,
    OcclusionMap,
    EmissionMap,
}

impl TextureParam {
    pub fn property_name(&self) -> &'static str {
        match self {
            TextureParam::MainTex => "_MainTex",
            TextureParam::MetallicGlossMap => "_MetallicGlossMap",
            TextureParam::SpecGlossMap => "_SpecGlossMap",
            TextureParam::BumpMap => "_BumpMap",
            TextureParam::OcclusionMap => "_OcclusionMap",
            TextureParam::EmissionMap => "_EmissionMap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatParam {
    /// Gamma-encoded metalness.
    Metallic,
    /// Smoothness, `1 - roughness`.
    Glossiness,
    GlossMapScale,
    /// 0 reads smoothness from the gloss map alpha, 1 from the albedo alpha.
    SmoothnessTextureChannel,
    BumpScale,
    OcclusionStrength,
    /// Render mode: 0 opaque, 1 cutout, 2 fade, 3 transparent.
    Mode,
    Cutoff,
    /// Face culling: 0 off, 1 front, 2 back.
    Cull,
}

impl FloatParam {
    pub fn property_name(&self) -> &'static str {
        match self {
            FloatParam::Metallic => "_Metallic",
            FloatParam::Glossiness => "_Glossiness",
            FloatParam::GlossMapScale => "_GlossMapScale",
            FloatParam::SmoothnessTextureChannel => "_SmoothnessTextureChannel",
            FloatParam::BumpScale => "_BumpScale",
            FloatParam::OcclusionStrength => "_OcclusionStrength",
            FloatParam::Mode => "_Mode",
            FloatParam::Cutoff => "_Cutoff",
            FloatParam::Cull => "_Cull",
        }
    }

    pub fn default_value(&self) -> f32 {
        match self {
            FloatParam::Metallic => 0.0,
            FloatParam::Glossiness => 0.5,
            FloatParam::GlossMapScale => 1.0,
            FloatParam::SmoothnessTextureChannel => 0.0,
            FloatParam::BumpScale => 1.0,
            FloatParam::OcclusionStrength => 1.0,
            FloatParam::Mode => 0.0,
            FloatParam::Cutoff => 0.5,
            FloatParam::Cull => 2.0,
        }
    }
}

/// Named-parameter view of a source material.
pub trait MaterialDescription {
    fn name(&self) -> &str;
    fn shader(&self) -> &str;
    fn color(&self, param: ColorParam) -> Color;
    fn texture(&self, param: TextureParam) -> Option<TextureId>;
    fn float(&self, param: FloatParam) -> f32;
}

/// A material backed by plain parameter maps.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMaterial {
    pub name: String,
    pub shader: String,
    colors: HashMap<ColorParam, Color>,
    textures: HashMap<TextureParam, TextureId>,
    floats: HashMap<FloatParam, f32>,
}

impl SourceMaterial {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            colors: HashMap::new(),
            textures: HashMap::new(),
            floats: HashMap::new(),
        }
    }

    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(name, STANDARD_SHADER)
    }

    pub fn standard_specular(name: impl Into<String>) -> Self {
        Self::new(name, STANDARD_SPECULAR_SHADER)
    }

    pub fn with_color(mut self, param: ColorParam, color: Color) -> Self {
        self.colors.insert(param, color);
        self
    }

    pub fn with_texture(mut self, param: TextureParam, texture: TextureId) -> Self {
        self.textures.insert(param, texture);
        self
    }

    pub fn with_float(mut self, param: FloatParam, value: f32) -> Self {
        self.floats.insert(param, value);
        self
    }
}

impl MaterialDescription for SourceMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn shader(&self) -> &str {
        &self.shader
    }

    fn color(&self, param: ColorParam) -> Color {
        self.colors
            .get(&param)
            .copied()
            .unwrap_or_else(|| param.default_value())
    }

    fn texture(&self, param: TextureParam) -> Option<TextureId> {
        self.textures.get(&param).copied()
    }

    fn float(&self, param: FloatParam) -> f32 {
        self.floats
            .get(&param)
            .copied()
            .unwrap_or_else(|| param.default_value())
    }
}

use std::collections::HashMap;

use id_arena::Arena;
use log::debug;

use crate::color::{Color, gamma_to_linear, linear_to_gamma};
use crate::error::{ExportError, ExportResult};
use crate::material::info::{MetallicInfo, SpecularInfo, TextureRef};
use crate::pbr::{MetallicRoughness, SpecularGlossiness};
use crate::scene::{
    MaterialDescription, STANDARD_SHADER, STANDARD_SPECULAR_SHADER, Scene, Texture, TextureId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DerivedKey {
    MetallicRoughness {
        source: TextureRef,
        gloss_map_scale: u32,
        occlusion: Option<TextureRef>,
    },
    UnpackedNormal(TextureRef),
    LinearOcclusion(TextureRef),
}

/// Converts materials between the metallic and specular workflows and owns
/// every texture generated along the way.
///
/// One converter lives for one export run. Conversions are cached by the full
/// parameter set of the source material, derived textures by their source
/// texture(s) and the transform applied, so each is computed at most once.
pub struct MaterialConverter {
    derived: Arena<Texture>,
    derived_keys: HashMap<DerivedKey, TextureId>,
    specular_to_metallic: HashMap<SpecularInfo, MetallicInfo>,
    metallic_to_specular: HashMap<MetallicInfo, SpecularInfo>,
}

impl Default for MaterialConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialConverter {
    pub fn new() -> Self {
        Self {
            derived: Arena::new(),
            derived_keys: HashMap::new(),
            specular_to_metallic: HashMap::new(),
            metallic_to_specular: HashMap::new(),
        }
    }

    /// Number of textures generated so far.
    pub fn derived_count(&self) -> usize {
        self.derived.len()
    }

    pub fn texture<'s>(
        &'s self,
        scene: &'s Scene,
        texture: TextureRef,
    ) -> ExportResult<&'s Texture> {
        let found = match texture {
            TextureRef::Scene(id) => scene.texture(id),
            TextureRef::Derived(id) => self.derived.get(id),
        };
        found.ok_or_else(|| ExportError::unsupported(format!("unknown texture {texture:?}")))
    }

    /// Metallic workflow view of `material`.
    pub fn to_metallic(
        &mut self,
        scene: &Scene,
        material: &dyn MaterialDescription,
    ) -> ExportResult<MetallicInfo> {
        match material.shader() {
            STANDARD_SHADER => Ok(MetallicInfo::read(material)),
            STANDARD_SPECULAR_SHADER => {
                let specular = SpecularInfo::read(material);
                if let Some(cached) = self.specular_to_metallic.get(&specular) {
                    return Ok(*cached);
                }
                let metallic = self.convert_to_metallic(scene, &specular)?;
                self.specular_to_metallic.insert(specular, metallic);
                Ok(metallic)
            }
            other => Err(ExportError::UnsupportedShader(other.to_string())),
        }
    }

    /// Specular workflow view of `material`.
    pub fn to_specular(
        &mut self,
        scene: &Scene,
        material: &dyn MaterialDescription,
    ) -> ExportResult<SpecularInfo> {
        match material.shader() {
            STANDARD_SHADER => {
                let metallic = MetallicInfo::read(material);
                if let Some(cached) = self.metallic_to_specular.get(&metallic) {
                    return Ok(*cached);
                }
                let specular = self.convert_to_specular(scene, &metallic)?;
                self.metallic_to_specular.insert(metallic, specular);
                Ok(specular)
            }
            STANDARD_SPECULAR_SHADER => Ok(SpecularInfo::read(material)),
            other => Err(ExportError::UnsupportedShader(other.to_string())),
        }
    }

    fn convert_to_specular(
        &mut self,
        scene: &Scene,
        info: &MetallicInfo,
    ) -> ExportResult<SpecularInfo> {
        let color = info.color.linear();

        if info.main_tex.is_none() && info.metallic_gloss_map.is_none() {
            let sg = MetallicRoughness {
                base_color: color,
                metallic: gamma_to_linear(info.metallic),
                roughness: 1.0 - info.glossiness,
            }
            .to_specular_glossiness();

            return Ok(SpecularInfo {
                color: sg.diffuse.gamma(),
                main_tex: None,
                spec_color: sg.specular.gamma(),
                glossiness: sg.glossiness,
                spec_gloss_map: None,
                gloss_map_scale: 1.0,
                smoothness_texture_channel: 0.0,
            });
        }

        if info.smoothness_texture_channel != 0.0 {
            return Err(ExportError::unsupported(
                "smoothness stored in the albedo alpha channel",
            ));
        }

        let sources = self.texel_sources(scene, info.main_tex, info.metallic_gloss_map)?;
        let mut diffuse = Vec::with_capacity(sources.len());
        let mut specular_glossiness = Vec::with_capacity(sources.len());

        for i in 0..sources.len() {
            let base_color = sources
                .first
                .as_ref()
                .map_or(color, |pixels| pixels[i].linear() * color);
            let (metallic, roughness) = match &sources.second {
                Some(pixels) => (
                    gamma_to_linear(pixels[i].r),
                    1.0 - pixels[i].a * info.gloss_map_scale,
                ),
                None => (gamma_to_linear(info.metallic), 1.0 - info.glossiness),
            };

            let sg = MetallicRoughness {
                base_color,
                metallic,
                roughness,
            }
            .to_specular_glossiness();

            diffuse.push(sg.diffuse.gamma());
            specular_glossiness.push(sg.specular.gamma().with_alpha(sg.glossiness));
        }

        let diffuse = self.alloc(&sources, "diffuse", diffuse)?;
        let specular_glossiness = self.alloc(&sources, "specularGlossiness", specular_glossiness)?;

        Ok(SpecularInfo {
            color: Color::WHITE,
            main_tex: Some(diffuse),
            spec_color: Color::WHITE,
            glossiness: 1.0,
            spec_gloss_map: Some(specular_glossiness),
            gloss_map_scale: 1.0,
            smoothness_texture_channel: 0.0,
        })
    }

    fn convert_to_metallic(
        &mut self,
        scene: &Scene,
        info: &SpecularInfo,
    ) -> ExportResult<MetallicInfo> {
        let color = info.color.linear();

        if info.main_tex.is_none() && info.spec_gloss_map.is_none() {
            let mr = SpecularGlossiness {
                diffuse: color,
                specular: info.spec_color.linear(),
                glossiness: info.glossiness,
            }
            .to_metallic_roughness();

            return Ok(MetallicInfo {
                color: mr.base_color.gamma(),
                main_tex: None,
                metallic: linear_to_gamma(mr.metallic),
                glossiness: 1.0 - mr.roughness,
                metallic_gloss_map: None,
                gloss_map_scale: 1.0,
                smoothness_texture_channel: 0.0,
            });
        }

        if info.smoothness_texture_channel != 0.0 {
            return Err(ExportError::unsupported(
                "smoothness stored in the albedo alpha channel",
            ));
        }

        let sources = self.texel_sources(scene, info.main_tex, info.spec_gloss_map)?;
        let mut base_color = Vec::with_capacity(sources.len());
        let mut metallic_gloss = Vec::with_capacity(sources.len());

        for i in 0..sources.len() {
            let diffuse = sources.first.as_ref().map_or(color, |pixels| pixels[i].linear() * color);
            let (specular, glossiness) = match &sources.second {
                Some(pixels) => (
                    pixels[i].linear().with_alpha(1.0),
                    pixels[i].a * info.gloss_map_scale,
                ),
                None => (info.spec_color.linear(), info.glossiness),
            };

            let mr = SpecularGlossiness {
                diffuse,
                specular,
                glossiness,
            }
            .to_metallic_roughness();

            let metallic = linear_to_gamma(mr.metallic);
            base_color.push(mr.base_color.gamma());
            metallic_gloss.push(Color::new(metallic, metallic, metallic, 1.0 - mr.roughness));
        }

        let base_color = self.alloc(&sources, "baseColor", base_color)?;
        let metallic_gloss = self.alloc(&sources, "metallicGloss", metallic_gloss)?;

        Ok(MetallicInfo {
            color: Color::WHITE,
            main_tex: Some(base_color),
            metallic: 1.0,
            glossiness: 0.0,
            metallic_gloss_map: Some(metallic_gloss),
            gloss_map_scale: 1.0,
            smoothness_texture_channel: 0.0,
        })
    }

    /// glTF metallic-roughness texture built from a metallic-gloss map.
    ///
    /// Roughness goes to G, linear metalness to B, and the red channel of
    /// `occlusion` to R when given.
    pub fn metallic_roughness_texture(
        &mut self,
        scene: &Scene,
        metallic_gloss_map: TextureRef,
        gloss_map_scale: f32,
        occlusion: Option<TextureRef>,
    ) -> ExportResult<TextureRef> {
        let key = DerivedKey::MetallicRoughness {
            source: metallic_gloss_map,
            gloss_map_scale: gloss_map_scale.to_bits(),
            occlusion,
        };
        self.derive(key, |converter| {
            let sources = converter.texel_sources(scene, Some(metallic_gloss_map), occlusion)?;
            let pixels = sources.first.as_deref().unwrap_or_default();
            let colors = pixels.iter().enumerate().map(|(i, pixel)| {
                let occlusion = sources.second.as_ref().map_or(1.0, |occlusion| occlusion[i].r);
                Color::new(
                    occlusion,
                    1.0 - pixel.a * gloss_map_scale,
                    gamma_to_linear(pixel.r),
                    1.0,
                )
            });
            derived_texture(
                &sources.name,
                "metallicRoughness",
                sources.width,
                sources.height,
                colors,
            )
        })
    }

    /// RGB normal map from one storing X in alpha and Y in green.
    pub fn unpacked_normal(
        &mut self,
        scene: &Scene,
        normal_map: TextureRef,
    ) -> ExportResult<TextureRef> {
        self.derive(DerivedKey::UnpackedNormal(normal_map), |converter| {
            let source = converter.texture(scene, normal_map)?;
            let (width, height) = source.dimensions();
            let colors = source.colors().map(|packed| {
                let x = packed.a * 2.0 - 1.0;
                let y = packed.g * 2.0 - 1.0;
                let z = (1.0 - x * x - y * y).max(0.0).sqrt();
                Color::rgb(x * 0.5 + 0.5, y * 0.5 + 0.5, z * 0.5 + 0.5)
            });
            derived_texture(&source.name, "normal", width, height, colors)
        })
    }

    /// Copy of an occlusion map with linearized channels.
    pub fn linear_occlusion(
        &mut self,
        scene: &Scene,
        occlusion_map: TextureRef,
    ) -> ExportResult<TextureRef> {
        self.derive(DerivedKey::LinearOcclusion(occlusion_map), |converter| {
            let source = converter.texture(scene, occlusion_map)?;
            let (width, height) = source.dimensions();
            let colors = source.colors().map(|color| color.linear().with_alpha(1.0));
            derived_texture(&source.name, "occlusion", width, height, colors)
        })
    }

    fn derive(
        &mut self,
        key: DerivedKey,
        build: impl FnOnce(&Self) -> ExportResult<Texture>,
    ) -> ExportResult<TextureRef> {
        if let Some(id) = self.derived_keys.get(&key) {
            return Ok(TextureRef::Derived(*id));
        }
        let texture = build(self)?;
        debug!("Derived texture '{}' ({key:?})", texture.name);
        let id = self.derived.alloc(texture);
        self.derived_keys.insert(key, id);
        Ok(TextureRef::Derived(id))
    }

    fn alloc(
        &mut self,
        sources: &TexelSources,
        suffix: &str,
        colors: Vec<Color>,
    ) -> ExportResult<TextureRef> {
        let texture =
            derived_texture(&sources.name, suffix, sources.width, sources.height, colors)?;
        debug!("Converted texture '{}'", texture.name);
        Ok(TextureRef::Derived(self.derived.alloc(texture)))
    }

    /// Pixels of up to two textures that must share one size.
    fn texel_sources(
        &self,
        scene: &Scene,
        first: Option<TextureRef>,
        second: Option<TextureRef>,
    ) -> ExportResult<TexelSources> {
        let first = first.map(|texture| self.texture(scene, texture)).transpose()?;
        let second = second.map(|texture| self.texture(scene, texture)).transpose()?;

        let (name, width, height) = match (first, second) {
            (Some(a), Some(b)) if a.dimensions() != b.dimensions() => {
                return Err(ExportError::unsupported(format!(
                    "texture '{}' is {}x{} but '{}' is {}x{}",
                    a.name,
                    a.width(),
                    a.height(),
                    b.name,
                    b.width(),
                    b.height()
                )));
            }
            (Some(texture), _) | (None, Some(texture)) => {
                (texture.name.clone(), texture.width(), texture.height())
            }
            (None, None) => (String::new(), 0, 0),
        };

        Ok(TexelSources {
            name,
            width,
            height,
            first: first.map(|texture| texture.colors().collect()),
            second: second.map(|texture| texture.colors().collect()),
        })
    }
}

struct TexelSources {
    name: String,
    width: u32,
    height: u32,
    first: Option<Vec<Color>>,
    second: Option<Vec<Color>>,
}

impl TexelSources {
    fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn derived_texture(
    source_name: &str,
    suffix: &str,
    width: u32,
    height: u32,
    colors: impl IntoIterator<Item = Color>,
) -> ExportResult<Texture> {
    let name = format!("{source_name}_{suffix}");
    Texture::from_colors(&name, width, height, colors).ok_or_else(|| {
        ExportError::unsupported(format!("texture '{name}' has the wrong pixel count"))
    })
}

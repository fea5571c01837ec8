//! `KHR_materials_pbrSpecularGlossiness`
//!
//! <https://github.com/KhronosGroup/glTF/tree/main/extensions/2.0/Archived/KHR_materials_pbrSpecularGlossiness>

use serde::Serialize;

use crate::error::{ExportError, ExportResult};
use crate::export::{ExportSession, Extension};
use crate::gltf::{OcclusionTextureInfo, TextureInfo};
use crate::material::OcclusionInfo;
use crate::options::ExtensionKind;
use crate::scene::MaterialId;

fn is_white(value: &[f32; 4]) -> bool {
    *value == [1.0, 1.0, 1.0, 1.0]
}

fn is_white_rgb(value: &[f32; 3]) -> bool {
    *value == [1.0, 1.0, 1.0]
}

fn is_one(value: &f32) -> bool {
    *value == 1.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct PbrSpecularGlossiness {
    #[serde(skip_serializing_if = "is_white")]
    diffuse_factor: [f32; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    diffuse_texture: Option<TextureInfo>,
    #[serde(skip_serializing_if = "is_white_rgb")]
    specular_factor: [f32; 3],
    #[serde(skip_serializing_if = "is_one")]
    glossiness_factor: f32,
    /// Specular in RGB, glossiness in A.
    #[serde(skip_serializing_if = "Option::is_none")]
    specular_glossiness_texture: Option<TextureInfo>,
}

/// Adds the specular-glossiness parameterization next to the core
/// metallic-roughness material.
///
/// The extension expects linear occlusion data, so occlusion maps are
/// exported as a linearized copy instead of the source texture.
#[derive(Debug, Clone, Copy, Default)]
pub struct KhrMaterialsPbrSpecularGlossiness;

impl Extension for KhrMaterialsPbrSpecularGlossiness {
    fn name(&self) -> &str {
        ExtensionKind::KhrMaterialsPbrSpecularGlossiness.name()
    }

    fn export_material(
        &self,
        session: &mut ExportSession<'_>,
        material: MaterialId,
    ) -> ExportResult<Option<usize>> {
        let index = session.export_material_core(material, false)?;

        let scene = session.scene();
        let occlusion = OcclusionInfo::read(session.material(material)?);
        if let Some(occlusion_map) = occlusion.occlusion_map {
            let linear = session.converter_mut().linear_occlusion(scene, occlusion_map)?;
            let texture = session.export_texture(linear, false)?;
            session.document_mut().materials[index].occlusion_texture = Some(OcclusionTextureInfo {
                index: texture,
                tex_coord: 0,
                strength: occlusion.occlusion_strength,
            });
        }

        Ok(Some(index))
    }

    fn post_export_material(
        &self,
        session: &mut ExportSession<'_>,
        material: MaterialId,
        index: usize,
    ) -> ExportResult<()> {
        let scene = session.scene();
        let source = session.material(material)?;
        let info = session.converter_mut().to_specular(scene, source)?;

        let diffuse_texture = match info.main_tex {
            Some(texture) => Some(TextureInfo::new(session.export_texture(texture, false)?)),
            None => None,
        };
        let (glossiness_factor, specular_glossiness_texture) = match info.spec_gloss_map {
            Some(texture) => (
                info.gloss_map_scale,
                Some(TextureInfo::new(session.export_texture(texture, false)?)),
            ),
            None => (info.glossiness, None),
        };

        let payload = PbrSpecularGlossiness {
            diffuse_factor: info.color.linear().to_array(),
            diffuse_texture,
            specular_factor: info.spec_color.linear().to_rgb_array(),
            glossiness_factor,
            specular_glossiness_texture,
        };
        let value = serde_json::to_value(&payload)?;

        let output = session
            .document_mut()
            .materials
            .get_mut(index)
            .ok_or_else(|| {
                ExportError::unsupported(format!("material index {index} out of range"))
            })?;
        output.extensions.insert(self.name().to_string(), value);
        Ok(())
    }
}

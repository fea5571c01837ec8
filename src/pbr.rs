//! Conversion between the metallic-roughness and specular-glossiness
//! parameterizations of a physically based material.
//!
//! All inputs and outputs are linear-space values. The two conversions are
//! not inverses of each other: going to specular-glossiness and back loses
//! information, and callers must not expect the original values back.

use crate::color::Color;

/// Reflectance of a non-metal at normal incidence.
pub const DIELECTRIC_SPECULAR: Color = Color::rgb(0.04, 0.04, 0.04);

const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetallicRoughness {
    pub base_color: Color,
    pub metallic: f32,
    pub roughness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecularGlossiness {
    pub diffuse: Color,
    pub specular: Color,
    pub glossiness: f32,
}

impl MetallicRoughness {
    pub fn to_specular_glossiness(&self) -> SpecularGlossiness {
        let specular = Color::lerp(DIELECTRIC_SPECULAR, self.base_color, self.metallic);

        let one_minus_specular_strength = 1.0 - specular.max_color_component();
        let diffuse = if one_minus_specular_strength < EPSILON {
            Color::BLACK
        } else {
            self.base_color * (1.0 - DIELECTRIC_SPECULAR.r) * (1.0 - self.metallic)
                / one_minus_specular_strength
        };

        SpecularGlossiness {
            diffuse: diffuse.with_alpha(self.base_color.a),
            specular,
            glossiness: 1.0 - self.roughness,
        }
    }
}

impl SpecularGlossiness {
    pub fn to_metallic_roughness(&self) -> MetallicRoughness {
        let diffuse = self.diffuse;
        let specular = self.specular;

        let one_minus_specular_strength = 1.0 - specular.max_color_component();
        let metallic = solve_metallic(
            DIELECTRIC_SPECULAR.r,
            perceived_brightness(diffuse),
            perceived_brightness(specular),
            one_minus_specular_strength,
        );

        let from_diffuse = diffuse * one_minus_specular_strength
            / ((1.0 - DIELECTRIC_SPECULAR.r) * (1.0 - metallic).max(EPSILON));
        let from_specular =
            (specular - DIELECTRIC_SPECULAR * (1.0 - metallic)) / metallic.max(EPSILON);
        let base_color = Color::lerp(from_diffuse, from_specular, metallic * metallic);

        MetallicRoughness {
            base_color: base_color.with_alpha(diffuse.a),
            metallic,
            roughness: 1.0 - self.glossiness,
        }
    }
}

fn perceived_brightness(color: Color) -> f32 {
    (0.299 * color.r * color.r + 0.587 * color.g * color.g + 0.114 * color.b * color.b).sqrt()
}

/// Positive root of `a*m^2 + b*m + c = 0`, clamped to `[0, 1]`.
///
/// Speculars darker than the dielectric constant are treated as plain
/// dielectrics, which also keeps the discriminant non-negative.
fn solve_metallic(
    dielectric_specular: f32,
    diffuse: f32,
    specular: f32,
    one_minus_specular_strength: f32,
) -> f32 {
    if specular < dielectric_specular {
        return 0.0;
    }

    let a = dielectric_specular;
    let b = diffuse * one_minus_specular_strength / (1.0 - dielectric_specular) + specular
        - 2.0 * dielectric_specular;
    let c = dielectric_specular - specular;
    let discriminant = b * b - 4.0 * a * c;
    ((-b + discriminant.sqrt()) / (2.0 * a)).clamp(0.0, 1.0)
}

//! RGBA colors with the arithmetic the material conversion needs.
//!
//! Channels are stored as `f32` in whatever space the caller works in;
//! [`Color::linear`] and [`Color::gamma`] convert the RGB channels between
//! sRGB-encoded and linear values and leave alpha untouched.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::{Div, Mul, Sub};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub const fn gray(value: f32) -> Self {
        Self::rgb(value, value, value)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation of all four channels, `t` clamped to `[0, 1]`.
    pub fn lerp(from: Color, to: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color::new(
            from.r + (to.r - from.r) * t,
            from.g + (to.g - from.g) * t,
            from.b + (to.b - from.b) * t,
            from.a + (to.a - from.a) * t,
        )
    }

    pub fn max_color_component(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    pub fn linear(&self) -> Color {
        Color::new(
            gamma_to_linear(self.r),
            gamma_to_linear(self.g),
            gamma_to_linear(self.b),
            self.a,
        )
    }

    pub fn gamma(&self) -> Color {
        Color::new(
            linear_to_gamma(self.r),
            linear_to_gamma(self.g),
            linear_to_gamma(self.b),
            self.a,
        )
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_rgb_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    fn channel_bits(&self) -> [u32; 4] {
        [
            self.r.to_bits(),
            self.g.to_bits(),
            self.b.to_bits(),
            self.a.to_bits(),
        ]
    }
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Color::new(r, g, b, a)
    }
}

// Bitwise equality so colors can be part of cache keys.
impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.channel_bits() == other.channel_bits()
    }
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.channel_bits().hash(state);
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Color {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

impl Mul<Color> for Color {
    type Output = Color;

    fn mul(self, rhs: Color) -> Color {
        Color::new(
            self.r * rhs.r,
            self.g * rhs.g,
            self.b * rhs.b,
            self.a * rhs.a,
        )
    }
}

impl Div<f32> for Color {
    type Output = Color;

    fn div(self, rhs: f32) -> Color {
        Color::new(self.r / rhs, self.g / rhs, self.b / rhs, self.a / rhs)
    }
}

impl Sub for Color {
    type Output = Color;

    fn sub(self, rhs: Color) -> Color {
        Color::new(
            self.r - rhs.r,
            self.g - rhs.g,
            self.b - rhs.b,
            self.a - rhs.a,
        )
    }
}

/// sRGB transfer function, encoded to linear.
pub fn gamma_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else if value < 1.0 {
        ((value + 0.055) / 1.055).powf(2.4)
    } else {
        value.powf(2.2)
    }
}

/// sRGB transfer function, linear to encoded.
pub fn linear_to_gamma(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else if value <= 0.0031308 {
        value * 12.92
    } else if value < 1.0 {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    } else {
        value.powf(1.0 / 2.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lerp_clamps_t() {
        let from = Color::BLACK;
        let to = Color::WHITE;
        assert_eq!(Color::lerp(from, to, 2.0), to);
        assert_eq!(Color::lerp(from, to, -1.0), from);
        assert_eq!(Color::lerp(from, to, 0.5), Color::gray(0.5));
    }

    #[test]
    fn test_gamma_round_trip() {
        for value in [0.0f32, 0.002, 0.04, 0.2, 0.5, 0.73, 1.0] {
            let back = linear_to_gamma(gamma_to_linear(value));
            assert!((back - value).abs() < 1e-5, "{value} came back as {back}");
        }
    }

    #[test]
    fn test_linear_keeps_alpha() {
        let color = Color::new(0.5, 0.5, 0.5, 0.25).linear();
        assert_eq!(color.a, 0.25);
        assert!((color.r - 0.214_041_14).abs() < 1e-6);
    }

    #[test]
    fn test_max_color_component_ignores_alpha() {
        assert_eq!(Color::new(0.1, 0.7, 0.3, 5.0).max_color_component(), 0.7);
    }

    #[test]
    fn test_equality_is_bitwise() {
        assert_ne!(Color::gray(0.0), Color::gray(-0.0));
        let nan = Color::gray(f32::NAN);
        assert_eq!(nan, nan);
    }
}

use image::{Rgba, Rgba32FImage, RgbaImage};

use crate::color::Color;

/// A decoded texture with gamma-encoded channels in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub pixels: Rgba32FImage,
    /// Whether any pixel is not fully opaque. Decides the output codec.
    pub has_alpha: bool,
    /// Normal map stored with X in alpha and Y in green.
    pub packed_normal: bool,
}

impl Texture {
    pub fn new(name: impl Into<String>, pixels: Rgba32FImage) -> Self {
        let has_alpha = pixels.pixels().any(|pixel| pixel.0[3] < 1.0);
        Self {
            name: name.into(),
            pixels,
            has_alpha,
            packed_normal: false,
        }
    }

    pub fn from_rgba8(name: impl Into<String>, image: &RgbaImage) -> Self {
        let pixels = Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
            let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
            Rgba([
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
                f32::from(a) / 255.0,
            ])
        });
        Self::new(name, pixels)
    }

    /// A `width` x `height` texture filled with `color`.
    pub fn solid(name: impl Into<String>, width: u32, height: u32, color: Color) -> Self {
        Self::new(
            name,
            Rgba32FImage::from_pixel(width, height, Rgba(color.to_array())),
        )
    }

    pub fn packed_normal(mut self) -> Self {
        self.packed_normal = true;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Pixels in row-major order as colors.
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.pixels.pixels().map(|pixel| Color::from(pixel.0))
    }

    /// Builds a texture of the given size from row-major colors.
    ///
    /// Returns `None` when the number of colors does not match the size.
    pub(crate) fn from_colors(
        name: impl Into<String>,
        width: u32,
        height: u32,
        colors: impl IntoIterator<Item = Color>,
    ) -> Option<Self> {
        let data = colors
            .into_iter()
            .flat_map(|color| color.to_array())
            .collect::<Vec<_>>();
        Rgba32FImage::from_raw(width, height, data).map(|pixels| Self::new(name, pixels))
    }
}

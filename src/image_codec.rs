//! Texture to PNG / JPEG bytes.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::error::ExportResult;
use crate::options::ImageCodec;
use crate::scene::Texture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
}

/// Encodes `texture` with `codec`.
///
/// Textures with alpha and normal maps are always written as PNG, JPEG
/// would drop the alpha channel or blur the encoded vectors.
pub fn encode_texture(
    texture: &Texture,
    codec: ImageCodec,
    jpeg_quality: u8,
    normal_map: bool,
) -> ExportResult<EncodedImage> {
    let (width, height) = texture.dimensions();
    let image = DynamicImage::ImageRgba32F(texture.pixels.clone());
    let mut bytes = Vec::new();

    if texture.has_alpha {
        let rgba = image.to_rgba8();
        PngEncoder::new(&mut bytes).write_image(&rgba, width, height, ExtendedColorType::Rgba8)?;
        return Ok(png(bytes));
    }

    let rgb = image.to_rgb8();
    match codec {
        ImageCodec::Jpeg if !normal_map => {
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)?;
            Ok(EncodedImage {
                bytes,
                mime_type: "image/jpeg",
                extension: "jpg",
            })
        }
        _ => {
            PngEncoder::new(&mut bytes).write_image(&rgb, width, height, ExtendedColorType::Rgb8)?;
            Ok(png(bytes))
        }
    }
}

fn png(bytes: Vec<u8>) -> EncodedImage {
    EncodedImage {
        bytes,
        mime_type: "image/png",
        extension: "png",
    }
}

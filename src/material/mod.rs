//! Source material interpretation and workflow conversion.

mod converter;
mod info;

pub use converter::MaterialConverter;
pub use info::{
    AlphaInfo, CommonInfo, MetallicInfo, OcclusionInfo, RenderMode, SpecularInfo, TextureRef,
};

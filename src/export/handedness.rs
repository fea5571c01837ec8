//! Left-handed (source) to right-handed (glTF) conversion.
//!
//! Both systems are Y up; the conversion mirrors the Z axis.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::error::{ExportError, ExportResult};

const MIRROR_Z: Mat4 = Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::NEG_Z, Vec4::W);

pub fn position(value: Vec3) -> Vec3 {
    Vec3::new(value.x, value.y, -value.z)
}

pub fn normal(value: Vec3) -> Vec3 {
    position(value)
}

/// Mirrors the direction and keeps the bitangent sign in W.
pub fn tangent(value: Vec4) -> Vec4 {
    Vec4::new(value.x, value.y, -value.z, value.w)
}

pub fn rotation(value: Quat) -> Quat {
    Quat::from_xyzw(-value.x, -value.y, value.z, value.w)
}

/// Conjugates `value` with the Z mirror.
pub fn matrix(value: Mat4) -> Mat4 {
    MIRROR_Z * value * MIRROR_Z
}

/// Flips V, the source has its origin in the bottom left corner.
pub fn uv(value: Vec2) -> Vec2 {
    Vec2::new(value.x, 1.0 - value.y)
}

/// Triangle indices with reversed winding.
pub fn flip_faces(indices: &[u32]) -> ExportResult<Vec<u32>> {
    if indices.len() % 3 != 0 {
        return Err(ExportError::unsupported(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    Ok(indices
        .chunks_exact(3)
        .flat_map(|triangle| [triangle[2], triangle[1], triangle[0]])
        .collect())
}

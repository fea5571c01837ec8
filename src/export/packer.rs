//! Binary payload accumulation.
//!
//! Every typed array the exporter writes ends up in one growing little-endian
//! buffer, described by a buffer view and usually an accessor.

use std::io;

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::{ExportError, ExportResult};
use crate::gltf::{
    Accessor, AccessorType, Bounds, BufferTarget, BufferView, ComponentType, Document,
};

/// A value that can be stored as one accessor element.
pub trait Element {
    const COMPONENT_TYPE: ComponentType;
    const ACCESSOR_TYPE: AccessorType;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Component `index` widened for bounds computation.
    fn component(&self, index: usize) -> f64;

    fn byte_size() -> usize {
        Self::COMPONENT_TYPE.byte_size() * Self::ACCESSOR_TYPE.arity()
    }
}

fn write_floats(out: &mut Vec<u8>, values: &[f32]) -> io::Result<()> {
    for value in values {
        out.write_f32::<LittleEndian>(*value)?;
    }
    Ok(())
}

impl Element for f32 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Float;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Scalar;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_f32::<LittleEndian>(*self)
    }

    fn component(&self, _index: usize) -> f64 {
        f64::from(*self)
    }
}

impl Element for u16 {
    const COMPONENT_TYPE: ComponentType = ComponentType::UnsignedShort;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Scalar;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_u16::<LittleEndian>(*self)
    }

    fn component(&self, _index: usize) -> f64 {
        f64::from(*self)
    }
}

impl Element for u32 {
    const COMPONENT_TYPE: ComponentType = ComponentType::UnsignedInt;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Scalar;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_u32::<LittleEndian>(*self)
    }

    fn component(&self, _index: usize) -> f64 {
        f64::from(*self)
    }
}

impl Element for [u16; 4] {
    const COMPONENT_TYPE: ComponentType = ComponentType::UnsignedShort;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Vec4;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        for value in self {
            out.write_u16::<LittleEndian>(*value)?;
        }
        Ok(())
    }

    fn component(&self, index: usize) -> f64 {
        f64::from(self[index])
    }
}

impl Element for Vec2 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Float;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Vec2;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        write_floats(out, &self.to_array())
    }

    fn component(&self, index: usize) -> f64 {
        f64::from(self.to_array()[index])
    }
}

impl Element for Vec3 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Float;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Vec3;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        write_floats(out, &self.to_array())
    }

    fn component(&self, index: usize) -> f64 {
        f64::from(self.to_array()[index])
    }
}

impl Element for Vec4 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Float;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Vec4;

    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        write_floats(out, &self.to_array())
    }

    fn component(&self, index: usize) -> f64 {
        f64::from(self.to_array()[index])
    }
}

impl Element for Mat4 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Float;
    const ACCESSOR_TYPE: AccessorType = AccessorType::Mat4;

    // Column-major, like glTF.
    fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        write_floats(out, &self.to_cols_array())
    }

    fn component(&self, index: usize) -> f64 {
        f64::from(self.to_cols_array()[index])
    }
}

/// The single binary buffer of an export run.
#[derive(Debug, Default)]
pub struct DataPacker {
    data: Vec<u8>,
}

impl DataPacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Appends `values` and returns the index of the new accessor.
    ///
    /// The data is aligned to its component size. With `with_bounds` the
    /// accessor gets per-component min and max.
    pub fn append<T: Element>(
        &mut self,
        document: &mut Document,
        values: &[T],
        with_bounds: bool,
        target: Option<BufferTarget>,
    ) -> ExportResult<usize> {
        if values.is_empty() {
            return Err(ExportError::unsupported("empty accessor data"));
        }

        let byte_length = values
            .len()
            .checked_mul(T::byte_size())
            .ok_or(ExportError::ArithmeticOverflow("accessor length"))?;
        let byte_offset = self.reserve(T::COMPONENT_TYPE.byte_size(), byte_length)?;
        for value in values {
            value.write_to(&mut self.data)?;
        }

        let buffer_view = push(
            &mut document.buffer_views,
            BufferView {
                buffer: 0,
                byte_offset,
                byte_length,
                target,
            },
        );

        let (min, max) = if with_bounds {
            let (min, max) = bounds(values);
            (Some(min), Some(max))
        } else {
            (None, None)
        };

        Ok(push(
            &mut document.accessors,
            Accessor {
                buffer_view,
                component_type: T::COMPONENT_TYPE,
                count: values.len(),
                accessor_type: T::ACCESSOR_TYPE,
                min,
                max,
            },
        ))
    }

    /// Appends opaque bytes, such as an encoded image, and returns the index
    /// of the new buffer view.
    pub fn append_bytes(&mut self, document: &mut Document, bytes: &[u8]) -> ExportResult<usize> {
        if bytes.is_empty() {
            return Err(ExportError::unsupported("empty buffer view data"));
        }

        let byte_offset = self.reserve(4, bytes.len())?;
        self.data.extend_from_slice(bytes);

        Ok(push(
            &mut document.buffer_views,
            BufferView {
                buffer: 0,
                byte_offset,
                byte_length: bytes.len(),
                target: None,
            },
        ))
    }

    /// Zero-pads to `alignment` and checks that `length` more bytes stay
    /// addressable. Returns the aligned offset.
    fn reserve(&mut self, alignment: usize, length: usize) -> ExportResult<usize> {
        let offset = self
            .data
            .len()
            .checked_next_multiple_of(alignment)
            .ok_or(ExportError::ArithmeticOverflow("buffer offset"))?;
        let end = offset
            .checked_add(length)
            .ok_or(ExportError::ArithmeticOverflow("buffer length"))?;
        u32::try_from(end).map_err(|_| ExportError::ArithmeticOverflow("buffer length"))?;

        self.data.resize(offset, 0);
        self.data.reserve(length);
        Ok(offset)
    }
}

fn push<T>(items: &mut Vec<T>, item: T) -> usize {
    items.push(item);
    items.len() - 1
}

fn bounds<T: Element>(values: &[T]) -> (Bounds, Bounds) {
    let arity = T::ACCESSOR_TYPE.arity();
    let mut min = vec![f64::INFINITY; arity];
    let mut max = vec![f64::NEG_INFINITY; arity];
    for value in values {
        for component in 0..arity {
            let v = value.component(component);
            min[component] = min[component].min(v);
            max[component] = max[component].max(v);
        }
    }

    match T::COMPONENT_TYPE {
        ComponentType::Float => (
            Bounds::Float(min.into_iter().map(|v| v as f32).collect()),
            Bounds::Float(max.into_iter().map(|v| v as f32).collect()),
        ),
        _ => (
            Bounds::Integer(min.into_iter().map(|v| v as u32).collect()),
            Bounds::Integer(max.into_iter().map(|v| v as u32).collect()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_aligns_to_component_size() {
        let mut document = Document::new("");
        let mut packer = DataPacker::new();

        let indices = packer
            .append(&mut document, &[0u16, 1, 2], false, Some(BufferTarget::ElementArrayBuffer))
            .unwrap();
        let weights = packer.append(&mut document, &[0.5f32], false, None).unwrap();

        assert_eq!((indices, weights), (0, 1));
        assert_eq!(document.buffer_views[0].byte_offset, 0);
        assert_eq!(document.buffer_views[0].byte_length, 6);
        assert_eq!(document.buffer_views[1].byte_offset, 8);
        assert_eq!(packer.bytes()[6..8], [0, 0]);
        assert_eq!(packer.bytes()[8..12], 0.5f32.to_le_bytes());
    }

    #[test]
    fn test_append_bounds() {
        let mut document = Document::new("");
        let mut packer = DataPacker::new();
        let positions = [Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 3.0, -2.0)];

        let accessor = packer
            .append(&mut document, &positions, true, Some(BufferTarget::ArrayBuffer))
            .unwrap();

        let accessor = &document.accessors[accessor];
        assert_eq!(accessor.count, 2);
        assert_eq!(accessor.accessor_type, AccessorType::Vec3);
        assert_eq!(accessor.min, Some(Bounds::Float(vec![-1.0, 0.0, -2.0])));
        assert_eq!(accessor.max, Some(Bounds::Float(vec![1.0, 3.0, 2.0])));
        assert_eq!(packer.len(), 24);
    }

    #[test]
    fn test_integer_bounds() {
        let mut document = Document::new("");
        let mut packer = DataPacker::new();
        packer.append(&mut document, &[7u32, 3, 9], true, None).unwrap();

        assert_eq!(document.accessors[0].min, Some(Bounds::Integer(vec![3])));
        assert_eq!(document.accessors[0].max, Some(Bounds::Integer(vec![9])));
    }

    #[test]
    fn test_append_empty_fails() {
        let mut document = Document::new("");
        let mut packer = DataPacker::new();
        let result = packer.append::<f32>(&mut document, &[], false, None);

        assert!(matches!(result, Err(ExportError::UnsupportedFeature(_))));
        assert!(document.accessors.is_empty());
        assert!(packer.is_empty());
    }

    #[test]
    fn test_append_bytes_pads_to_four() {
        let mut document = Document::new("");
        let mut packer = DataPacker::new();
        packer.append_bytes(&mut document, &[1, 2, 3]).unwrap();
        let view = packer.append_bytes(&mut document, &[4]).unwrap();

        assert_eq!(document.buffer_views[view].byte_offset, 4);
        assert_eq!(packer.bytes(), &[1, 2, 3, 0, 4]);
        assert!(document.accessors.is_empty());
    }

    #[test]
    fn test_matrix_is_column_major() {
        let mut document = Document::new("");
        let mut packer = DataPacker::new();
        let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        packer.append(&mut document, &[matrix], false, None).unwrap();

        assert_eq!(packer.len(), 64);
        assert_eq!(packer.bytes()[48..52], 1.0f32.to_le_bytes());
    }
}

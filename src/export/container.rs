//! GLB / glTF file framing and staged output writes.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::warn;
use tracing::{info_span, instrument};

use crate::error::{ExportError, ExportResult};
use crate::filesystem::FileSystem;
use crate::gltf::Document;
use crate::options::{GltfFormat, JsonFormatting};

pub(crate) const GLTF_MAGIC: &[u8; 4] = b"glTF";
pub(crate) const GLTF_VERSION: u32 = 2;
pub(crate) const GLB_HEADER_BYTES: usize = 12;
pub(crate) const GLB_CHUNK_HEADER_BYTES: usize = 8;
pub(crate) const GLB_JSON_CHUNK_TYPE: &[u8; 4] = b"JSON";
pub(crate) const GLB_BIN_CHUNK_TYPE: &[u8; 4] = b"BIN\0";

const PARTIAL_SUFFIX: &str = ".partial";

/// A finished export, ready to be written.
#[derive(Debug, Clone)]
pub struct ExportedAsset {
    pub name: String,
    pub format: GltfFormat,
    pub json_formatting: JsonFormatting,
    pub document: Document,
    /// Packed buffer without trailing padding.
    pub buffer: Vec<u8>,
    /// Sidecar image files as (file name, bytes), glTF mode only.
    pub images: Vec<(String, Vec<u8>)>,
}

impl ExportedAsset {
    /// Every output file as (file name, bytes).
    pub fn files(&self) -> ExportResult<Vec<(String, Vec<u8>)>> {
        let json = self.document.to_json_bytes(self.json_formatting)?;
        match self.format {
            GltfFormat::Glb => {
                let mut glb = Vec::new();
                write_glb(&json, &self.buffer, &mut glb)?;
                Ok(vec![(format!("{}.glb", self.name), glb)])
            }
            GltfFormat::Gltf => {
                let mut files = vec![(format!("{}.gltf", self.name), json)];
                if !self.buffer.is_empty() {
                    files.push((format!("{}.bin", self.name), self.buffer.clone()));
                }
                files.extend(self.images.iter().cloned());
                Ok(files)
            }
        }
    }

    /// Writes all files into `output_dir` and returns their paths.
    ///
    /// Files are first written as `<file>.partial` and renamed once all of
    /// them made it to disk. On failure the written files are removed again.
    #[instrument(skip(self, fs), fields(name = %self.name, format = ?self.format))]
    pub fn write(&self, output_dir: &Path, fs: &dyn FileSystem) -> ExportResult<Vec<PathBuf>> {
        let files = self.files()?;
        fs.create_dir_all(output_dir)?;

        let mut staged = Vec::with_capacity(files.len());
        for (file_name, bytes) in &files {
            let path = output_dir.join(file_name);
            let partial = partial_path(&path);
            let _span = info_span!("fs_write", bytes = bytes.len()).entered();
            if let Err(error) = fs.write_file(&partial, bytes) {
                discard(fs, staged.iter().map(|(partial, _)| partial));
                return Err(error.into());
            }
            staged.push((partial, path));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (index, (partial, path)) in staged.iter().enumerate() {
            if let Err(error) = fs.rename(partial, path) {
                let pending = staged[index..].iter().map(|(partial, _)| partial);
                discard(fs, written.iter().chain(pending));
                return Err(error.into());
            }
            written.push(path.clone());
        }
        Ok(written)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(PARTIAL_SUFFIX);
    PathBuf::from(partial)
}

fn discard<'p>(fs: &dyn FileSystem, paths: impl IntoIterator<Item = &'p PathBuf>) {
    for path in paths {
        if let Err(error) = fs.remove_file(path) {
            warn!("Failed to remove {}: {error}", path.display());
        }
    }
}

fn padded_length(length: usize) -> ExportResult<usize> {
    length
        .checked_next_multiple_of(4)
        .ok_or(ExportError::ArithmeticOverflow("GLB chunk length"))
}

fn to_u32(value: usize, what: &'static str) -> ExportResult<u32> {
    u32::try_from(value).map_err(|_| ExportError::ArithmeticOverflow(what))
}

/// Write a GLB file. The BIN chunk is left out when `bin_data` is empty.
pub fn write_glb<W: Write>(json: &[u8], bin_data: &[u8], writer: &mut W) -> ExportResult<()> {
    let json_padded_length = padded_length(json.len())?;
    let bin_padded_length = padded_length(bin_data.len())?;

    let mut total_length = GLB_HEADER_BYTES
        .checked_add(GLB_CHUNK_HEADER_BYTES)
        .and_then(|length| length.checked_add(json_padded_length));
    if !bin_data.is_empty() {
        total_length = total_length
            .and_then(|length| length.checked_add(GLB_CHUNK_HEADER_BYTES))
            .and_then(|length| length.checked_add(bin_padded_length));
    }
    let total_length = total_length.ok_or(ExportError::ArithmeticOverflow("GLB length"))?;

    // Write GLB header
    writer.write_all(GLTF_MAGIC)?;
    writer.write_u32::<LittleEndian>(GLTF_VERSION)?;
    writer.write_u32::<LittleEndian>(to_u32(total_length, "GLB length")?)?;

    // Write JSON chunk, space padded
    writer.write_u32::<LittleEndian>(to_u32(json_padded_length, "GLB JSON chunk length")?)?;
    writer.write_all(GLB_JSON_CHUNK_TYPE)?;
    writer.write_all(json)?;
    for _ in json.len()..json_padded_length {
        writer.write_all(b" ")?;
    }

    if bin_data.is_empty() {
        return Ok(());
    }

    // Write BIN chunk, zero padded
    writer.write_u32::<LittleEndian>(to_u32(bin_padded_length, "GLB BIN chunk length")?)?;
    writer.write_all(GLB_BIN_CHUNK_TYPE)?;
    writer.write_all(bin_data)?;
    for _ in bin_data.len()..bin_padded_length {
        writer.write_all(&[0])?;
    }

    Ok(())
}

/// The chunks of a GLB file, padding included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlbChunks {
    pub json: Vec<u8>,
    pub bin: Option<Vec<u8>>,
}

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Splits a GLB file into its chunks, validating the framing.
pub fn read_glb<R: Read>(reader: &mut R) -> ExportResult<GlbChunks> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != GLTF_MAGIC {
        return Err(invalid_data("Invalid GLB magic").into());
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != GLTF_VERSION {
        return Err(invalid_data(format!("Unsupported GLB version: {version}")).into());
    }
    let total_length = reader.read_u32::<LittleEndian>()? as usize;

    let mut consumed = GLB_HEADER_BYTES;
    let mut chunks = Vec::new();
    while consumed < total_length {
        let length = reader.read_u32::<LittleEndian>()? as usize;
        let mut chunk_type = [0u8; 4];
        reader.read_exact(&mut chunk_type)?;
        let mut data = vec![0u8; length];
        reader.read_exact(&mut data)?;
        consumed += GLB_CHUNK_HEADER_BYTES + length;
        chunks.push((chunk_type, data));
    }
    if consumed != total_length {
        return Err(invalid_data("GLB length does not match its chunks").into());
    }

    let mut chunks = chunks.into_iter();
    let json = match chunks.next() {
        Some((chunk_type, data)) if &chunk_type == GLB_JSON_CHUNK_TYPE => data,
        _ => return Err(invalid_data("Expected JSON chunk").into()),
    };
    let bin = match chunks.next() {
        Some((chunk_type, data)) if &chunk_type == GLB_BIN_CHUNK_TYPE => Some(data),
        Some(_) => return Err(invalid_data("Expected BIN chunk").into()),
        None => None,
    };
    Ok(GlbChunks { json, bin })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_glb_framing() {
        let mut glb = Vec::new();
        write_glb(b"{\"a\":1}", &[1, 2, 3, 4, 5], &mut glb).unwrap();

        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(glb.len(), 12 + 8 + 8 + 8 + 8);
        assert_eq!(u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize, glb.len());
        assert_eq!(&glb[20..28], b"{\"a\":1} ");
        assert_eq!(&glb[36..44], &[1, 2, 3, 4, 5, 0, 0, 0]);

        let chunks = read_glb(&mut glb.as_slice()).unwrap();
        assert_eq!(chunks.json, b"{\"a\":1} ");
        assert_eq!(chunks.bin, Some(vec![1, 2, 3, 4, 5, 0, 0, 0]));
    }

    #[test]
    fn test_glb_without_bin_chunk() {
        let mut glb = Vec::new();
        write_glb(b"{}", &[], &mut glb).unwrap();

        assert_eq!(glb.len(), 24);
        let chunks = read_glb(&mut glb.as_slice()).unwrap();
        assert_eq!(chunks.bin, None);
    }

    #[test]
    fn test_read_glb_rejects_bad_magic() {
        let result = read_glb(&mut &b"gltf\x02\0\0\0\x0c\0\0\0"[..]);
        assert!(matches!(result, Err(ExportError::Io(_))));
    }

    fn asset(format: GltfFormat) -> ExportedAsset {
        ExportedAsset {
            name: "scene".to_string(),
            format,
            json_formatting: JsonFormatting::Compact,
            document: Document::new("test"),
            buffer: vec![7; 6],
            images: vec![("scene_albedo.png".to_string(), vec![1, 2])],
        }
    }

    #[test]
    fn test_write_gltf_files() {
        let fs = MemoryFileSystem::new();
        let written = asset(GltfFormat::Gltf).write(Path::new("out"), &fs).unwrap();

        assert_eq!(
            written,
            vec![
                PathBuf::from("out/scene.gltf"),
                PathBuf::from("out/scene.bin"),
                PathBuf::from("out/scene_albedo.png"),
            ]
        );
        assert_eq!(
            fs.list_files(),
            vec!["out/scene.bin", "out/scene.gltf", "out/scene_albedo.png"]
        );
        assert_eq!(fs.get_file("out/scene.bin"), Some(vec![7; 6]));
    }

    struct FailingFileSystem {
        inner: MemoryFileSystem,
        fail_on: &'static str,
    }

    impl FileSystem for FailingFileSystem {
        fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.inner.read_file(path)
        }

        fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
            if path.to_string_lossy().contains(self.fail_on) {
                return Err(io::Error::other("disk full"));
            }
            self.inner.write_file(path, data)
        }

        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            self.inner.create_dir_all(path)
        }

        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.inner.rename(from, to)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.inner.remove_file(path)
        }
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let fs = FailingFileSystem {
            inner: MemoryFileSystem::new(),
            fail_on: "albedo",
        };

        let result = asset(GltfFormat::Gltf).write(Path::new("out"), &fs);

        assert!(matches!(result, Err(ExportError::Io(_))));
        assert!(fs.inner.list_files().is_empty());
    }
}

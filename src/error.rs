use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

/// Everything that can abort an export run.
///
/// There is no per-entity recovery: indices in the output document are
/// positional, so a failing node, mesh or material fails the whole run.
#[derive(Debug)]
pub enum ExportError {
    /// A material uses a shader model we have no conversion for.
    UnsupportedShader(String),
    /// The scene uses something the exporter can not represent.
    UnsupportedFeature(String),
    /// A buffer offset or length does not fit the container's 32-bit fields.
    ArithmeticOverflow(&'static str),
    Io(io::Error),
    Json(serde_json::Error),
    Image(image::ImageError),
}

pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        ExportError::UnsupportedFeature(message.into())
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExportError::Io(error) => Some(error),
            ExportError::Json(error) => Some(error),
            ExportError::Image(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::UnsupportedShader(shader) => {
                write!(f, "Shader '{shader}' is not supported")
            }
            ExportError::UnsupportedFeature(message) => write!(f, "Unsupported: {message}"),
            ExportError::ArithmeticOverflow(what) => {
                write!(f, "Arithmetic overflow: {what} exceeds the addressable range")
            }
            ExportError::Io(error) => write!(f, "IO error: {error}"),
            ExportError::Json(error) => write!(f, "JSON error: {error}"),
            ExportError::Image(error) => write!(f, "Image error: {error}"),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(error: io::Error) -> Self {
        ExportError::Io(error)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(error: serde_json::Error) -> Self {
        ExportError::Json(error)
    }
}

impl From<image::ImageError> for ExportError {
    fn from(error: image::ImageError) -> Self {
        ExportError::Image(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ExportError::UnsupportedShader("Toon".to_string()).to_string(),
            "Shader 'Toon' is not supported"
        );
        assert_eq!(
            ExportError::ArithmeticOverflow("buffer length").to_string(),
            "Arithmetic overflow: buffer length exceeds the addressable range"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        let error: ExportError = io::Error::other("disk full").into();
        assert!(error.source().is_some());
        assert!(ExportError::unsupported("blend tree").source().is_none());
    }
}

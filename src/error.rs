//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the pelage crate.
///
/// Construction-time failures only. Per-frame arithmetic (sampling,
/// displacement, hair tests) never errors; degenerate inputs are clamped.
#[derive(Debug)]
pub enum FurError {
    /// Shell count must be at least one.
    InvalidShellCount(u32),
    /// A vertex attribute required by the operation is absent.
    MissingAttribute(String),
    /// A vertex attribute holds a different vertex count than positions.
    AttributeLengthMismatch {
        /// Attribute name.
        name: String,
        /// Vertices in the attribute.
        found: usize,
        /// Vertices in the position attribute.
        expected: usize,
    },
    /// A density source whose texels are not a `resolution²` grid within
    /// the texture limit.
    InvalidDensityField {
        /// Reported grid side.
        resolution: u32,
        /// Texels actually supplied.
        texels: usize,
    },
    /// The host shading program lacks a named extension point marker.
    MissingExtensionPoint(String),
    /// A fur mesh was drawn without a material attached.
    MissingMaterial,
    /// naga-oil failed to compose a shader permutation.
    ShaderCompose(String),
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for FurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShellCount(n) => {
                write!(f, "shell count must be positive, got {n}")
            }
            Self::MissingAttribute(name) => {
                write!(f, "base geometry has no '{name}' attribute")
            }
            Self::AttributeLengthMismatch {
                name,
                found,
                expected,
            } => write!(
                f,
                "attribute '{name}' has {found} vertices, positions have {expected}"
            ),
            Self::InvalidDensityField { resolution, texels } => write!(
                f,
                "density field of resolution {resolution} supplied {texels} texels"
            ),
            Self::MissingExtensionPoint(name) => {
                write!(f, "host shader has no '{name}' extension point")
            }
            Self::MissingMaterial => {
                write!(f, "fur mesh has no material attached")
            }
            Self::ShaderCompose(msg) => {
                write!(f, "shader composition failed: {msg}")
            }
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for FurError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for FurError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for FurError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_missing_attribute() {
        let err = FurError::MissingAttribute("position".to_owned());
        assert_eq!(err.to_string(), "base geometry has no 'position' attribute");
    }

    #[test]
    fn display_reports_mismatched_vertex_counts() {
        let err = FurError::AttributeLengthMismatch {
            name: "normal".to_owned(),
            found: 1,
            expected: 3,
        };
        assert_eq!(
            err.to_string(),
            "attribute 'normal' has 1 vertices, positions have 3"
        );
    }

    #[test]
    fn io_errors_expose_their_source() {
        let err = FurError::from(std::io::Error::other("disk gone"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

//! Shading-program seams between the fur core and a host material.
//!
//! The host owns the lighting model and exposes named extension points in its
//! program. The fur core fills those points with its displacement and
//! discard/shading blocks through a [`ShaderInjector`], and describes the
//! program permutation it needs through [`ProgramDefines`].

use std::fmt;

use glam::{Mat4, Vec3};

use crate::error::FurError;
use crate::geometry::POSITION;

/// Named places in a host program where fur code is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionPoint {
    /// Module imports at the top of the program.
    Imports,
    /// Fields of the per-vertex input struct.
    VertexInput,
    /// Fields of the vertex-to-fragment struct.
    Varyings,
    /// Vertex stage, after the host has its model-space position and normal.
    VertexDisplacement,
    /// Fragment stage, after the host has computed its diffuse color.
    FragmentDiffuse,
}

impl ExtensionPoint {
    /// Every extension point, in program order.
    pub const ALL: [Self; 5] = [
        Self::Imports,
        Self::VertexInput,
        Self::Varyings,
        Self::VertexDisplacement,
        Self::FragmentDiffuse,
    ];

    /// Marker name used in program sources.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::VertexInput => "vertex_input",
            Self::Varyings => "varyings",
            Self::VertexDisplacement => "vertex_displacement",
            Self::FragmentDiffuse => "fragment_diffuse",
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time shape of the fur program.
///
/// The collider count sizes a fixed array in the program, so changing it
/// means building a new material and recompiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramDefines {
    /// Number of colliders baked into the program, `None` when collision
    /// handling is compiled out.
    pub collider_count: Option<u32>,
}

impl ProgramDefines {
    /// Whether the collider loop is compiled in.
    #[must_use]
    pub fn colliders_active(&self) -> bool {
        self.collider_count.is_some()
    }
}

/// The lighting material the fur is layered onto.
///
/// Supplies the base color/opacity the hair test shades, and a program with
/// extension point markers for every [`ExtensionPoint`].
pub trait HostMaterial: Send + Sync + fmt::Debug {
    /// Label used for GPU resources.
    fn label(&self) -> &str;

    /// Program source containing the extension point markers.
    fn shader_source(&self) -> &str;

    /// Diffuse base color.
    fn base_color(&self) -> Vec3;

    /// Opacity, passed through unchanged by the hair test.
    fn opacity(&self) -> f32 {
        1.0
    }

    /// Vertex attributes the program reads, in shader location order.
    fn required_attributes(&self) -> &[&'static str] {
        &[POSITION]
    }

    /// Bytes of the host's per-draw uniform for a mesh drawn with `model`.
    fn uniform_data(&self, model: &Mat4) -> Vec<u8>;
}

/// Inserts code blocks into a host program at named extension points.
pub trait ShaderInjector {
    /// Insert `block` at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::MissingExtensionPoint`] when the program does not
    /// declare `point`.
    fn inject(&mut self, point: ExtensionPoint, block: &str) -> Result<(), FurError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_point_names_are_unique() {
        let mut names: Vec<_> = ExtensionPoint::ALL.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ExtensionPoint::ALL.len());
    }

    #[test]
    fn default_defines_compile_colliders_out() {
        assert!(!ProgramDefines::default().colliders_active());
    }
}

use glam::{Mat4, Vec3};

use crate::fur::program::HostMaterial;
use crate::geometry::{NORMAL, POSITION, UV};

/// Per-draw uniform of the Lambert host program.
/// Must match the WGSL MaterialUniform struct layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Model-to-world matrix.
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of the model matrix.
    pub normal_matrix: [[f32; 4]; 4],
    /// Diffuse base color.
    pub base_color: [f32; 3],
    /// Output alpha.
    pub opacity: f32,
    /// Direction the light travels, world space.
    pub light_dir: [f32; 3],
    /// Ambient floor of the Lambert term.
    pub ambient: f32,
}

/// Diffuse-only host material with fur extension points.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertMaterial {
    /// Diffuse base color.
    pub color: Vec3,
    /// Output alpha.
    pub opacity: f32,
    /// Direction the light travels, world space.
    pub light_dir: Vec3,
    /// Ambient floor in `[0, 1]`.
    pub ambient: f32,
}

impl Default for LambertMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::new(0.55, 0.4, 0.3),
            opacity: 1.0,
            light_dir: Vec3::new(-0.4, -1.0, -0.6),
            ambient: 0.35,
        }
    }
}

impl LambertMaterial {
    /// Uniform contents for a mesh drawn with `model`.
    #[must_use]
    pub fn uniform(&self, model: &Mat4) -> MaterialUniform {
        MaterialUniform {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            base_color: self.color.to_array(),
            opacity: self.opacity,
            light_dir: self.light_dir.to_array(),
            ambient: self.ambient,
        }
    }
}

impl HostMaterial for LambertMaterial {
    fn label(&self) -> &str {
        "Lambert"
    }

    fn shader_source(&self) -> &str {
        include_str!("../../assets/shaders/raster/mesh/lambert.wgsl")
    }

    fn base_color(&self) -> Vec3 {
        self.color
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }

    fn required_attributes(&self) -> &[&'static str] {
        &[POSITION, NORMAL, UV]
    }

    fn uniform_data(&self, model: &Mat4) -> Vec<u8> {
        bytemuck::bytes_of(&self.uniform(model)).to_vec()
    }
}

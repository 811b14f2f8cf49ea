use glam::Vec3;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fur::{Collider, FurParameters};

/// Shell stack and displacement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Shells", inline)]
#[serde(default)]
pub struct ShellOptions {
    #[schemars(title = "Shell Count", range(min = 1, max = 128))]
    pub shell_count: u32,
    #[schemars(title = "Fur Length", range(min = 0.0, max = 0.5), extend("step" = 0.005))]
    pub fur_length: f32,
    #[schemars(skip)]
    pub gravity: [f32; 3],
    #[schemars(title = "Collisions")]
    pub collisions_enabled: bool,
    #[schemars(title = "UV Repeat", range(min = 1.0, max = 64.0), extend("step" = 0.5))]
    pub uv_repeat: f32,
}

impl Default for ShellOptions {
    fn default() -> Self {
        let params = FurParameters::default();
        Self {
            shell_count: params.shell_count,
            fur_length: params.fur_length,
            gravity: params.gravity.to_array(),
            collisions_enabled: params.collisions_enabled,
            uv_repeat: params.uv_repeat,
        }
    }
}

impl From<&ShellOptions> for FurParameters {
    fn from(options: &ShellOptions) -> Self {
        Self {
            shell_count: options.shell_count,
            fur_length: options.fur_length,
            gravity: Vec3::from_array(options.gravity),
            collisions_enabled: options.collisions_enabled,
            uv_repeat: options.uv_repeat,
        }
    }
}

/// A world-space collision sphere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ColliderOptions {
    /// Sphere center, world space.
    pub center: [f32; 3],
    /// Sphere radius; non-positive radii never correct.
    pub radius: f32,
}

impl Default for ColliderOptions {
    fn default() -> Self {
        Self {
            center: [0.0; 3],
            radius: 0.5,
        }
    }
}

impl From<&ColliderOptions> for Collider {
    fn from(options: &ColliderOptions) -> Self {
        Self::new(Vec3::from_array(options.center), options.radius)
    }
}

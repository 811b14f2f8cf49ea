use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fur::DensityFieldConfig;

/// Density field generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Density", inline)]
#[serde(default)]
pub struct DensityOptions {
    #[schemars(title = "Resolution", range(min = 16, max = 2048))]
    pub resolution: u32,
    #[schemars(title = "Strands", range(min = 0, max = 200_000))]
    pub strand_count: u32,
    #[schemars(title = "Strand Size", range(min = 0.0, max = 8.0), extend("step" = 0.1))]
    pub max_strand_size: f32,
    #[schemars(skip)]
    pub length_range: [f32; 2],
    #[schemars(skip)]
    pub seed: u64,
}

impl Default for DensityOptions {
    fn default() -> Self {
        let config = DensityFieldConfig::default();
        Self {
            resolution: config.resolution,
            strand_count: config.strand_count,
            max_strand_size: config.max_strand_size,
            length_range: config.length_range,
            seed: config.seed,
        }
    }
}

impl From<&DensityOptions> for DensityFieldConfig {
    fn from(options: &DensityOptions) -> Self {
        Self {
            resolution: options.resolution,
            strand_count: options.strand_count,
            max_strand_size: options.max_strand_size,
            length_range: options.length_range,
            seed: options.seed,
        }
    }
}

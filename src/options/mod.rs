//! Fur configuration with TOML preset support.
//!
//! Shell, density and collider settings serialize to/from TOML for presets
//! stored in `assets/presets/`. Every section uses `#[serde(default)]` so a
//! preset only needs the values it overrides.

mod density;
mod shells;

use std::{path::Path, sync::Arc};

pub use density::DensityOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use shells::{ColliderOptions, ShellOptions};

use crate::error::FurError;
use crate::fur::{
    Collider, DensityFieldConfig, FurMaterial, FurParameters, HostMaterial,
};

/// Top-level fur options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct FurOptions {
    /// Shell stack and displacement.
    pub shells: ShellOptions,
    /// Density field generation.
    pub density: DensityOptions,
    /// Collision spheres, in the order they are resolved.
    #[schemars(skip)]
    pub colliders: Vec<ColliderOptions>,
}

impl FurOptions {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(FurOptions)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::Io`] if the file cannot be read, or
    /// [`FurError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, FurError> {
        let content = std::fs::read_to_string(path)?;
        let options = Self::from_toml(&content)?;
        log::info!("loaded fur options from {}", path.display());
        Ok(options)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::OptionsParse`] on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, FurError> {
        toml::from_str(content).map_err(|e| FurError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`FurError::OptionsParse`] if serialization fails or
    /// [`FurError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), FurError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FurError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Fur parameters from the `[shells]` section.
    #[must_use]
    pub fn parameters(&self) -> FurParameters {
        FurParameters::from(&self.shells)
    }

    /// Density field configuration from the `[density]` section.
    #[must_use]
    pub fn density_config(&self) -> DensityFieldConfig {
        DensityFieldConfig::from(&self.density)
    }

    /// Colliders in resolution order.
    #[must_use]
    pub fn colliders(&self) -> Vec<Collider> {
        self.colliders.iter().map(Collider::from).collect()
    }

    /// Build a material layering these options onto `host`.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::InvalidShellCount`] when `shell_count` is 0.
    pub fn build_material(
        &self,
        host: Arc<dyn HostMaterial>,
    ) -> Result<FurMaterial, FurError> {
        FurMaterial::with_density(
            host,
            self.parameters(),
            &self.colliders(),
            self.density_config(),
        )
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::renderer::lambert::LambertMaterial;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = FurOptions {
            colliders: vec![ColliderOptions {
                center: [0.0, 1.2, 0.0],
                radius: 0.3,
            }],
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = FurOptions::from_toml(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[shells]
shell_count = 32

[[colliders]]
center = [0.0, 1.0, 0.0]
";
        let opts = FurOptions::from_toml(toml_str).unwrap();
        assert_eq!(opts.shells.shell_count, 32);
        // Everything else should be default
        assert_eq!(opts.shells.fur_length, 0.03);
        assert_eq!(opts.density, DensityOptions::default());
        assert_eq!(opts.colliders[0].radius, 0.5);

        let params = opts.parameters();
        assert_eq!(params.shell_count, 32);
        assert_eq!(params.gravity, Vec3::new(0.0, -0.75, 0.0));
        assert_eq!(opts.density_config(), DensityFieldConfig::default());
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        assert!(matches!(
            FurOptions::from_toml("[shells]\nshell_count = \"many\""),
            Err(FurError::OptionsParse(_))
        ));
    }

    #[test]
    fn builds_a_material_with_the_configured_colliders() {
        let opts = FurOptions::from_toml(
            "[[colliders]]\ncenter = [0.0, 1.2, 0.0]\nradius = 0.3\n",
        )
        .unwrap();
        let material = opts
            .build_material(Arc::new(LambertMaterial::default()))
            .unwrap();
        assert_eq!(material.defines().collider_count, Some(1));
        assert_eq!(material.offsets().count(), 16);
    }

    #[test]
    fn bundled_presets_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/presets");
        let names = FurOptions::list_presets(&dir);
        assert!(names.contains(&"default".to_owned()));
        for name in names {
            let opts = FurOptions::load(&dir.join(format!("{name}.toml")))
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(opts.shells.shell_count > 0, "{name}");
        }
    }

    #[test]
    fn schema_exposes_ui_fields_only() {
        let schema = serde_json::to_value(FurOptions::json_schema()).unwrap();
        let shells = &schema["properties"]["shells"]["properties"];
        assert!(shells.get("shell_count").is_some());
        assert!(shells.get("gravity").is_none());
        assert!(schema["properties"].get("colliders").is_none());
    }
}

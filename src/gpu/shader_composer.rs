use std::{borrow::Cow, collections::HashMap};

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderDefValue,
    ShaderLanguage, ShaderType,
};

use crate::error::FurError;
use crate::fur::program::ProgramDefines;

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support and fur program permutations.
///
/// Pre-loads the shared WGSL modules at construction time. Host programs use
/// `#import pelage::module_name` to pull them in. The composer produces
/// `naga::Module` IR directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: source plus the file path reported in errors.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/camera.wgsl"),
        file_path: "modules/camera.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fur_math.wgsl"),
        file_path: "modules/fur_math.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fur.wgsl"),
        file_path: "modules/fur.wgsl",
    },
];

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::ShaderCompose`] if a shared module fails to parse.
    pub fn new() -> Result<Self, FurError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    FurError::ShaderCompose(format!(
                        "failed to register shader module '{}': {e:?}",
                        m.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// naga-oil shader defs for a fur program permutation.
    #[must_use]
    pub fn shader_defs(defines: &ProgramDefines) -> HashMap<String, ShaderDefValue> {
        let mut defs = HashMap::new();
        if let Some(count) = defines.collider_count {
            let _ = defs.insert("COLLIDERS".to_owned(), ShaderDefValue::Bool(true));
            let _ = defs.insert("COLLIDER_COUNT".to_owned(), ShaderDefValue::UInt(count));
        }
        defs
    }

    /// Compose a shader source string (which may contain `#import`
    /// directives) into a `wgpu::ShaderModule` ready for pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::ShaderCompose`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        defines: &ProgramDefines,
    ) -> Result<wgpu::ShaderModule, FurError> {
        let naga_module = self.compose_naga(source, label, defines)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::ShaderCompose`] if composition fails.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
        defines: &ProgramDefines,
    ) -> Result<naga::Module, FurError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                shader_defs: Self::shader_defs(defines),
                ..Default::default()
            })
            .map_err(|e| {
                FurError::ShaderCompose(format!(
                    "'{file_path}': {}",
                    e.emit_to_string(&self.composer)
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;

    use super::*;
    use crate::fur::{Collider, FurMaterial, FurParameters, HostMaterial};
    use crate::renderer::lambert::LambertMaterial;

    fn lambert() -> Arc<dyn HostMaterial> {
        Arc::new(LambertMaterial::default())
    }

    fn validate(module: &naga::Module) {
        let _ = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(module)
        .unwrap_or_else(|e| panic!("invalid module: {e:?}"));
    }

    #[test]
    fn host_program_composes_without_fur() {
        let mut composer = ShaderComposer::new().unwrap();
        let host = LambertMaterial::default();
        let module = composer
            .compose_naga(host.shader_source(), "lambert.wgsl", &ProgramDefines::default())
            .unwrap();
        validate(&module);
    }

    #[test]
    fn fur_program_composes_for_every_collider_count() {
        let mut composer = ShaderComposer::new().unwrap();
        let base = FurMaterial::new(lambert(), FurParameters::default(), &[]).unwrap();
        for count in [0usize, 1, 3, 8] {
            let colliders: Vec<Collider> = (0..count)
                .map(|i| Collider::new(Vec3::X * i as f32, 0.25))
                .collect();
            let material = base.with_colliders(&colliders);
            let source = material.shader_source().unwrap();
            let module = composer
                .compose_naga(&source, "fur_lambert.wgsl", &material.defines())
                .unwrap_or_else(|e| panic!("{count} colliders: {e}"));
            validate(&module);
        }
    }

    #[test]
    fn collider_defines_only_appear_with_colliders() {
        assert!(ShaderComposer::shader_defs(&ProgramDefines::default()).is_empty());
        let defs = ShaderComposer::shader_defs(&ProgramDefines {
            collider_count: Some(4),
        });
        assert_eq!(defs.get("COLLIDER_COUNT"), Some(&ShaderDefValue::UInt(4)));
        assert_eq!(defs.get("COLLIDERS"), Some(&ShaderDefValue::Bool(true)));
    }
}

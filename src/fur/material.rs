//! Fur shading configuration layered onto a host material.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};

use super::{
    density::{DensityField, DensityFieldConfig, DensitySource, MAX_DENSITY_RESOLUTION},
    displace::{Collider, ShellDisplacer},
    hair::{hair_fragment, HairFragment},
    mesh::FurMesh,
    program::{HostMaterial, ProgramDefines, ShaderInjector},
    shell::{generate_offsets, ShellOffsets},
};
use crate::error::FurError;
use crate::geometry::BaseGeometry;
use crate::gpu::extension::{inject_fur, WgslInjector};

/// Fur configuration. Immutable once a material is built from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FurParameters {
    /// Number of shells drawn.
    pub shell_count: u32,
    /// Extrusion of the outermost shell, in model units.
    pub fur_length: f32,
    /// Directional bias. Uploaded with the fur uniforms but not applied by
    /// the normal-extrusion displacement.
    pub gravity: Vec3,
    /// Compile the collider loop in when colliders are supplied.
    pub collisions_enabled: bool,
    /// Density field tiling across the surface UV range.
    pub uv_repeat: f32,
}

impl Default for FurParameters {
    fn default() -> Self {
        Self {
            shell_count: 16,
            fur_length: 0.03,
            gravity: Vec3::new(0.0, -0.75, 0.0),
            collisions_enabled: true,
            uv_repeat: 10.0,
        }
    }
}

/// A host material plus everything the fur program needs: shell offsets,
/// the density field, parameters, and the collider set.
///
/// The collider count is part of the program shape; use
/// [`FurMaterial::with_colliders`] to rebuild for a different set.
#[derive(Debug, Clone)]
pub struct FurMaterial {
    host: Arc<dyn HostMaterial>,
    params: FurParameters,
    colliders: Arc<[Collider]>,
    offsets: ShellOffsets,
    density: Arc<dyn DensitySource>,
}

impl FurMaterial {
    /// Material using the process-wide default density field.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::InvalidShellCount`] when `params.shell_count` is 0.
    pub fn new(
        host: Arc<dyn HostMaterial>,
        params: FurParameters,
        colliders: &[Collider],
    ) -> Result<Self, FurError> {
        Self::with_density(host, params, colliders, DensityFieldConfig::default())
    }

    /// Material using the shared density field for `density_config`.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::InvalidShellCount`] when `params.shell_count` is 0.
    pub fn with_density(
        host: Arc<dyn HostMaterial>,
        params: FurParameters,
        colliders: &[Collider],
        density_config: DensityFieldConfig,
    ) -> Result<Self, FurError> {
        Self::with_density_source(
            host,
            params,
            colliders,
            DensityField::shared(&density_config),
        )
    }

    /// Material drawing with a caller-supplied density field.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::InvalidShellCount`] when `params.shell_count` is 0
    /// and [`FurError::InvalidDensityField`] when the source's texels do not
    /// form a `resolution²` grid within [`MAX_DENSITY_RESOLUTION`].
    pub fn with_density_source(
        host: Arc<dyn HostMaterial>,
        params: FurParameters,
        colliders: &[Collider],
        density: Arc<dyn DensitySource>,
    ) -> Result<Self, FurError> {
        let resolution = density.resolution();
        let texels = density.texels().len();
        let side = resolution as usize;
        if resolution == 0 || resolution > MAX_DENSITY_RESOLUTION || texels != side * side {
            return Err(FurError::InvalidDensityField { resolution, texels });
        }
        let offsets = generate_offsets(params.shell_count)?;
        if params.fur_length <= 0.0 {
            log::warn!(
                "fur length {} is not positive; shells will not extrude",
                params.fur_length
            );
        }
        let inert = colliders.iter().filter(|c| c.radius <= 0.0).count();
        if inert > 0 {
            log::warn!("{inert} collider(s) with non-positive radius will never correct");
        }
        if !params.collisions_enabled && !colliders.is_empty() {
            log::debug!(
                "collisions disabled; ignoring {} collider(s)",
                colliders.len()
            );
        }

        log::debug!(
            "fur material '{}': {} shells, {} colliders",
            host.label(),
            params.shell_count,
            colliders.len()
        );

        Ok(Self {
            host,
            params,
            colliders: colliders.into(),
            offsets,
            density,
        })
    }

    /// Rebuild this material for a different collider set.
    ///
    /// Everything except the colliders (and therefore the program defines)
    /// carries over.
    #[must_use]
    pub fn with_colliders(&self, colliders: &[Collider]) -> Self {
        log::debug!(
            "rebuilding fur material '{}': {} -> {} colliders",
            self.host.label(),
            self.colliders.len(),
            colliders.len()
        );
        Self {
            colliders: colliders.into(),
            ..self.clone()
        }
    }

    /// Host material the fur is layered onto.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn HostMaterial> {
        &self.host
    }

    /// Fur parameters.
    #[must_use]
    pub fn params(&self) -> &FurParameters {
        &self.params
    }

    /// Colliders supplied at construction (active or not).
    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Shell offsets, shared by every mesh built from this material.
    #[must_use]
    pub fn offsets(&self) -> &ShellOffsets {
        &self.offsets
    }

    /// Density field the material samples.
    #[must_use]
    pub fn density(&self) -> &Arc<dyn DensitySource> {
        &self.density
    }

    fn colliders_active(&self) -> bool {
        self.params.collisions_enabled && !self.colliders.is_empty()
    }

    /// Program permutation this material needs.
    #[must_use]
    pub fn defines(&self) -> ProgramDefines {
        ProgramDefines {
            collider_count: self
                .colliders_active()
                .then_some(self.colliders.len() as u32),
        }
    }

    /// Packed collider uniform data, one entry per active collider.
    #[must_use]
    pub fn collider_data(&self) -> Vec<[f32; 4]> {
        if !self.colliders_active() {
            return Vec::new();
        }
        self.colliders.iter().map(Collider::to_vec4).collect()
    }

    /// CPU displacer for a mesh drawn with `model`.
    #[must_use]
    pub fn displacer(&self, model: &Mat4) -> ShellDisplacer {
        if self.colliders_active() {
            ShellDisplacer::with_colliders(self.params.fur_length, model, &self.colliders)
        } else {
            ShellDisplacer::new(self.params.fur_length)
        }
    }

    /// CPU evaluation of the fragment path: sample the density field at the
    /// tiled `uv` and run the hair test against the host's color.
    #[must_use]
    pub fn shade(&self, uv: Vec2, offset: f32) -> Option<HairFragment> {
        let tiled = uv * self.params.uv_repeat;
        let sample = self.density.sample(tiled.x, tiled.y);
        hair_fragment(&sample, offset, self.host.base_color(), self.host.opacity())
    }

    /// Build a fur mesh from `base` with this material's shells attached.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::MissingAttribute`] when `base` has no positions.
    pub fn create_mesh(self: &Arc<Self>, base: &BaseGeometry) -> Result<FurMesh, FurError> {
        Ok(FurMesh::build(base, &self.offsets)?.with_material(Arc::clone(self)))
    }

    /// Fill the host program's extension points through `injector`.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::MissingExtensionPoint`] when the host program
    /// lacks one of the markers.
    pub fn inject(&self, injector: &mut dyn ShaderInjector) -> Result<(), FurError> {
        inject_fur(injector)
    }

    /// The host program with the fur blocks injected (WGSL).
    ///
    /// # Errors
    ///
    /// Returns [`FurError::MissingExtensionPoint`] when the host program
    /// lacks one of the markers.
    pub fn shader_source(&self) -> Result<String, FurError> {
        let mut injector = WgslInjector::new(self.host.shader_source());
        self.inject(&mut injector)?;
        Ok(injector.into_source())
    }
}

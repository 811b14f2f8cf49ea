//! Instanced multi-shell mesh built from a base geometry.

use std::{collections::BTreeMap, sync::Arc};

use glam::Vec3;

use super::{displace::ShellDisplacer, material::FurMaterial, shell::ShellOffsets};
use crate::error::FurError;
use crate::geometry::{BaseGeometry, VertexAttribute, NORMAL, POSITION};

/// Name of the per-instance shell offset attribute.
pub const INSTANCE_OFFSET: &str = "instance_offset";

/// The base geometry drawn once per shell.
///
/// Vertex attributes and the index buffer are shared with the base geometry;
/// only the per-instance offsets are specific to the fur mesh.
#[derive(Debug, Clone)]
pub struct FurMesh {
    attributes: BTreeMap<String, VertexAttribute>,
    indices: Option<Arc<[u32]>>,
    instance_offsets: ShellOffsets,
    material: Option<Arc<FurMaterial>>,
}

impl FurMesh {
    /// Replicate `base` once per entry of `offsets`.
    ///
    /// # Errors
    ///
    /// Returns [`FurError::MissingAttribute`] when `base` has no position
    /// attribute and [`FurError::AttributeLengthMismatch`] when another
    /// attribute covers a different number of vertices. Every other
    /// attribute is passed through as-is.
    pub fn build(base: &BaseGeometry, offsets: &ShellOffsets) -> Result<Self, FurError> {
        let expected = base
            .attribute(POSITION)
            .ok_or_else(|| FurError::MissingAttribute(POSITION.to_owned()))?
            .vertex_count();
        if let Some((name, attribute)) = base
            .attributes()
            .find(|(_, attribute)| attribute.vertex_count() != expected)
        {
            return Err(FurError::AttributeLengthMismatch {
                name: name.to_owned(),
                found: attribute.vertex_count(),
                expected,
            });
        }

        let attributes: BTreeMap<String, VertexAttribute> = base
            .attributes()
            .map(|(name, attribute)| (name.to_owned(), attribute.clone()))
            .collect();

        log::debug!(
            "built fur mesh: {} vertices, {} attributes, {} shells",
            base.vertex_count(),
            attributes.len(),
            offsets.count()
        );

        Ok(Self {
            attributes,
            indices: base.indices().cloned(),
            instance_offsets: offsets.clone(),
            material: None,
        })
    }

    /// Attach the shading configuration this mesh is drawn with.
    #[must_use]
    pub fn with_material(mut self, material: Arc<FurMaterial>) -> Self {
        self.material = Some(material);
        self
    }

    /// Shading configuration, if attached.
    #[must_use]
    pub fn material(&self) -> Option<&Arc<FurMaterial>> {
        self.material.as_ref()
    }

    /// Number of instances (shells) drawn.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instance_offsets.count()
    }

    /// One offset per instance.
    #[must_use]
    pub fn instance_offsets(&self) -> &ShellOffsets {
        &self.instance_offsets
    }

    /// Shared vertex attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.get(name)
    }

    /// All shared vertex attributes, ordered by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &VertexAttribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shared index buffer, if the base geometry was indexed.
    #[must_use]
    pub fn indices(&self) -> Option<&Arc<[u32]>> {
        self.indices.as_ref()
    }

    /// Vertices per shell.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.attributes
            .get(POSITION)
            .map_or(0, VertexAttribute::vertex_count)
    }

    /// Displaced model-space positions of shell `shell` (0-based), evaluated
    /// on the CPU. `None` when `shell` is out of range.
    #[must_use]
    pub fn shell_positions(&self, shell: usize, displacer: &ShellDisplacer) -> Option<Vec<Vec3>> {
        let offset = *self.instance_offsets.get(shell)?;
        let positions = self.attributes.get(POSITION)?;
        let normals = self.attributes.get(NORMAL);
        let displaced = (0..positions.vertex_count())
            .map(|i| {
                let normal = normals.map_or(Vec3::ZERO, |n| n.vec3(i));
                displacer.displace(positions.vec3(i), normal, offset)
            })
            .collect();
        Some(displaced)
    }

    /// Model-space bounds `(min, max)` over the base surface and every shell.
    #[must_use]
    pub fn bounds(&self, displacer: &ShellDisplacer) -> Option<(Vec3, Vec3)> {
        let positions = self.attributes.get(POSITION)?;
        if positions.vertex_count() == 0 {
            return None;
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let base = (0..positions.vertex_count()).map(|i| positions.vec3(i));
        let shells = (0..self.instance_offsets.len())
            .filter_map(|s| self.shell_positions(s, displacer))
            .flatten();
        for p in base.chain(shells) {
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }
}

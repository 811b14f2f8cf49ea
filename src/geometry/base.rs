//! Attribute-buffer geometry shared between the base mesh and its shells.

use std::{collections::BTreeMap, sync::Arc};

use glam::{Vec2, Vec3};

/// Name of the required position attribute.
pub const POSITION: &str = "position";
/// Name of the vertex normal attribute.
pub const NORMAL: &str = "normal";
/// Name of the texture coordinate attribute.
pub const UV: &str = "uv";

/// One vertex attribute: flat scalar data plus components per vertex.
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    data: Arc<[f32]>,
    components: u32,
}

impl VertexAttribute {
    /// Attribute from flat data with `components` scalars per vertex.
    #[must_use]
    pub fn new(data: impl Into<Arc<[f32]>>, components: u32) -> Self {
        Self {
            data: data.into(),
            components: components.max(1),
        }
    }

    /// Attribute from 3-component vectors.
    #[must_use]
    pub fn from_vec3(values: &[Vec3]) -> Self {
        let data: Arc<[f32]> = values.iter().flat_map(|v| v.to_array()).collect();
        Self::new(data, 3)
    }

    /// Attribute from 2-component vectors.
    #[must_use]
    pub fn from_vec2(values: &[Vec2]) -> Self {
        let data: Arc<[f32]> = values.iter().flat_map(|v| v.to_array()).collect();
        Self::new(data, 2)
    }

    /// Flat scalar data.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Scalars per vertex.
    #[must_use]
    pub fn components(&self) -> u32 {
        self.components
    }

    /// Number of whole vertices stored.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.components as usize
    }

    /// Vertex `index` read as a `Vec3`. Missing components, and vertices
    /// past the end, read as zero.
    #[must_use]
    pub fn vec3(&self, index: usize) -> Vec3 {
        let stride = self.components as usize;
        let start = index.saturating_mul(stride);
        let values = self
            .data
            .get(start..start.saturating_add(stride))
            .unwrap_or_default();
        let mut out = [0.0; 3];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = *value;
        }
        Vec3::from_array(out)
    }

    /// True when both attributes point at the same buffer.
    #[must_use]
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Named vertex attributes plus an optional index buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseGeometry {
    attributes: BTreeMap<String, VertexAttribute>,
    indices: Option<Arc<[u32]>>,
}

impl BaseGeometry {
    /// Empty geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an attribute (builder style).
    #[must_use]
    pub fn with_attribute(mut self, name: &str, attribute: VertexAttribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Set the index buffer (builder style).
    #[must_use]
    pub fn with_indices(mut self, indices: impl Into<Arc<[u32]>>) -> Self {
        self.indices = Some(indices.into());
        self
    }

    /// Add or replace an attribute.
    pub fn set_attribute(&mut self, name: &str, attribute: VertexAttribute) {
        if let Some(previous) = self.attributes.insert(name.to_owned(), attribute) {
            log::debug!(
                "replaced '{name}' attribute ({} vertices)",
                previous.vertex_count()
            );
        }
    }

    /// Attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.get(name)
    }

    /// All attributes, ordered by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &VertexAttribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shared index buffer, if indexed.
    #[must_use]
    pub fn indices(&self) -> Option<&Arc<[u32]>> {
        self.indices.as_ref()
    }

    /// Vertex count according to the position attribute.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.attribute(POSITION)
            .map_or(0, VertexAttribute::vertex_count)
    }
}

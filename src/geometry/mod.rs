//! Base surface geometry consumed by the fur mesh builder.

pub mod base;
mod icosphere;

pub use base::{BaseGeometry, VertexAttribute, NORMAL, POSITION, UV};
pub use icosphere::icosphere;

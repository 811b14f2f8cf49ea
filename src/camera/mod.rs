//! Perspective camera and its GPU binding.

/// Camera uniform buffer and bind group.
pub mod binding;
/// Core camera struct and GPU uniform type.
pub mod core;

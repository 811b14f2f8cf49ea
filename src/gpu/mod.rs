//! GPU resource management utilities.
//!
//! Provides wgpu device initialization, growable buffers, the density
//! texture, host-program injection, and shader composition.

/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// WGSL extension point injection for host programs.
pub mod extension;
/// wgpu device and queue ownership.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Density field texture upload.
pub mod texture;

// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::private_intra_doc_links)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::too_many_lines)]
#![deny(clippy::too_many_arguments)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::str_to_string)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]

//! Shell-based procedural fur rendering built on wgpu.
//!
//! A mesh is drawn N times as concentric shells pushed out along the surface
//! normal. A tileable density field decides, per fragment, whether a strand
//! reaches the current shell; fragments without hair are discarded, which
//! reads as fur from a distance. Shell tips can be pushed out of a fixed set
//! of world-space spheres.
//!
//! # Key entry points
//!
//! - [`fur::FurMaterial`] - fur parameters, colliders and density field
//!   layered onto a [`fur::HostMaterial`]
//! - [`fur::FurMesh`] - the base geometry instanced once per shell
//! - [`renderer::fur_pass::FurRenderer`] - the instanced wgpu draw
//! - [`options::FurOptions`] - TOML presets
//!
//! The per-vertex and per-fragment rules live in [`fur::displace`] and
//! [`fur::hair`] as plain functions; the WGSL modules mirror them.

pub mod camera;
pub mod error;
pub mod fur;
pub mod geometry;
pub mod gpu;
pub mod options;
pub mod renderer;

pub use error::FurError;

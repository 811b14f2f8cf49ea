//! Shell-based fur: offsets, density field, displacement, hair test, mesh
//! building, and the material that ties them to a host program.
//!
//! The per-vertex ([`displace`]) and per-fragment ([`hair`]) rules are pure
//! functions; the WGSL modules under `assets/shaders/modules/` mirror them
//! for the GPU path.

pub mod density;
pub mod displace;
pub mod hair;
pub mod material;
pub mod mesh;
pub mod program;
pub mod shell;

pub use density::{
    clear_shared_fields, DensityField, DensityFieldConfig, DensityFieldSample,
    DensitySource, MAX_DENSITY_RESOLUTION,
};
pub use displace::{Collider, ShellDisplacer};
pub use hair::{hair_fragment, shadow_factor, HairFragment};
pub use material::{FurMaterial, FurParameters};
pub use mesh::{FurMesh, INSTANCE_OFFSET};
pub use program::{ExtensionPoint, HostMaterial, ProgramDefines, ShaderInjector};
pub use shell::{generate_offsets, ShellOffsets};

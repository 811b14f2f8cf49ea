//! Rendering: the instanced fur pass and the Lambert host material it is
//! tested against.

pub mod fur_pass;
pub mod lambert;
pub(crate) mod pipeline_util;

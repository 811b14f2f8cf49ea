//! WGSL adapter for host-program extension points.
//!
//! A host program marks each extension point with a comment on its own line:
//!
//! ```wgsl
//! // @extension(vertex_displacement)
//! ```
//!
//! [`WgslInjector`] replaces the marker line with the block, keeping the
//! marker's indentation. The fur blocks expect the host to provide
//! `local_position` (a `var`), `local_normal`, `out`, `in.uv` and a
//! `diffuse_color` `var` in the fragment stage.

use crate::error::FurError;
use crate::fur::program::{ExtensionPoint, ShaderInjector};

/// Vertex input location reserved for the per-instance shell offset.
pub const INSTANCE_OFFSET_LOCATION: u32 = 8;
/// Inter-stage location reserved for the shell offset varying.
pub const SHELL_OFFSET_VARYING: u32 = 8;

const IMPORTS: &str = "\
#import pelage::fur::{displace_shell, sample_hair}
#import pelage::fur_math::{is_hair, shadow_factor}";

const VERTEX_INPUT: &str = "@location(8) instance_offset: f32,";

const VARYINGS: &str = "@location(8) shell_offset: f32,";

const VERTEX_DISPLACEMENT: &str = "\
local_position = displace_shell(local_position, local_normal, in.instance_offset);
out.shell_offset = in.instance_offset;";

const FRAGMENT_DIFFUSE: &str = "\
let hair = sample_hair(in.uv);
if (!is_hair(hair.a, hair.g, in.shell_offset)) {
    discard;
}
diffuse_color = vec4<f32>(diffuse_color.rgb * shadow_factor(hair.b, in.shell_offset), diffuse_color.a);";

/// Fur code for each extension point, in program order.
pub const FUR_BLOCKS: [(ExtensionPoint, &str); 5] = [
    (ExtensionPoint::Imports, IMPORTS),
    (ExtensionPoint::VertexInput, VERTEX_INPUT),
    (ExtensionPoint::Varyings, VARYINGS),
    (ExtensionPoint::VertexDisplacement, VERTEX_DISPLACEMENT),
    (ExtensionPoint::FragmentDiffuse, FRAGMENT_DIFFUSE),
];

/// Inject every fur block through `injector`.
///
/// # Errors
///
/// Propagates the first [`FurError::MissingExtensionPoint`].
pub fn inject_fur(injector: &mut dyn ShaderInjector) -> Result<(), FurError> {
    for (point, block) in FUR_BLOCKS {
        injector.inject(point, block)?;
    }
    Ok(())
}

/// Marker-replacing injector over an owned WGSL source.
#[derive(Debug, Clone)]
pub struct WgslInjector {
    source: String,
}

impl WgslInjector {
    /// Injector over a copy of `source`.
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_owned(),
        }
    }

    /// Marker text for `point`.
    #[must_use]
    pub fn marker(point: ExtensionPoint) -> String {
        format!("// @extension({})", point.name())
    }

    /// The source with every injection applied so far.
    #[must_use]
    pub fn into_source(self) -> String {
        self.source
    }
}

impl ShaderInjector for WgslInjector {
    fn inject(&mut self, point: ExtensionPoint, block: &str) -> Result<(), FurError> {
        let marker = Self::marker(point);
        let Some(start) = self.source.find(&marker) else {
            return Err(FurError::MissingExtensionPoint(point.name().to_owned()));
        };
        let line_start = self.source[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.source[start..]
            .find('\n')
            .map_or(self.source.len(), |i| start + i);
        let indent: String = self.source[line_start..start]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();

        let indented = block
            .lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{indent}{line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.source.replace_range(line_start..line_end, &indented);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "\
// @extension(imports)
struct VertexInput {
    @location(0) position: vec3<f32>,
    // @extension(vertex_input)
};
fn vs_main() {
        // @extension(vertex_displacement)
}
";

    #[test]
    fn marker_lines_are_replaced_with_indented_blocks() {
        let mut injector = WgslInjector::new(HOST);
        injector
            .inject(ExtensionPoint::VertexInput, "@location(8) a: f32,")
            .unwrap();
        injector
            .inject(ExtensionPoint::VertexDisplacement, "let x = 1;\nlet y = 2;")
            .unwrap();
        let source = injector.into_source();
        assert!(source.contains("\n    @location(8) a: f32,\n};"));
        assert!(source.contains("\n        let x = 1;\n        let y = 2;\n}"));
        assert!(source.starts_with("// @extension(imports)"));
    }

    #[test]
    fn missing_marker_is_reported_by_name() {
        let mut injector = WgslInjector::new(HOST);
        let err = injector
            .inject(ExtensionPoint::FragmentDiffuse, "discard;")
            .unwrap_err();
        assert!(matches!(err, FurError::MissingExtensionPoint(name) if name == "fragment_diffuse"));
    }

    #[test]
    fn fur_blocks_use_the_reserved_locations() {
        assert!(VERTEX_INPUT.contains(&format!("@location({INSTANCE_OFFSET_LOCATION})")));
        assert!(VARYINGS.contains(&format!("@location({SHELL_OFFSET_VARYING})")));
        assert_eq!(FUR_BLOCKS.len(), ExtensionPoint::ALL.len());
    }
}

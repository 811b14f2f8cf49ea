//! Per-fragment hair visibility and shading.

use glam::Vec3;

use super::density::DensityFieldSample;

/// Shadow factor at the innermost shell.
const INNER_SHADOW: f32 = 0.5;
/// Scale applied to sampled darkness at the outermost shell.
const DARKNESS_GAIN: f32 = 1.2;

/// A visible hair fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HairFragment {
    /// Shaded diffuse color.
    pub color: Vec3,
    /// Opacity, passed through from the host material.
    pub opacity: f32,
}

/// `mix(0.5, darkness * 1.2, offset)`: inner shells stay near half
/// brightness, outer shells take on the strand's darkness.
#[inline]
#[must_use]
pub fn shadow_factor(darkness: f32, offset: f32) -> f32 {
    INNER_SHADOW + (darkness * DARKNESS_GAIN - INNER_SHADOW) * offset
}

/// Whether a strand with `sample` reaches the shell at `offset`.
#[inline]
#[must_use]
pub fn is_hair(sample: &DensityFieldSample, offset: f32) -> bool {
    sample.presence > 0.0 && sample.length_fraction >= offset
}

/// Shade the fragment, or `None` when it should be discarded.
///
/// Fragments are discarded where no strand exists, or where the strand ends
/// before reaching this shell.
#[inline]
#[must_use]
pub fn hair_fragment(
    sample: &DensityFieldSample,
    offset: f32,
    base_color: Vec3,
    opacity: f32,
) -> Option<HairFragment> {
    is_hair(sample, offset).then(|| HairFragment {
        color: base_color * shadow_factor(sample.darkness, offset),
        opacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(presence: f32, length_fraction: f32, darkness: f32) -> DensityFieldSample {
        DensityFieldSample {
            presence,
            length_fraction,
            darkness,
        }
    }

    #[test]
    fn absent_strand_is_always_discarded() {
        for length in [0.0, 0.5, 1.0] {
            for offset in [0.0625, 0.5, 1.0] {
                let s = sample(0.0, length, 0.7);
                assert_eq!(hair_fragment(&s, offset, Vec3::ONE, 1.0), None);
            }
        }
    }

    #[test]
    fn short_strand_is_discarded_on_outer_shells() {
        let s = sample(1.0, 0.3, 0.4);
        assert_eq!(hair_fragment(&s, 0.5, Vec3::ONE, 1.0), None);
        assert!(hair_fragment(&s, 0.25, Vec3::ONE, 1.0).is_some());
    }

    #[test]
    fn visible_strand_is_shaded_by_offset() {
        let darkness = 0.6;
        let s = sample(1.0, 0.8, darkness);
        let base = Vec3::new(0.8, 0.5, 0.2);
        let fragment = hair_fragment(&s, 0.5, base, 0.9).unwrap();

        let expected = 0.5 + (darkness * 1.2 - 0.5) * 0.5;
        assert!((shadow_factor(darkness, 0.5) - expected).abs() < 1e-6);
        assert!(fragment.color.abs_diff_eq(base * expected, 1e-6));
        assert_eq!(fragment.opacity, 0.9);
    }

    #[test]
    fn shadow_spans_inner_to_outer() {
        assert_eq!(shadow_factor(0.25, 0.0), 0.5);
        assert!((shadow_factor(0.25, 1.0) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn strand_ending_exactly_at_shell_is_visible() {
        let s = sample(1.0, 0.5, 0.0);
        assert!(is_hair(&s, 0.5));
    }
}

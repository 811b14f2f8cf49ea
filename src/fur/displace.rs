//! Shell vertex displacement and sphere collider correction.
//!
//! Each shell vertex is extruded along its normal by `offset * fur_length`.
//! Colliders are then applied one at a time, in input order: the collider
//! center (moved into model space) is projected onto the segment from the
//! base vertex to the shell tip, and a tip inside the sphere is pushed along
//! the projected-point direction until it lands on the sphere. Colliders are not
//! resolved globally, so overlapping spheres may under- or over-correct.
//!
//! `assets/shaders/modules/fur.wgsl` implements the same math per vertex.

use glam::{Mat4, Vec3};

/// Segments shorter than this (squared) are treated as a single point.
const DEGENERATE_SEGMENT_SQ: f32 = 1e-12;

/// A world-space sphere that fur is pushed out of.
///
/// Must match the WGSL collider layout: xyz = center, w = radius.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Collider {
    /// Sphere center in world space.
    pub center: [f32; 3],
    /// Sphere radius. Non-positive radii never correct anything.
    pub radius: f32,
}

impl Collider {
    /// Sphere at `center` with `radius`.
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center: center.to_array(),
            radius,
        }
    }

    /// Center as a vector.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    /// Packed `[x, y, z, radius]` as uploaded to the GPU.
    #[must_use]
    pub fn to_vec4(&self) -> [f32; 4] {
        [self.center[0], self.center[1], self.center[2], self.radius]
    }
}

/// Un-corrected shell tip: `position + normal * (offset * fur_length)`.
#[inline]
#[must_use]
pub fn shell_tip(position: Vec3, normal: Vec3, offset: f32, fur_length: f32) -> Vec3 {
    position + normal * (offset * fur_length)
}

/// Closest point to `point` on the segment `[start, end]`.
///
/// A zero-length segment yields `end`.
#[inline]
#[must_use]
pub fn closest_point_on_segment(start: Vec3, end: Vec3, point: Vec3) -> Vec3 {
    let ab = end - start;
    let denom = ab.length_squared();
    if denom <= DEGENERATE_SEGMENT_SQ {
        return end;
    }
    let t = ((point - start).dot(ab) / denom).clamp(0.0, 1.0);
    start + ab * t
}

/// Apply one model-space collider to a shell tip.
///
/// The tip moves along the direction from the collider center to its
/// projection on the base-to-tip segment, far enough to sit exactly on the
/// sphere. Returns `tip` unchanged when the tip is outside the sphere or the radius
/// is non-positive.
#[inline]
#[must_use]
pub fn resolve_collider(
    base: Vec3,
    tip: Vec3,
    normal: Vec3,
    center: Vec3,
    radius: f32,
) -> Vec3 {
    let to_tip = tip - center;
    let dist = to_tip.length();
    if radius <= 0.0 || dist >= radius {
        return tip;
    }

    let projected = closest_point_on_segment(base, tip, center);
    let push = (projected - center)
        .try_normalize()
        .or_else(|| to_tip.try_normalize())
        .unwrap_or(normal);
    // Positive root of |to_tip + s * push| = radius; `dist < radius` keeps
    // the discriminant positive.
    let along = to_tip.dot(push);
    let s = (along * along + radius * radius - dist * dist).max(0.0).sqrt() - along;
    tip + push * s
}

/// Per-frame displacement state: fur length plus colliders already moved
/// into the mesh's model space.
#[derive(Debug, Clone)]
pub struct ShellDisplacer {
    fur_length: f32,
    /// `(model-space center, radius)` per active collider.
    local_colliders: Vec<(Vec3, f32)>,
}

impl ShellDisplacer {
    /// Displacer with no colliders.
    #[must_use]
    pub fn new(fur_length: f32) -> Self {
        Self {
            fur_length,
            local_colliders: Vec::new(),
        }
    }

    /// Displacer whose colliders are transformed by the inverse of `model`.
    ///
    /// Radii are kept as given; the model transform is expected to be rigid.
    #[must_use]
    pub fn with_colliders(fur_length: f32, model: &Mat4, colliders: &[Collider]) -> Self {
        let inv_model = model.inverse();
        let local_colliders = colliders
            .iter()
            .map(|c| (inv_model.transform_point3(c.center()), c.radius))
            .collect();
        Self {
            fur_length,
            local_colliders,
        }
    }

    /// Max fur length this displacer extrudes to.
    #[must_use]
    pub fn fur_length(&self) -> f32 {
        self.fur_length
    }

    /// Number of colliders applied per vertex.
    #[must_use]
    pub fn collider_count(&self) -> usize {
        self.local_colliders.len()
    }

    /// Displaced model-space position of one vertex on the shell at `offset`.
    #[must_use]
    pub fn displace(&self, position: Vec3, normal: Vec3, offset: f32) -> Vec3 {
        let mut tip = shell_tip(position, normal, offset, self.fur_length);
        for &(center, radius) in &self.local_colliders {
            tip = resolve_collider(position, tip, normal, center, radius);
        }
        tip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn sample_vertices() -> Vec<(Vec3, Vec3)> {
        vec![
            (Vec3::ZERO, Vec3::Y),
            (Vec3::new(1.0, -2.0, 0.5), Vec3::new(1.0, 1.0, 0.0).normalize()),
            (Vec3::new(-0.3, 0.7, 4.0), Vec3::NEG_Z),
            (Vec3::new(10.0, 0.0, -3.0), Vec3::new(0.2, -0.4, 0.9).normalize()),
        ]
    }

    #[test]
    fn no_colliders_extrudes_along_normal() {
        for fur_length in [0.03, 0.05, 1.5] {
            let displacer = ShellDisplacer::new(fur_length);
            for (p, n) in sample_vertices() {
                for offset in [1.0 / 16.0, 0.5, 1.0] {
                    let out = displacer.displace(p, n, offset);
                    let expected = p + n * (offset * fur_length);
                    assert!(out.abs_diff_eq(expected, EPS), "{out} != {expected}");
                }
            }
        }
    }

    #[test]
    fn enclosing_collider_pushes_tip_onto_surface() {
        // Collider beyond the tip along the normal: the push is radial.
        let collider = Collider::new(Vec3::new(0.0, 1.2, 0.0), 0.5);
        let displacer =
            ShellDisplacer::with_colliders(1.0, &Mat4::IDENTITY, &[collider]);
        let out = displacer.displace(Vec3::ZERO, Vec3::Y, 1.0);
        assert!((out.distance(collider.center()) - collider.radius).abs() < EPS);
        assert!(out.abs_diff_eq(Vec3::new(0.0, 0.7, 0.0), EPS));
    }

    #[test]
    fn lateral_collider_at_tip_height_pushes_sideways() {
        let collider = Collider::new(Vec3::new(0.01, 0.03, 0.0), 0.02);
        let displacer =
            ShellDisplacer::with_colliders(0.03, &Mat4::IDENTITY, &[collider]);
        let out = displacer.displace(Vec3::ZERO, Vec3::Y, 1.0);
        assert!((out.distance(collider.center()) - collider.radius).abs() < EPS);
        assert!(out.abs_diff_eq(Vec3::new(-0.01, 0.03, 0.0), EPS));
    }

    #[test]
    fn off_axis_collider_still_lands_tip_on_surface() {
        // Projection of the center falls mid-segment, so the push is not
        // radial from the center.
        let collider = Collider::new(Vec3::new(0.3, 0.8, 0.0), 0.5);
        let displacer =
            ShellDisplacer::with_colliders(1.0, &Mat4::IDENTITY, &[collider]);
        let out = displacer.displace(Vec3::ZERO, Vec3::Y, 1.0);
        assert!((out.distance(collider.center()) - collider.radius).abs() < EPS);
        // Push is along -X from the projected point (0, 0.8, 0).
        let expected_x = 0.3 - 0.21_f32.sqrt();
        assert!(out.abs_diff_eq(Vec3::new(expected_x, 1.0, 0.0), EPS), "{out}");
    }

    #[test]
    fn collider_outside_reach_leaves_tip_alone() {
        let collider = Collider::new(Vec3::new(0.0, 2.0, 0.0), 0.5);
        let displacer =
            ShellDisplacer::with_colliders(1.0, &Mat4::IDENTITY, &[collider]);
        for (p, n) in sample_vertices() {
            let out = displacer.displace(p, n, 0.75);
            let tip = shell_tip(p, n, 0.75, 1.0);
            if tip.distance(collider.center()) >= collider.radius {
                assert_eq!(out, tip);
            }
        }
        // Exactly on the surface counts as outside.
        let touching = Collider::new(Vec3::new(0.0, 1.5, 0.0), 0.5);
        let displacer =
            ShellDisplacer::with_colliders(1.0, &Mat4::IDENTITY, &[touching]);
        assert_eq!(displacer.displace(Vec3::ZERO, Vec3::Y, 1.0), Vec3::Y);
    }

    #[test]
    fn non_positive_radius_never_corrects() {
        for radius in [0.0, -1.0] {
            let collider = Collider::new(Vec3::new(0.0, 0.5, 0.0), radius);
            let displacer =
                ShellDisplacer::with_colliders(1.0, &Mat4::IDENTITY, &[collider]);
            assert_eq!(displacer.displace(Vec3::ZERO, Vec3::Y, 0.5), Vec3::new(0.0, 0.5, 0.0));
        }
    }

    #[test]
    fn degenerate_segment_projects_to_tip() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(closest_point_on_segment(p, p, Vec3::ZERO), p);

        // Zero fur length: tip == base, collider still resolves finitely.
        let collider = Collider::new(p + Vec3::X * 0.1, 0.5);
        let out = resolve_collider(p, p, Vec3::Y, collider.center(), collider.radius);
        assert!(out.is_finite());
        assert!((out.distance(collider.center()) - 0.5).abs() < EPS);
    }

    #[test]
    fn collider_centered_on_segment_falls_back_to_radial_push() {
        // Center lies on the segment below the tip; projected point == center.
        let center = Vec3::new(0.0, 0.8, 0.0);
        let out = resolve_collider(Vec3::ZERO, Vec3::Y, Vec3::Y, center, 0.5);
        assert!(out.is_finite());
        assert!((out.distance(center) - 0.5).abs() < EPS);
    }

    #[test]
    fn collider_centered_on_tip_falls_back_to_normal() {
        let out = resolve_collider(Vec3::ZERO, Vec3::Y, Vec3::Y, Vec3::Y, 0.25);
        assert!(out.abs_diff_eq(Vec3::new(0.0, 1.25, 0.0), EPS));
    }

    #[test]
    fn colliders_are_moved_into_model_space() {
        let model = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let collider = Collider::new(Vec3::new(5.0, 1.2, 0.0), 0.5);
        let displacer = ShellDisplacer::with_colliders(1.0, &model, &[collider]);
        let out = displacer.displace(Vec3::ZERO, Vec3::Y, 1.0);
        assert!(out.abs_diff_eq(Vec3::new(0.0, 0.7, 0.0), EPS));
    }

    #[test]
    fn colliders_apply_in_input_order() {
        let above = Collider::new(Vec3::new(0.0, 1.2, 0.0), 0.5);
        let beside = Collider::new(Vec3::new(0.3, 1.0, 0.0), 0.35);

        // `above` lands the tip at y = 0.7, which `beside` no longer reaches.
        let ab = ShellDisplacer::with_colliders(1.0, &Mat4::IDENTITY, &[above, beside]);
        let tip_ab = ab.displace(Vec3::ZERO, Vec3::Y, 1.0);
        assert!(tip_ab.abs_diff_eq(Vec3::new(0.0, 0.7, 0.0), EPS));

        // `beside` first shoves the tip sideways, then `above` pushes it
        // radially onto its own surface.
        let ba = ShellDisplacer::with_colliders(1.0, &Mat4::IDENTITY, &[beside, above]);
        let tip_ba = ba.displace(Vec3::ZERO, Vec3::Y, 1.0);
        assert!(tip_ba.x < 0.0);
        assert!((tip_ba.distance(above.center()) - above.radius).abs() < EPS);
    }
}

/*
 * Geometry Module
 *
 * Small vector, angle and rectangle helpers shared by the grid, the boid
 * pipeline and the fluid field. Everything here is a pure function over
 * nannou's glam vectors and geom::Rect.
 */

use nannou::prelude::*;

// Substituted for zero denominators everywhere in the core
pub const EPSILON: f32 = 1e-6;

// Limit the length of a vector without changing its direction
#[inline]
pub fn clamped_direction(v: Vec2, max_len: f32) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > max_len * max_len && len_sq > 0.0 {
        v * (max_len / len_sq.sqrt())
    } else {
        v
    }
}

/// Renormalize `v` so its length lies in `[min, max]`.
///
/// A zero vector has no direction to keep, so it is replaced by `+x * min`.
#[inline]
pub fn clamp_speed(v: Vec2, min: f32, max: f32) -> Vec2 {
    let len = v.length();
    if len < EPSILON {
        return vec2(min, 0.0);
    }
    let target = len.clamp(min, max.max(min));
    if target == len {
        v
    } else {
        v * (target / len)
    }
}

// Angle between two vectors given their already computed lengths
#[inline]
pub fn angle_between(a: Vec2, b: Vec2, len_a: f32, len_b: f32) -> f32 {
    let denom = len_a * len_b;
    if denom < EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

// Euclidean remainder, so negative coordinates wrap to the far side
#[inline]
pub fn wrap_index(i: i32, n: usize) -> usize {
    i.rem_euclid(n.max(1) as i32) as usize
}

#[inline]
pub fn safe_div(num: f32, denom: f32) -> f32 {
    if denom.abs() < EPSILON {
        num / EPSILON.copysign(denom)
    } else {
        num / denom
    }
}

// Grow a rectangle by `margin` on every side
pub fn expand_rect(rect: Rect, margin: f32) -> Rect {
    Rect::from_corners(
        pt2(rect.left() - margin, rect.bottom() - margin),
        pt2(rect.right() + margin, rect.top() + margin),
    )
}

// A minimized window reports a zero-area rect
pub fn is_degenerate(rect: Rect) -> bool {
    !(rect.w() > EPSILON && rect.h() > EPSILON)
}

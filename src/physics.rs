/*
 * Physics Module
 *
 * Per-boid steering kernels: turning accumulated neighbor sums into a
 * Reynolds steering force, mouse interaction, impulse pushes and the two
 * border policies. The per-tick pipeline that drives them lives in the
 * boid module.
 *
 * Optimized for performance by:
 * - Working from squared radii and reusing lengths computed by the scan
 * - Combining all three rules into a single steering vector per boid
 */

use nannou::prelude::*;

use crate::geometry::{angle_between, clamped_direction, EPSILON};
use crate::impulse::Impulse;
use crate::params::SimulationParams;

/// Neighbor sums gathered for one boid during the grid scan.
///
/// `cohesion` accumulates neighbor offsets relative to the boid, so its
/// average is the direction to the local center of mass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlockSums {
    pub cohesion: Vec2,
    pub alignment: Vec2,
    pub separation: Vec2,
    pub cohesion_count: u32,
    pub alignment_count: u32,
    pub separation_count: u32,
}

impl FlockSums {
    pub fn density(&self) -> u32 {
        self.cohesion_count.max(self.alignment_count).max(self.separation_count)
    }
}

// Squared radii, weights and limits for one tick, derived once from params
#[derive(Clone, Copy, Debug)]
pub struct FlockRules {
    pub separation_radius_sq: f32,
    pub alignment_radius_sq: f32,
    pub cohesion_radius_sq: f32,
    pub view_radius_sq: f32,
    pub half_view_angle: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub max_speed: f32,
    pub max_force: f32,
}

impl FlockRules {
    pub fn from_params(params: &SimulationParams) -> Self {
        let alignment_radius_sq = params.alignment_radius * params.alignment_radius;
        let cohesion_radius_sq = params.cohesion_radius * params.cohesion_radius;
        Self {
            separation_radius_sq: params.separation_radius * params.separation_radius,
            alignment_radius_sq,
            cohesion_radius_sq,
            view_radius_sq: alignment_radius_sq.max(cohesion_radius_sq),
            half_view_angle: params.view_angle_degrees.to_radians() * 0.5,
            separation_weight: params.separation_weight,
            alignment_weight: params.alignment_weight,
            cohesion_weight: params.cohesion_weight,
            max_speed: params.speed_max.max(params.speed_min),
            max_force: params.max_steer_force,
        }
    }

    /// Whether `offset` (at `distance`) lies inside the forward view cone of
    /// a boid moving with `velocity` at `speed`. A stationary boid sees all
    /// around.
    #[inline]
    pub fn sees(&self, velocity: Vec2, offset: Vec2, speed: f32, distance: f32) -> bool {
        if self.half_view_angle >= std::f32::consts::PI - 1e-4 || speed < EPSILON {
            return true;
        }
        angle_between(velocity, offset, speed, distance) <= self.half_view_angle
    }
}

// Reynolds steering: desired velocity at max speed minus current velocity
#[inline]
fn steer(direction: Vec2, velocity: Vec2, rules: &FlockRules) -> Vec2 {
    let len_sq = direction.length_squared();
    if len_sq < EPSILON * EPSILON {
        return Vec2::ZERO;
    }
    let desired = direction * (rules.max_speed / len_sq.sqrt());
    clamped_direction(desired - velocity, rules.max_force)
}

/// Weighted sum of the three rule forces for a boid with `velocity`.
///
/// Each rule with at least one contributing neighbor is averaged, scaled
/// to max speed, turned into a clamped steering delta and weighted.
pub fn steering_from_sums(sums: &FlockSums, velocity: Vec2, rules: &FlockRules) -> Vec2 {
    let mut force = Vec2::ZERO;

    if sums.cohesion_count > 0 {
        let center = sums.cohesion / sums.cohesion_count as f32;
        force += steer(center, velocity, rules) * rules.cohesion_weight;
    }
    if sums.alignment_count > 0 {
        let heading = sums.alignment / sums.alignment_count as f32;
        force += steer(heading, velocity, rules) * rules.alignment_weight;
    }
    if sums.separation_count > 0 {
        let away = sums.separation / sums.separation_count as f32;
        force += steer(away, velocity, rules) * rules.separation_weight;
    }

    force
}

// Mouse influence for one tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    None,
    Attract(Vec2),
    Repel(Vec2),
    Predator(Vec2),
}

/// Velocity change caused by the mouse.
///
/// Steering falls off with `1 / sqrt(distance)`; the idle cursor acts as a
/// predator that pushes boids out of a fixed radius at constant strength.
pub fn interaction_nudge(position: Vec2, interaction: Interaction, params: &SimulationParams) -> Vec2 {
    let (target, sign) = match interaction {
        Interaction::None => return Vec2::ZERO,
        Interaction::Attract(target) => (target, 1.0),
        Interaction::Repel(target) => (target, -1.0),
        Interaction::Predator(predator) => {
            let away = position - predator;
            let distance = away.length();
            if distance < EPSILON || distance >= params.predator_radius {
                return Vec2::ZERO;
            }
            return away * (params.predator_strength / distance);
        }
    };

    let toward = target - position;
    let distance = toward.length();
    if distance < EPSILON {
        return Vec2::ZERO;
    }
    toward * (sign * params.mouse_steer_strength / (distance * distance.sqrt()))
}

// Outward push from every impulse band the boid is inside
pub fn impulse_nudge(position: Vec2, impulses: &[Impulse], params: &SimulationParams) -> Vec2 {
    impulses.iter().fold(Vec2::ZERO, |acc, impulse| {
        let weight = impulse.band_weight(position, params.impulse_band_width, params.impulse_fade_distance);
        acc + impulse.outward(position) * (params.impulse_strength * weight)
    })
}

/// Wrapped position for a boid whose bounding box has fully left `domain`,
/// or `None` if it is still (partly) inside. The shift is exactly one domain
/// extent per axis.
pub fn teleport(position: Vec2, domain: Rect, size: f32) -> Option<Vec2> {
    let mut shift = Vec2::ZERO;

    if position.x - size > domain.right() {
        shift.x = -domain.w();
    } else if position.x + size < domain.left() {
        shift.x = domain.w();
    }
    if position.y - size > domain.top() {
        shift.y = -domain.h();
    } else if position.y + size < domain.bottom() {
        shift.y = domain.h();
    }

    if shift == Vec2::ZERO {
        None
    } else {
        Some(position + shift)
    }
}

/// Inward velocity nudge for a boid past the turn margin.
///
/// Grows with the square of the overshoot and is divided by
/// `density + 1`, so crowded boids turn gently.
pub fn turn_nudge(position: Vec2, domain: Rect, margin: f32, factor: f32, density: u32) -> Vec2 {
    let mut nudge = Vec2::ZERO;

    let left = domain.left() + margin;
    let right = domain.right() - margin;
    let bottom = domain.bottom() + margin;
    let top = domain.top() - margin;

    if position.x < left {
        let d = left - position.x;
        nudge.x += factor * d * d;
    } else if position.x > right {
        let d = position.x - right;
        nudge.x -= factor * d * d;
    }
    if position.y < bottom {
        let d = bottom - position.y;
        nudge.y += factor * d * d;
    } else if position.y > top {
        let d = position.y - top;
        nudge.y -= factor * d * d;
    }

    nudge / (density as f32 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> FlockRules {
        FlockRules::from_params(&SimulationParams {
            speed_min: 1.0,
            speed_max: 2.0,
            max_steer_force: 0.5,
            view_angle_degrees: 360.0,
            ..Default::default()
        })
    }

    #[test]
    fn empty_sums_produce_no_force() {
        assert_eq!(steering_from_sums(&FlockSums::default(), vec2(1.0, 0.0), &rules()), Vec2::ZERO);
    }

    #[test]
    fn balanced_neighbors_produce_no_force() {
        // Two neighbors mirrored around the boid, moving exactly like it
        let sums = FlockSums {
            cohesion: vec2(3.0, 0.0) + vec2(-3.0, 0.0),
            alignment: vec2(2.0, 0.0) * 2.0,
            separation: -vec2(3.0, 0.0) / 9.0 - vec2(-3.0, 0.0) / 9.0,
            cohesion_count: 2,
            alignment_count: 2,
            separation_count: 2,
        };
        let force = steering_from_sums(&sums, vec2(2.0, 0.0), &rules());
        assert!(force.length() < 1e-6, "spurious force {force:?}");
    }

    #[test]
    fn steering_is_limited_by_max_force() {
        let sums = FlockSums { alignment: vec2(0.0, 5.0), alignment_count: 1, ..Default::default() };
        let r = rules();
        let force = steering_from_sums(&sums, vec2(2.0, 0.0), &r);
        assert!((force.length() - r.max_force * r.alignment_weight).abs() < 1e-5);
    }

    #[test]
    fn view_cone_excludes_neighbors_behind() {
        let narrow = FlockRules { half_view_angle: 60f32.to_radians(), ..rules() };
        assert!(narrow.sees(vec2(1.0, 0.0), vec2(5.0, 1.0), 1.0, vec2(5.0, 1.0).length()));
        assert!(!narrow.sees(vec2(1.0, 0.0), vec2(-5.0, 0.0), 1.0, 5.0));
        assert!(rules().sees(vec2(1.0, 0.0), vec2(-5.0, 0.0), 1.0, 5.0));
    }

    #[test]
    fn attraction_falls_off_with_sqrt_distance() {
        let params = SimulationParams { mouse_steer_strength: 10.0, ..Default::default() };
        let near = interaction_nudge(Vec2::ZERO, Interaction::Attract(vec2(4.0, 0.0)), &params);
        let far = interaction_nudge(Vec2::ZERO, Interaction::Attract(vec2(16.0, 0.0)), &params);
        assert!((near.x - 5.0).abs() < 1e-5);
        assert!((far.x - 2.5).abs() < 1e-5);
        let away = interaction_nudge(Vec2::ZERO, Interaction::Repel(vec2(4.0, 0.0)), &params);
        assert!((away.x + 5.0).abs() < 1e-5);
    }

    #[test]
    fn predator_repels_only_inside_radius() {
        let params = SimulationParams { predator_radius: 10.0, predator_strength: 3.0, ..Default::default() };
        let inside = interaction_nudge(vec2(5.0, 0.0), Interaction::Predator(Vec2::ZERO), &params);
        assert!((inside - vec2(3.0, 0.0)).length() < 1e-5);
        let outside = interaction_nudge(vec2(50.0, 0.0), Interaction::Predator(Vec2::ZERO), &params);
        assert_eq!(outside, Vec2::ZERO);
    }

    #[test]
    fn teleport_waits_for_the_whole_body() {
        let domain = Rect::from_corners(pt2(-100.0, -50.0), pt2(100.0, 50.0));
        assert_eq!(teleport(vec2(103.0, 0.0), domain, 4.0), None);
        let wrapped = teleport(vec2(105.0, 0.0), domain, 4.0).unwrap();
        assert_eq!(wrapped, vec2(-95.0, 0.0));
        let wrapped = teleport(vec2(0.0, -55.0), domain, 4.0).unwrap();
        assert_eq!(wrapped, vec2(0.0, 45.0));
    }

    #[test]
    fn turn_nudge_is_quadratic_and_density_damped() {
        let domain = Rect::from_corners(pt2(0.0, 0.0), pt2(100.0, 100.0));
        assert_eq!(turn_nudge(vec2(50.0, 50.0), domain, 10.0, 0.5, 0), Vec2::ZERO);
        let one = turn_nudge(vec2(8.0, 50.0), domain, 10.0, 0.5, 0);
        let two = turn_nudge(vec2(6.0, 50.0), domain, 10.0, 0.5, 0);
        assert!((one.x - 2.0).abs() < 1e-5);
        assert!((two.x - 8.0).abs() < 1e-5);
        let crowded = turn_nudge(vec2(6.0, 50.0), domain, 10.0, 0.5, 3);
        assert!((crowded.x - 2.0).abs() < 1e-5);
        let top = turn_nudge(vec2(50.0, 95.0), domain, 10.0, 0.5, 0);
        assert!(top.y < 0.0);
    }
}

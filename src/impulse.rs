/*
 * Impulse Module
 *
 * An impulse is an expanding ring spawned at a point. Boids caught in the
 * ring's band are pushed outward and tinted; the ring dies once its radius
 * passes the fade distance.
 */

use nannou::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impulse {
    pub origin: Vec2,
    pub radius: f32,
    pub growth_rate: f32,
}

impl Impulse {
    pub fn new(origin: Vec2, growth_rate: f32) -> Self {
        Self { origin, radius: 0.0, growth_rate }
    }

    pub fn advance(&mut self, dt: f32) {
        self.radius += self.growth_rate * dt;
    }

    pub fn is_alive(&self, fade_distance: f32) -> bool {
        self.radius <= fade_distance
    }

    // 1 at birth, 0 at the fade distance
    pub fn fade(&self, fade_distance: f32) -> f32 {
        if fade_distance <= 0.0 {
            return 0.0;
        }
        (1.0 - self.radius / fade_distance).clamp(0.0, 1.0)
    }

    /// Strength in `[0, 1]` of the ring at `position`: peaks on the ring,
    /// falls off linearly across `band_width` on either side and dims as the
    /// ring fades. Zero outside the band.
    pub fn band_weight(&self, position: Vec2, band_width: f32, fade_distance: f32) -> f32 {
        if band_width <= 0.0 {
            return 0.0;
        }
        let off_ring = (position.distance(self.origin) - self.radius).abs();
        if off_ring >= band_width {
            return 0.0;
        }
        (1.0 - off_ring / band_width) * self.fade(fade_distance)
    }

    pub fn outward(&self, position: Vec2) -> Vec2 {
        (position - self.origin).normalize_or_zero()
    }
}

// Grow every ring and drop the ones that have faded out
pub fn advance_impulses(impulses: &mut Vec<Impulse>, dt: f32, fade_distance: f32) {
    for impulse in impulses.iter_mut() {
        impulse.advance(dt);
    }
    impulses.retain(|impulse| impulse.is_alive(fade_distance));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_grow_and_expire() {
        let mut impulses = vec![Impulse::new(Vec2::ZERO, 100.0), Impulse::new(vec2(5.0, 5.0), 10.0)];
        advance_impulses(&mut impulses, 0.5, 40.0);
        assert_eq!(impulses.len(), 1);
        assert_eq!(impulses[0].radius, 5.0);
    }

    #[test]
    fn band_weight_peaks_on_the_ring() {
        let ring = Impulse { origin: Vec2::ZERO, radius: 20.0, growth_rate: 1.0 };
        let on = ring.band_weight(vec2(0.0, 20.0), 4.0, 40.0);
        let near = ring.band_weight(vec2(0.0, 22.0), 4.0, 40.0);
        let off = ring.band_weight(vec2(0.0, 30.0), 4.0, 40.0);
        assert!((on - 0.5).abs() < 1e-6);
        assert!(near > 0.0 && near < on);
        assert_eq!(off, 0.0);
    }

    #[test]
    fn outward_points_away_from_origin() {
        let ring = Impulse::new(vec2(1.0, 1.0), 1.0);
        assert_eq!(ring.outward(vec2(3.0, 1.0)), vec2(1.0, 0.0));
        assert_eq!(ring.outward(vec2(1.0, 1.0)), Vec2::ZERO);
    }
}

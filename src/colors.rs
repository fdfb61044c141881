/*
 * Colors Module
 *
 * Boid colors are a weighted blend of up to seven independent effects,
 * each switched on by a bit in ColorFlags. An impulse ring passing over a
 * boid replaces the blend entirely while the boid sits inside its band.
 */

use std::ops::BitOr;

use nannou::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::{lerp_vec3, EPSILON};
use crate::impulse::Impulse;
use crate::params::SimulationParams;

// Bitmask of enabled color effects, stored as a plain integer in the config
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorFlags(pub u32);

impl ColorFlags {
    pub const NONE: Self = Self(0);
    pub const POSITION: Self = Self(1);
    pub const CYCLE: Self = Self(1 << 1);
    pub const DENSITY: Self = Self(1 << 2);
    pub const SPEED: Self = Self(1 << 3);
    pub const HEADING: Self = Self(1 << 4);
    pub const AUDIO: Self = Self(1 << 5);
    pub const FLUID: Self = Self(1 << 6);

    // Every effect with its UI label
    pub const ALL: [(Self, &'static str); 7] = [
        (Self::POSITION, "Position gradient"),
        (Self::CYCLE, "Time cycle"),
        (Self::DENSITY, "Density cycle"),
        (Self::SPEED, "Speed"),
        (Self::HEADING, "Heading"),
        (Self::AUDIO, "Audio"),
        (Self::FLUID, "Fluid"),
    ];

    #[inline]
    pub fn contains(self, flag: Self) -> bool {
        flag.0 != 0 && self.0 & flag.0 == flag.0
    }

    pub fn set(&mut self, flag: Self, enabled: bool) {
        if enabled {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }
}

impl BitOr for ColorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Source of the current audio volume.
///
/// A missing or failed device is not an error; it simply reports silence.
pub trait AudioLevel {
    fn volume(&self) -> f32;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Silence;

impl AudioLevel for Silence {
    fn volume(&self) -> f32 {
        0.0
    }
}

// A fixed level, used when the volume is sampled elsewhere
impl AudioLevel for f32 {
    fn volume(&self) -> f32 {
        *self
    }
}

/// A color gradient through evenly spaced stops.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    stops: Vec<Vec3>,
}

impl Palette {
    // An empty stop list degrades to a single flat color
    pub fn new(stops: &[[f32; 3]], fallback: [f32; 3]) -> Self {
        let mut stops: Vec<Vec3> = stops.iter().map(|&c| Vec3::from(c)).collect();
        if stops.is_empty() {
            stops.push(Vec3::from(fallback));
        }
        Self { stops }
    }

    pub fn from_params(params: &SimulationParams) -> Self {
        Self::new(&params.palette, params.base_color)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    // Sample with t clamped to [0, 1]; first stop at 0, last stop at 1
    pub fn sample(&self, t: f32) -> Vec3 {
        let last = self.stops.len() - 1;
        if last == 0 {
            return self.stops[0];
        }
        let scaled = t.clamp(0.0, 1.0) * last as f32;
        let index = (scaled.floor() as usize).min(last - 1);
        lerp_vec3(self.stops[index], self.stops[index + 1], scaled - index as f32)
    }

    // Sample a looping gradient: t and t + 1 give the same color, no seam
    pub fn sample_cyclic(&self, t: f32) -> Vec3 {
        let n = self.stops.len();
        if n == 1 {
            return self.stops[0];
        }
        let scaled = t.rem_euclid(1.0) * n as f32;
        let index = (scaled.floor() as usize).min(n - 1);
        lerp_vec3(self.stops[index], self.stops[(index + 1) % n], scaled - index as f32)
    }
}

/// Per-boid inputs to the color blend, each already normalized.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColorSample {
    pub position_t: f32,
    pub cycle_time: f32,
    pub density_time: f32,
    pub speed_t: f32,
    pub heading_t: f32,
    pub volume: f32,
    pub fluid: Vec3,
}

// Weighted sum of the enabled effects, clamped per channel
pub fn blend_color(sample: &ColorSample, params: &SimulationParams, palette: &Palette) -> Vec3 {
    let flags = params.color_flags;
    let mut color = Vec3::ZERO;
    let mut total_weight = 0.0;

    let mut add = |flag: ColorFlags, weight: f32, contribution: Vec3| {
        if flags.contains(flag) {
            color += contribution * weight;
            total_weight += weight;
        }
    };

    add(ColorFlags::POSITION, params.position_weight, palette.sample(sample.position_t));
    add(ColorFlags::CYCLE, params.cycle_weight, palette.sample_cyclic(sample.cycle_time));
    add(ColorFlags::DENSITY, params.density_weight, palette.sample_cyclic(sample.density_time));
    add(ColorFlags::SPEED, params.speed_weight, palette.sample(sample.speed_t));
    add(ColorFlags::HEADING, params.heading_weight, palette.sample_cyclic(sample.heading_t));
    let level = (sample.volume * params.audio_gain).clamp(0.0, 1.0);
    add(ColorFlags::AUDIO, params.audio_weight, palette.sample(level) * level);
    add(ColorFlags::FLUID, params.fluid_weight, sample.fluid);

    if total_weight <= EPSILON {
        return Vec3::from(params.base_color);
    }
    color.max(Vec3::ZERO).min(Vec3::ONE)
}

/// `blended` pulled toward the impulse color by the strongest band covering
/// `position`, or `None` outside every band. At full band strength the
/// impulse color replaces the blend; at the band's edge the blend survives.
pub fn impulse_override(
    position: Vec2,
    blended: Vec3,
    impulses: &[Impulse],
    params: &SimulationParams,
) -> Option<Vec3> {
    let weight = impulses
        .iter()
        .map(|impulse| impulse.band_weight(position, params.impulse_band_width, params.impulse_fade_distance))
        .fold(0.0f32, f32::max);
    if weight > 0.0 {
        let target = Vec3::from(params.impulse_color).min(Vec3::ONE);
        Some(blended.lerp(target, weight.min(1.0)))
    } else {
        None
    }
}

// Pack a [0, 1] color into 0xRRGGBB
pub fn pack_rgb(color: Vec3) -> u32 {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(color.x) << 16) | (channel(color.y) << 8) | channel(color.z)
}

pub fn unpack_rgb(packed: u32) -> [u8; 3] {
    [(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stop() -> Palette {
        Palette::new(&[[0.0, 0.0, 0.0], [1.0, 0.5, 0.0]], [1.0; 3])
    }

    #[test]
    fn flags_combine_and_toggle() {
        let mut flags = ColorFlags::POSITION | ColorFlags::FLUID;
        assert!(flags.contains(ColorFlags::FLUID));
        assert!(!flags.contains(ColorFlags::SPEED));
        assert!(!flags.contains(ColorFlags::NONE));
        flags.set(ColorFlags::FLUID, false);
        flags.set(ColorFlags::SPEED, true);
        assert_eq!(flags, ColorFlags::POSITION | ColorFlags::SPEED);
    }

    #[test]
    fn palette_sampling_interpolates_and_clamps() {
        let palette = two_stop();
        assert_eq!(palette.sample(-1.0), Vec3::ZERO);
        assert_eq!(palette.sample(2.0), vec3(1.0, 0.5, 0.0));
        assert!((palette.sample(0.5) - vec3(0.5, 0.25, 0.0)).length() < 1e-6);
    }

    #[test]
    fn cyclic_palette_has_no_seam() {
        let palette = two_stop();
        let a = palette.sample_cyclic(0.999_9);
        let b = palette.sample_cyclic(0.0);
        assert!((a - b).length() < 1e-2);
        assert_eq!(palette.sample_cyclic(1.25), palette.sample_cyclic(0.25));
    }

    #[test]
    fn empty_palette_falls_back() {
        let palette = Palette::new(&[], [0.2, 0.4, 0.6]);
        assert_eq!(palette.len(), 1);
        assert_eq!(palette.sample(0.7), vec3(0.2, 0.4, 0.6));
    }

    #[test]
    fn no_enabled_effect_gives_base_color() {
        let params = SimulationParams {
            color_flags: ColorFlags::NONE,
            base_color: [0.3, 0.3, 0.3],
            ..Default::default()
        };
        let color = blend_color(&ColorSample::default(), &params, &two_stop());
        assert_eq!(color, vec3(0.3, 0.3, 0.3));
    }

    #[test]
    fn blend_is_clamped_per_channel() {
        let params = SimulationParams {
            color_flags: ColorFlags::FLUID | ColorFlags::POSITION,
            fluid_weight: 3.0,
            position_weight: 1.0,
            ..Default::default()
        };
        let sample = ColorSample { position_t: 1.0, fluid: vec3(1.0, 0.0, 0.5), ..Default::default() };
        let color = blend_color(&sample, &params, &two_stop());
        assert_eq!(color, vec3(1.0, 0.5, 1.0));
    }

    #[test]
    fn silent_audio_contributes_nothing() {
        let params = SimulationParams { color_flags: ColorFlags::AUDIO, ..Default::default() };
        let quiet = ColorSample { volume: Silence.volume(), ..Default::default() };
        assert_eq!(blend_color(&quiet, &params, &two_stop()), Vec3::ZERO);
        let loud = ColorSample { volume: 1.0, ..Default::default() };
        assert!(blend_color(&loud, &params, &two_stop()).x > 0.0);
    }

    #[test]
    fn impulse_band_overrides_color() {
        let params = SimulationParams {
            impulse_band_width: 10.0,
            impulse_fade_distance: 100.0,
            impulse_color: [1.0, 1.0, 1.0],
            ..Default::default()
        };
        let ring = Impulse { origin: Vec2::ZERO, radius: 50.0, growth_rate: 10.0 };
        let blended = vec3(0.2, 0.4, 0.6);
        assert!(impulse_override(vec2(50.0, 0.0), blended, &[ring], &params).is_some());
        assert!(impulse_override(vec2(10.0, 0.0), blended, &[ring], &params).is_none());
        assert!(impulse_override(vec2(50.0, 0.0), blended, &[], &params).is_none());
    }

    #[test]
    fn band_edge_fades_back_to_the_blend() {
        let params = SimulationParams {
            impulse_band_width: 10.0,
            impulse_fade_distance: 1000.0,
            impulse_color: [1.0, 0.0, 0.0],
            ..Default::default()
        };
        // Young ring: fade is 1 - 10 / 1000
        let ring = Impulse { origin: Vec2::ZERO, radius: 10.0, growth_rate: 10.0 };
        let blended = vec3(0.2, 0.4, 0.6);

        let on_ring = impulse_override(vec2(10.0, 0.0), blended, &[ring], &params).unwrap();
        assert!(on_ring.x > 0.98 && on_ring.y < 0.01, "{on_ring:?}");

        // Near the band edge the boid keeps most of its own color instead of going dark
        let edge = impulse_override(vec2(19.5, 0.0), blended, &[ring], &params).unwrap();
        assert!((edge - blended).length() < 0.06, "{edge:?}");
        assert!(edge.length() > blended.length() * 0.9);
    }

    #[test]
    fn packing_round_trips_channels() {
        let packed = pack_rgb(vec3(1.0, 0.0, 0.5));
        assert_eq!(packed, 0xFF0080);
        assert_eq!(unpack_rgb(packed), [255, 0, 128]);
    }
}

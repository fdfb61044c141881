/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that holds every tunable
 * of the simulation. A params value is a snapshot: it is loaded from a JSON
 * document (or edited through the UI as a working copy) and handed to the
 * core by reference each tick. Change detection is an explicit diff between
 * two snapshots, producing RebuildFlags for the driver to act on.
 */

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::colors::ColorFlags;
use crate::error::ConfigError;

// What happens when a boid reaches the edge of the domain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderPolicy {
    Teleport,
    Turn,
}

/// Tunables for the flock, the fluid field and the driver loop.
///
/// Every field has a default, so a config document only needs to list the
/// values it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    // Population and motion
    pub num_boids: usize,
    pub boid_size: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub max_steer_force: f32,
    pub view_angle_degrees: f32,

    // Flocking rules
    pub separation_radius: f32,
    pub alignment_radius: f32,
    pub cohesion_radius: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,

    // Borders
    pub border: BorderPolicy,
    pub turn_margin: f32,
    pub turn_factor: f32,

    // Coloring
    pub color_flags: ColorFlags,
    pub position_weight: f32,
    pub cycle_weight: f32,
    pub density_weight: f32,
    pub speed_weight: f32,
    pub heading_weight: f32,
    pub audio_weight: f32,
    pub fluid_weight: f32,
    pub palette: Vec<[f32; 3]>,
    pub base_color: [f32; 3],
    pub cycle_speed: f32,
    pub density_cycle_speed: f32,
    pub audio_gain: f32,

    // Impulse rings
    pub impulse_growth_rate: f32,
    pub impulse_fade_distance: f32,
    pub impulse_band_width: f32,
    pub impulse_strength: f32,
    pub impulse_color: [f32; 3],

    // Mouse interaction
    pub mouse_steer_strength: f32,
    pub predator_radius: f32,
    pub predator_strength: f32,

    // Fluid field
    pub fluid_scale: usize,
    pub fluid_diffusion: f32,
    pub fluid_viscosity: f32,
    pub fluid_fade: f32,
    pub fluid_iterations: usize,
    pub fluid_mouse_strength: f32,
    pub fluid_mouse_density: f32,
    pub fluid_color_gain: f32,

    // Grid and scheduling
    pub grid_margin_cells: usize,
    pub cell_size_factor: f32, // Multiplier for cell size relative to the largest radius
    pub parallel_threshold: usize,

    // Driver loop
    pub fixed_physics_fps: f32,
    pub max_steps_per_frame: u32,
    pub enable_interpolation: bool,
    pub seed: Option<u64>,
    pub show_debug: bool,
    pub pause_simulation: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            num_boids: 3000,
            boid_size: 4.0,
            speed_min: 60.0,
            speed_max: 140.0,
            max_steer_force: 6.0,
            view_angle_degrees: 270.0,

            separation_radius: 12.0,
            alignment_radius: 30.0,
            cohesion_radius: 30.0,
            separation_weight: 1.6,
            alignment_weight: 1.0,
            cohesion_weight: 0.8,

            border: BorderPolicy::Turn,
            turn_margin: 60.0,
            turn_factor: 0.005,

            color_flags: ColorFlags::POSITION | ColorFlags::CYCLE | ColorFlags::FLUID,
            position_weight: 0.5,
            cycle_weight: 0.3,
            density_weight: 0.3,
            speed_weight: 0.3,
            heading_weight: 0.3,
            audio_weight: 0.5,
            fluid_weight: 0.6,
            palette: vec![[0.10, 0.35, 0.85], [0.45, 0.15, 0.75], [0.95, 0.40, 0.30], [0.98, 0.85, 0.35]],
            base_color: [0.85, 0.85, 0.90],
            cycle_speed: 0.1,
            density_cycle_speed: 0.02,
            audio_gain: 4.0,

            impulse_growth_rate: 300.0,
            impulse_fade_distance: 400.0,
            impulse_band_width: 25.0,
            impulse_strength: 8.0,
            impulse_color: [1.0, 1.0, 1.0],

            mouse_steer_strength: 40.0,
            predator_radius: 80.0,
            predator_strength: 6.0,

            fluid_scale: 8,
            fluid_diffusion: 0.2,
            fluid_viscosity: 0.5,
            fluid_fade: 0.002,
            fluid_iterations: 2,
            fluid_mouse_strength: 30.0,
            fluid_mouse_density: 1.0,
            fluid_color_gain: 0.02,

            grid_margin_cells: 2,
            cell_size_factor: 2.0,
            parallel_threshold: 1500,

            fixed_physics_fps: 60.0,
            max_steps_per_frame: 5,
            enable_interpolation: true,
            seed: None,
            show_debug: false,
            pause_simulation: false,
        }
    }
}

/// Which parts of a running simulation must be rebuilt after a params change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildFlags {
    pub grid: bool,
    pub population: bool,
    pub palette: bool,
    pub fluid: bool,
    pub schedule: bool,
    pub timestep: bool,
}

impl RebuildFlags {
    pub fn any(&self) -> bool {
        self.grid || self.population || self.palette || self.fluid || self.schedule || self.timestep
    }
}

impl SimulationParams {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    // Read and parse a config document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params = Self::from_json_str(&text)?;
        info!(path = %path.display(), boids = params.num_boids, "loaded simulation config");
        Ok(params)
    }

    /// Out-of-range values are not rejected: the core degrades instead of
    /// failing. This lists what a caller should warn about.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.speed_min > self.speed_max {
            warnings.push(format!(
                "speed_min ({}) exceeds speed_max ({}); boids will move at speed_min",
                self.speed_min, self.speed_max
            ));
        }
        if self.speed_min < 0.0 {
            warnings.push("speed_min is negative".to_string());
        }
        for (name, radius) in [
            ("separation_radius", self.separation_radius),
            ("alignment_radius", self.alignment_radius),
            ("cohesion_radius", self.cohesion_radius),
        ] {
            if radius <= 0.0 {
                warnings.push(format!("{name} must be positive, got {radius}"));
            }
        }
        if self.cell_size_factor < 2.0 {
            warnings.push(format!(
                "cell_size_factor {} is below 2.0; the 2x2 neighbor scan will miss some neighbors",
                self.cell_size_factor
            ));
        }
        if !(self.view_angle_degrees > 0.0 && self.view_angle_degrees <= 360.0) {
            warnings.push(format!("view_angle_degrees {} is outside (0, 360]", self.view_angle_degrees));
        }
        if self.fluid_scale == 0 {
            warnings.push("fluid_scale must be at least 1".to_string());
        }
        if self.fixed_physics_fps <= 0.0 {
            warnings.push("fixed_physics_fps must be positive".to_string());
        }
        if self.max_steps_per_frame == 0 {
            warnings.push("max_steps_per_frame is 0; the simulation will never advance".to_string());
        }
        if self.palette.is_empty() {
            warnings.push("palette is empty; base_color will be used for every gradient".to_string());
        }

        warnings
    }

    pub fn max_interaction_radius(&self) -> f32 {
        self.separation_radius.max(self.alignment_radius).max(self.cohesion_radius)
    }

    // Cell size requested from the spatial grid
    pub fn grid_cell_size(&self) -> f32 {
        (self.max_interaction_radius() * self.cell_size_factor).max(1.0)
    }

    pub fn fixed_step_secs(&self) -> f32 {
        1.0 / self.fixed_physics_fps.max(1.0)
    }

    /// Compare two snapshots and report what the driver must rebuild.
    pub fn diff(old: &Self, new: &Self) -> RebuildFlags {
        RebuildFlags {
            grid: old.separation_radius != new.separation_radius
                || old.alignment_radius != new.alignment_radius
                || old.cohesion_radius != new.cohesion_radius
                || old.cell_size_factor != new.cell_size_factor
                || old.grid_margin_cells != new.grid_margin_cells,
            population: old.num_boids != new.num_boids,
            palette: old.palette != new.palette || old.base_color != new.base_color,
            fluid: old.fluid_scale != new.fluid_scale,
            schedule: old.parallel_threshold != new.parallel_threshold
                || old.num_boids != new.num_boids,
            timestep: old.fixed_physics_fps != new.fixed_physics_fps
                || old.max_steps_per_frame != new.max_steps_per_frame,
        }
    }

    // Get parameter ranges for UI sliders
    pub fn get_num_boids_range() -> RangeInclusive<usize> {
        10..=50000
    }

    pub fn get_speed_range() -> RangeInclusive<f32> {
        1.0..=400.0
    }

    pub fn get_weight_range() -> RangeInclusive<f32> {
        0.0..=3.0
    }

    pub fn get_radius_range() -> RangeInclusive<f32> {
        2.0..=100.0
    }

    pub fn get_cell_size_factor_range() -> RangeInclusive<f32> {
        1.0..=6.0
    }
}

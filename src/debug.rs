/*
 * Debug Information Module
 *
 * This module defines the DebugInfo struct that contains performance metrics
 * and simulation state to be displayed in the UI.
 *
 * Includes metrics for:
 * - FPS and frame time
 * - Physics ticks run this frame and the interpolation factor
 * - Population, execution schedule and parallel chunk size
 * - Fluid mass and live impulse rings
 */

use std::time::Duration;

use crate::simulation::Simulation;

// Debug information to display
#[derive(Clone, Debug)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub physics_updates_per_frame: u32,
    pub interpolation_alpha: f32,
    pub boid_count: usize,
    pub schedule: &'static str,
    pub chunk_size: usize,
    pub fluid_density: f32,
    pub impulses: usize,
    pub ticks: u64,
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time: Duration::ZERO,
            physics_updates_per_frame: 0,
            interpolation_alpha: 0.0,
            boid_count: 0,
            schedule: "sequential",
            chunk_size: 0,
            fluid_density: 0.0,
            impulses: 0,
            ticks: 0,
        }
    }
}

impl DebugInfo {
    // Copy the simulation counters; summing the fluid is skipped unless shown
    pub fn refresh(&mut self, sim: &Simulation, include_fluid: bool) {
        let boids = sim.boids().len();
        self.boid_count = boids;
        self.schedule = sim.schedule().label();
        self.chunk_size = sim.schedule().chunk_size(boids);
        self.impulses = sim.impulses().len();
        self.ticks = sim.ticks();
        if include_fluid {
            self.fluid_density = sim.fluid().total_density();
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("FPS: {:.1}", self.fps),
            format!("Frame time: {:.2} ms", self.frame_time.as_secs_f64() * 1000.0),
            format!("Ticks this frame: {}", self.physics_updates_per_frame),
            format!("Interpolation: {:.2}", self.interpolation_alpha),
            format!("Boids: {}", self.boid_count),
            format!("Schedule: {} ({} per task)", self.schedule, self.chunk_size),
            format!("Fluid mass: {:.1}", self.fluid_density),
            format!("Impulses: {}", self.impulses),
        ]
    }
}

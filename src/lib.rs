/*
 * Murmuration - Module Definitions
 *
 * This file defines the module structure for the flocking simulation.
 * The core (grid, boid pipeline, fluid solver and their helpers) has no
 * window dependency beyond nannou's math types; app, input, renderer, ui
 * and debug are the nannou-facing driver.
 */

// Re-export key components for easier access
pub use boid::BoidStore;
pub use colors::{AudioLevel, ColorFlags, Palette, Silence};
pub use error::ConfigError;
pub use fluid::FluidField;
pub use impulse::Impulse;
pub use input::InputState;
pub use params::{BorderPolicy, RebuildFlags, SimulationParams};
pub use renderer::BoidVertex;
pub use schedule::Schedule;
pub use simulation::Simulation;
pub use spatial_grid::SpatialGrid;
pub use timestep::FixedTimestep;

// Define modules
pub mod app;
pub mod boid;
pub mod colors;
pub mod debug;
pub mod error;
pub mod fluid;
pub mod geometry;
pub mod impulse;
pub mod input;
pub mod params;
pub mod physics;
pub mod renderer;
pub mod schedule;
pub mod simulation;
pub mod spatial_grid;
pub mod timestep;
pub mod ui;

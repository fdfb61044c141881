/*
 * Simulation Module
 *
 * The Simulation owns everything that advances with the fixed tick: the
 * flock, the fluid field, live impulse rings and the params snapshot they
 * all read. The driver feeds it elapsed fixed steps, per-frame input and
 * changed params; it hands back vertices for drawing.
 *
 * Population changes and other edge-triggered input are applied between
 * ticks, never inside one. The border policy is fixed for a run: a changed
 * policy waits in the params snapshot until the next reset.
 */

use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::boid::{BoidStore, ColorContext};
use crate::colors::{AudioLevel, Palette};
use crate::fluid::{FluidField, FluidSettings};
use crate::geometry::is_degenerate;
use crate::impulse::{advance_impulses, Impulse};
use crate::input::InputState;
use crate::params::{BorderPolicy, RebuildFlags, SimulationParams};
use crate::physics::FlockRules;
use crate::renderer::{emit_vertices, BoidVertex};
use crate::schedule::Schedule;

// Boids added or removed per key press
pub const BOIDS_PER_KEY: usize = 100;

pub struct Simulation {
    params: SimulationParams,
    // Policy of the current run
    border: BorderPolicy,
    domain: Rect,
    boids: BoidStore,
    fluid: FluidField,
    impulses: Vec<Impulse>,
    palette: Palette,
    schedule: Schedule,
    rng: StdRng,
    ticks: u64,
}

impl Simulation {
    /// Build a simulation over `domain`, which must have a non-zero area.
    ///
    /// With `params.seed` set, the initial flock and every later random
    /// choice are reproducible.
    pub fn new(params: SimulationParams, domain: Rect) -> Self {
        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let boids = BoidStore::new(domain, &params, &mut rng);
        let fluid = FluidField::new(domain, params.fluid_scale);
        let schedule = Schedule::for_population(boids.len(), params.parallel_threshold);
        let palette = Palette::from_params(&params);

        info!(
            boids = boids.len(),
            width = domain.w(),
            height = domain.h(),
            fluid_w = fluid.width(),
            fluid_h = fluid.height(),
            schedule = schedule.label(),
            "simulation initialized"
        );

        Self {
            border: params.border,
            params,
            domain,
            boids,
            fluid,
            impulses: Vec::new(),
            palette,
            schedule,
            rng,
            ticks: 0,
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn border(&self) -> BorderPolicy {
        self.border
    }

    pub fn domain(&self) -> Rect {
        self.domain
    }

    pub fn boids(&self) -> &BoidStore {
        &self.boids
    }

    pub fn fluid(&self) -> &FluidField {
        &self.fluid
    }

    pub fn impulses(&self) -> &[Impulse] {
        &self.impulses
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance one fixed step of `dt` seconds.
    pub fn tick(&mut self, dt: f32, input: &InputState, audio: &impl AudioLevel) {
        let rules = FlockRules::from_params(&self.params);
        let Self { params, border, domain, boids, fluid, impulses, palette, schedule, ticks, .. } = self;

        boids.pre_update();
        boids.sort_by_cell();
        boids.rebuild_ranges();

        boids.apply_interaction(input.interaction(), params);
        boids.apply_impulses(impulses, params);
        boids.flock(&rules, *schedule);
        boids.integrate(params, *border, *domain, dt);

        advance_impulses(impulses, dt, params.impulse_fade_distance);
        fluid.step(dt, &FluidSettings::from_params(params));

        let ctx = ColorContext {
            params,
            palette,
            domain: *domain,
            impulses,
            volume: audio.volume(),
        };
        let gain = params.fluid_color_gain;
        let fluid: &FluidField = fluid;
        boids.update_colors(&ctx, |position| fluid.sample_color(position, gain), dt);

        *ticks += 1;
    }

    /// Apply the edge-triggered part of a frame's input: impulse spawns,
    /// population keys and fluid drags. Runs once per frame between ticks.
    pub fn apply_frame_input(&mut self, input: &InputState) {
        if input.spawn_impulse {
            if let Some(at) = input.mouse {
                self.spawn_impulse(at);
            }
        }
        if input.add_boids {
            self.add_boids(BOIDS_PER_KEY);
        }
        if input.remove_boids {
            self.remove_boids(BOIDS_PER_KEY);
        }
        if let Some((from, to)) = input.drag_segment() {
            self.fluid.drag(from, to, &FluidSettings::from_params(&self.params));
        }
    }

    pub fn spawn_impulse(&mut self, at: Vec2) {
        self.impulses.push(Impulse::new(at, self.params.impulse_growth_rate));
        debug!(x = at.x, y = at.y, live = self.impulses.len(), "impulse spawned");
    }

    pub fn add_boids(&mut self, count: usize) {
        let target = self.boids.len() + count;
        self.boids.resize(target, self.domain, &self.params, &mut self.rng);
        self.population_changed();
    }

    // Remove randomly chosen boids
    pub fn remove_boids(&mut self, count: usize) {
        for _ in 0..count.min(self.boids.len()) {
            let victim = self.rng.gen_range(0..self.boids.len());
            self.boids.swap_remove(victim);
        }
        self.population_changed();
    }

    fn population_changed(&mut self) {
        self.params.num_boids = self.boids.len();
        info!(boids = self.boids.len(), "population changed");
        self.update_schedule();
    }

    // Pick the execution strategy for the current population
    fn update_schedule(&mut self) {
        let schedule = Schedule::for_population(self.boids.len(), self.params.parallel_threshold);
        if schedule != self.schedule {
            debug!(from = self.schedule.label(), to = schedule.label(), boids = self.boids.len(), "schedule changed");
            self.schedule = schedule;
        }
    }

    /// Swap in a new params snapshot and rebuild whatever it invalidates.
    pub fn apply_params(&mut self, params: SimulationParams) -> RebuildFlags {
        let flags = SimulationParams::diff(&self.params, &params);
        self.params = params;

        if flags.grid {
            self.boids.rebuild_grid(self.domain, &self.params);
        }
        if flags.population {
            self.boids.resize(self.params.num_boids, self.domain, &self.params, &mut self.rng);
            info!(boids = self.boids.len(), "population changed");
        }
        if flags.palette {
            self.palette = Palette::from_params(&self.params);
        }
        if flags.fluid {
            self.fluid.resize(self.domain, self.params.fluid_scale);
            info!(width = self.fluid.width(), height = self.fluid.height(), "fluid field reallocated");
        }
        if flags.schedule {
            self.update_schedule();
        }
        if self.params.border != self.border {
            debug!(running = ?self.border, requested = ?self.params.border, "border policy deferred to reset");
        }

        flags
    }

    /// Follow a new window rect. A zero-area rect (minimized window) is
    /// ignored and the current buffers are kept; returns whether anything
    /// was rebuilt.
    pub fn resize(&mut self, domain: Rect) -> bool {
        if is_degenerate(domain) {
            warn!(width = domain.w(), height = domain.h(), "ignoring resize to a zero-area domain");
            return false;
        }
        if domain == self.domain {
            return false;
        }

        self.domain = domain;
        self.boids.rebuild_grid(domain, &self.params);
        self.fluid.resize(domain, self.params.fluid_scale);
        info!(width = domain.w(), height = domain.h(), "simulation domain resized");
        true
    }

    // Scatter a fresh flock, calm the field and adopt the requested border policy
    pub fn reset(&mut self) {
        self.border = self.params.border;
        self.boids = BoidStore::new(self.domain, &self.params, &mut self.rng);
        self.impulses.clear();
        self.fluid.clear();
        self.update_schedule();
        info!(boids = self.boids.len(), border = ?self.border, "simulation reset");
    }

    pub fn emit_vertices(&self, alpha: f32, out: &mut Vec<BoidVertex>) {
        emit_vertices(&self.boids, alpha, self.params.boid_size, self.schedule, out);
    }
}

/*
 * Application Module
 *
 * This module defines the nannou model and update loop that drive the
 * simulation. It owns everything the core leaves to its collaborators:
 * the window, the egui panel, the fixed-timestep accumulator, input
 * translation and the config file watch.
 *
 * Each frame:
 * - The UI edits a working copy of the params; a changed copy is applied
 *   to the simulation, which rebuilds only what the change invalidates
 * - Edge-triggered input (impulses, population keys, fluid drags) is
 *   applied once, between ticks
 * - Banked wall-clock time is spent in fixed physics steps, and the
 *   remainder becomes the render interpolation factor
 */

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use nannou::prelude::*;
use nannou_egui::Egui;
use tracing::{debug, info, warn};

use crate::colors::Silence;
use crate::debug::DebugInfo;
use crate::input::{self, InputState};
use crate::params::SimulationParams;
use crate::renderer::{self, BoidVertex};
use crate::simulation::Simulation;
use crate::timestep::FixedTimestep;
use crate::ui;

// How often the config file's modification time is checked
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(1);

// Used when the monitor size cannot be queried
const FALLBACK_WINDOW_SIZE: (u32, u32) = (1280, 720);

// Config document named on the command line, reloaded when it changes
pub struct ConfigWatch {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub last_poll: Instant,
}

// Main model for the application
pub struct Model {
    pub sim: Simulation,
    // Working copy edited by the UI and the keyboard
    pub params: SimulationParams,
    pub egui: Egui,
    pub debug_info: DebugInfo,
    pub input: InputState,
    pub timestep: FixedTimestep,
    pub last_update_time: Instant,
    pub interpolation_alpha: f32,
    pub vertices: Vec<BoidVertex>,
    pub config: Option<ConfigWatch>,
}

// Initialize the model
pub fn model(app: &App) -> Model {
    let config_path = env::args().nth(1).map(PathBuf::from);
    let params = match &config_path {
        Some(path) => SimulationParams::load(path).unwrap_or_else(|err| {
            warn!(error = %err, "falling back to default parameters");
            SimulationParams::default()
        }),
        None => SimulationParams::default(),
    };
    log_warnings(&params);

    // 80% of the primary monitor
    let (window_width, window_height) = app
        .primary_monitor()
        .map(|monitor| {
            let size = monitor.size();
            ((size.width as f32 * 0.8) as u32, (size.height as f32 * 0.8) as u32)
        })
        .unwrap_or(FALLBACK_WINDOW_SIZE);

    let window_id = app
        .new_window()
        .title("Murmuration")
        .size(window_width, window_height)
        .view(renderer::view)
        .mouse_moved(input::mouse_moved)
        .mouse_pressed(input::mouse_pressed)
        .mouse_released(input::mouse_released)
        .mouse_exited(input::mouse_exited)
        .key_pressed(input::key_pressed)
        .resized(input::resized)
        .raw_event(input::raw_window_event)
        .build()
        .expect("failed to open the main window");

    let window = app.window(window_id).expect("main window closed during startup");
    let egui = Egui::from_window(&window);
    let domain = window.rect();

    let sim = Simulation::new(params.clone(), domain);
    let timestep = FixedTimestep::new(params.fixed_physics_fps, params.max_steps_per_frame);

    let config = config_path.map(|path| ConfigWatch {
        modified: modified_time(&path),
        path,
        last_poll: Instant::now(),
    });

    Model {
        sim,
        params,
        egui,
        debug_info: DebugInfo::default(),
        input: InputState::default(),
        timestep,
        last_update_time: Instant::now(),
        interpolation_alpha: 0.0,
        vertices: Vec::new(),
        config,
    }
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;

    let should_reset = ui::update_ui(&mut model.egui, &mut model.params, &model.debug_info);
    poll_config(model);

    if model.params != *model.sim.params() {
        let flags = model.sim.apply_params(model.params.clone());
        if flags.timestep {
            model.timestep.set_step_hz(model.params.fixed_physics_fps, model.params.max_steps_per_frame);
        }
        if flags.any() {
            debug!(?flags, "parameters applied");
        }
    }
    if should_reset {
        model.sim.reset();
        model.timestep.reset();
    }

    model.sim.apply_frame_input(&model.input);
    // Keys may have changed the population behind the panel's back
    model.params.num_boids = model.sim.params().num_boids;

    let now = Instant::now();
    let elapsed = now.duration_since(model.last_update_time);
    model.last_update_time = now;

    if model.params.pause_simulation {
        model.timestep.reset();
        model.debug_info.physics_updates_per_frame = 0;
    } else {
        let steps = model.timestep.advance(elapsed);
        let dt = model.timestep.step_secs();
        for _ in 0..steps {
            model.sim.tick(dt, &model.input, &Silence);
        }
        model.debug_info.physics_updates_per_frame = steps;
    }

    model.interpolation_alpha = if model.params.enable_interpolation {
        model.timestep.alpha()
    } else {
        1.0
    };
    model.debug_info.interpolation_alpha = model.interpolation_alpha;
    model.debug_info.refresh(&model.sim, model.params.show_debug);

    model.input.end_frame();
    model.sim.emit_vertices(model.interpolation_alpha, &mut model.vertices);
}

fn log_warnings(params: &SimulationParams) {
    for warning in params.validate() {
        warn!(%warning, "suspicious simulation parameter");
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

// Reload the config document when its modification time changes
fn poll_config(model: &mut Model) {
    let Some(watch) = model.config.as_mut() else {
        return;
    };
    if watch.last_poll.elapsed() < CONFIG_POLL_INTERVAL {
        return;
    }
    watch.last_poll = Instant::now();

    let modified = modified_time(&watch.path);
    if modified.is_none() || modified == watch.modified {
        return;
    }
    watch.modified = modified;

    match SimulationParams::load(&watch.path) {
        Ok(params) => {
            log_warnings(&params);
            info!(path = %watch.path.display(), "config changed on disk");
            model.params = params;
        }
        Err(err) => warn!(error = %err, "config reload failed; keeping current parameters"),
    }
}

/*
 * UI Module
 *
 * This module contains functions for creating and updating the user interface
 * using nannou_egui. The panel edits a working copy of the parameters; the
 * app diffs that copy against the running simulation once per frame.
 */

use nannou_egui::{egui, Egui};

use crate::colors::ColorFlags;
use crate::debug::DebugInfo;
use crate::params::{BorderPolicy, SimulationParams};

// Update the UI and return whether the flock should be reset
pub fn update_ui(egui: &mut Egui, params: &mut SimulationParams, debug_info: &DebugInfo) -> bool {
    let mut should_reset = false;

    let ctx = egui.begin_frame();

    egui::Window::new("Simulation Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.collapsing("Boid Parameters", |ui| {
                ui.add(egui::Slider::new(&mut params.num_boids, SimulationParams::get_num_boids_range()).text("Number of Boids"));

                if ui.button("Reset Boids").clicked() {
                    should_reset = true;
                }

                ui.add(egui::Slider::new(&mut params.speed_min, SimulationParams::get_speed_range()).text("Min Speed"));
                ui.add(egui::Slider::new(&mut params.speed_max, SimulationParams::get_speed_range()).text("Max Speed"));
                ui.add(egui::Slider::new(&mut params.max_steer_force, 0.1..=30.0).text("Max Steer Force"));
                ui.add(egui::Slider::new(&mut params.view_angle_degrees, 30.0..=360.0).text("View Angle"));
                ui.add(egui::Slider::new(&mut params.boid_size, 1.0..=12.0).text("Boid Size"));
            });

            ui.collapsing("Flocking Behavior", |ui| {
                ui.add(egui::Slider::new(&mut params.separation_weight, SimulationParams::get_weight_range()).text("Separation Weight"));
                ui.add(egui::Slider::new(&mut params.alignment_weight, SimulationParams::get_weight_range()).text("Alignment Weight"));
                ui.add(egui::Slider::new(&mut params.cohesion_weight, SimulationParams::get_weight_range()).text("Cohesion Weight"));
                ui.add(egui::Slider::new(&mut params.separation_radius, SimulationParams::get_radius_range()).text("Separation Radius"));
                ui.add(egui::Slider::new(&mut params.alignment_radius, SimulationParams::get_radius_range()).text("Alignment Radius"));
                ui.add(egui::Slider::new(&mut params.cohesion_radius, SimulationParams::get_radius_range()).text("Cohesion Radius"));
            });

            ui.collapsing("Borders", |ui| {
                ui.horizontal(|ui| {
                    ui.radio_value(&mut params.border, BorderPolicy::Turn, "Turn");
                    ui.radio_value(&mut params.border, BorderPolicy::Teleport, "Teleport");
                });
                ui.label("Policy takes effect on Reset");
                ui.add(egui::Slider::new(&mut params.turn_margin, 0.0..=300.0).text("Turn Margin"));
                ui.add(egui::Slider::new(&mut params.turn_factor, 0.0..=0.05).text("Turn Factor"));
            });

            ui.collapsing("Colors", |ui| {
                for (flag, label) in ColorFlags::ALL {
                    let mut enabled = params.color_flags.contains(flag);
                    if ui.checkbox(&mut enabled, label).changed() {
                        params.color_flags.set(flag, enabled);
                    }
                }
                ui.add(egui::Slider::new(&mut params.cycle_speed, 0.0..=1.0).text("Cycle Speed"));
                ui.add(egui::Slider::new(&mut params.fluid_color_gain, 0.0..=0.2).text("Fluid Color Gain"));
            });

            ui.collapsing("Fluid", |ui| {
                ui.add(egui::Slider::new(&mut params.fluid_scale, 2..=32).text("Cell Scale"));
                ui.add(egui::Slider::new(&mut params.fluid_diffusion, 0.0..=2.0).text("Diffusion"));
                ui.add(egui::Slider::new(&mut params.fluid_viscosity, 0.0..=2.0).text("Viscosity"));
                ui.add(egui::Slider::new(&mut params.fluid_fade, 0.0..=0.05).text("Fade"));
                ui.add(egui::Slider::new(&mut params.fluid_mouse_strength, 0.0..=100.0).text("Mouse Strength"));
            });

            ui.collapsing("Performance Tuning", |ui| {
                ui.add(egui::Slider::new(&mut params.cell_size_factor, SimulationParams::get_cell_size_factor_range()).text("Cell Size Factor"));
                ui.add(egui::Slider::new(&mut params.parallel_threshold, 0..=20000).text("Parallel Threshold"));
                ui.add(egui::Slider::new(&mut params.fixed_physics_fps, 10.0..=240.0).text("Physics FPS"));
                ui.checkbox(&mut params.enable_interpolation, "Interpolate Rendering");

                ui.separator();

                // Performance metrics
                ui.label(format!("FPS: {:.1}", debug_info.fps));
                ui.label(format!("Frame time: {:.2} ms", debug_info.frame_time.as_secs_f64() * 1000.0));
                ui.label(format!("Boids: {} ({})", debug_info.boid_count, debug_info.schedule));
            });

            ui.checkbox(&mut params.show_debug, "Show Debug Info");
            ui.checkbox(&mut params.pause_simulation, "Pause Simulation");
        });

    should_reset
}

// Draw debug information on the screen
pub fn draw_debug_info(draw: &nannou::Draw, debug_info: &DebugInfo, window_rect: nannou::geom::Rect) {
    let lines = debug_info.lines();

    // Create a background panel in the top-right corner
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 240.0;
    let panel_height = line_height * lines.len() as f32 + margin;
    let panel_x = window_rect.right() - panel_width / 2.0;
    let panel_y = window_rect.top() - panel_height / 2.0;

    draw.rect()
        .x_y(panel_x, panel_y)
        .w_h(panel_width, panel_height)
        .color(nannou::color::rgba(0.0, 0.0, 0.0, 0.7));

    let text_y = window_rect.top() - margin;
    for (i, text) in lines.iter().enumerate() {
        let y = text_y - (i as f32 * line_height);
        draw.text(text)
            .x_y(panel_x, y)
            .w(panel_width - margin)
            .left_justify()
            .color(nannou::color::WHITE)
            .font_size(14);
    }
}

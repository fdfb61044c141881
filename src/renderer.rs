/*
 * Renderer Module
 *
 * This module handles the rendering of the simulation. The core only writes
 * boid triangles into a flat vertex buffer; the nannou view then draws that
 * buffer as one mesh on top of the fluid field and the impulse rings.
 *
 * Optimized for performance by:
 * - Emitting vertices in parallel chunks for large flocks
 * - Drawing every boid in a single mesh instead of one polygon each
 * - Skipping fluid cells with no visible density
 */

use nannou::color::Rgb;
use nannou::prelude::*;
use rayon::prelude::*;
use tracing::warn;

use crate::app::Model;
use crate::boid::BoidStore;
use crate::colors::{pack_rgb, unpack_rgb};
use crate::schedule::Schedule;
use crate::ui;

// Fluid cells fainter than this are not drawn
const MIN_VISIBLE_DENSITY: f32 = 0.02;

/// One corner of a boid triangle, ready for a vertex buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoidVertex {
    pub position: [f32; 2],
    pub color: u32,
}

// Boid outline pointing along +x, centered on the boid
fn triangle(size: f32) -> [Vec2; 3] {
    [vec2(size, 0.0), vec2(-size, size / 2.0), vec2(-size, -size / 2.0)]
}

/// Write three vertices per boid into `out`, resized to fit: the triangle
/// at the boid's interpolated position, rotated to its heading, in the
/// boid's packed color.
pub fn emit_vertices(store: &BoidStore, alpha: f32, size: f32, schedule: Schedule, out: &mut Vec<BoidVertex>) {
    out.resize(store.len() * 3, BoidVertex::default());
    let corners = triangle(size);

    let write = |(i, tri): (usize, &mut [BoidVertex])| {
        let center = store.interpolated_position(i, alpha);
        let (sin, cos) = store.angle[i].sin_cos();
        let color = pack_rgb(store.color[i]);
        for (vertex, corner) in tri.iter_mut().zip(corners) {
            let rotated = vec2(corner.x * cos - corner.y * sin, corner.x * sin + corner.y * cos);
            *vertex = BoidVertex { position: (center + rotated).to_array(), color };
        }
    };

    match schedule {
        Schedule::Parallel => out
            .par_chunks_mut(3)
            .enumerate()
            .with_min_len(schedule.chunk_size(store.len()))
            .for_each(write),
        Schedule::Sequential => out.chunks_mut(3).enumerate().for_each(write),
    }
}

// Mesh point for a vertex: nannou meshes live in 3D, boids sit on z = 0
fn mesh_point(vertex: &BoidVertex) -> (Vec3, Rgb) {
    let [r, g, b] = unpack_rgb(vertex.color).map(|c| c as f32 / 255.0);
    (pt3(vertex.position[0], vertex.position[1], 0.0), rgb(r, g, b))
}

// Render the model
pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    draw_fluid(&draw, model);

    // Every boid in one triangle-list mesh
    draw.mesh().points_colored(model.vertices.iter().map(mesh_point));

    let params = model.sim.params();
    for impulse in model.sim.impulses() {
        let fade = impulse.fade(params.impulse_fade_distance);
        let [r, g, b] = params.impulse_color;
        draw.ellipse()
            .xy(impulse.origin)
            .radius(impulse.radius)
            .no_fill()
            .stroke(rgba(r, g, b, fade * 0.6))
            .stroke_weight(2.0);
    }

    if model.params.show_debug {
        draw_first_boid_radii(&draw, model);
        ui::draw_debug_info(&draw, &model.debug_info, app.window_rect());
    }

    if let Err(err) = draw.to_frame(app, &frame) {
        warn!(error = ?err, "failed to draw frame");
    }

    // Draw the egui UI
    if let Err(err) = model.egui.draw_to_frame(&frame) {
        warn!(error = ?err, "failed to draw controls");
    }
}

// The fluid as a low-resolution grid of translucent cells
fn draw_fluid(draw: &Draw, model: &Model) {
    let fluid = model.sim.fluid();
    let gain = model.sim.params().fluid_color_gain;
    let size = fluid.cell_size();
    let density = fluid.density();

    for y in 1..fluid.height() - 1 {
        for x in 1..fluid.width() - 1 {
            let d = density[fluid.index(x, y)];
            if d < MIN_VISIBLE_DENSITY {
                continue;
            }
            let center = fluid.cell_center(x, y);
            let tint = fluid.sample_color(center, gain) * 0.6 + vec3(0.1, 0.15, 0.35);
            draw.rect()
                .xy(center)
                .wh(size)
                .color(rgba(tint.x, tint.y, tint.z, d.min(1.0) * 0.5));
        }
    }
}

// Interaction radii and velocity of boid 0
fn draw_first_boid_radii(draw: &Draw, model: &Model) {
    let boids = model.sim.boids();
    if boids.is_empty() {
        return;
    }
    let params = model.sim.params();
    let position = boids.interpolated_position(0, model.interpolation_alpha);

    for (radius, color) in [
        (params.separation_radius, RED),
        (params.alignment_radius, GREEN),
        (params.cohesion_radius, BLUE),
    ] {
        draw.ellipse()
            .xy(position)
            .radius(radius)
            .no_fill()
            .stroke(color)
            .stroke_weight(1.0);
    }

    // Velocity vector, scaled to a quarter second of travel
    draw.arrow()
        .start(position)
        .end(position + boids.velocity[0] * 0.25)
        .color(YELLOW)
        .stroke_weight(2.0);
}

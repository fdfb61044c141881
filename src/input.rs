/*
 * Input Module
 *
 * This module turns nannou window events into an InputState the simulation
 * reads between and during ticks.
 *
 * Controls:
 * - Left drag stirs the fluid
 * - Right button attracts boids to the cursor, middle button repels them
 * - An idle cursor acts as a predator
 * - Space spawns an impulse ring at the cursor
 * - = / - add or remove boids, P pauses, D toggles debug info
 */

use nannou::prelude::*;
use nannou::winit::event::MouseButton;

use crate::app::Model;
use crate::physics::Interaction;

/// Mouse and keyboard state for one frame.
///
/// Held buttons are levels; `spawn_impulse`, `add_boids` and
/// `remove_boids` are edges that stay set until `end_frame`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputState {
    pub mouse: Option<Vec2>,
    pub previous_mouse: Option<Vec2>,
    pub steer_held: bool,
    pub repel_held: bool,
    pub drag_held: bool,
    pub spawn_impulse: bool,
    pub add_boids: bool,
    pub remove_boids: bool,
}

impl InputState {
    // Cursor influence on the flock; none while the cursor is outside the window
    pub fn interaction(&self) -> Interaction {
        match self.mouse {
            None => Interaction::None,
            Some(at) if self.steer_held => Interaction::Attract(at),
            Some(at) if self.repel_held => Interaction::Repel(at),
            Some(at) => Interaction::Predator(at),
        }
    }

    // Mouse movement since last frame while the drag button is held
    pub fn drag_segment(&self) -> Option<(Vec2, Vec2)> {
        if !self.drag_held {
            return None;
        }
        match (self.previous_mouse, self.mouse) {
            (Some(from), Some(to)) if from != to => Some((from, to)),
            _ => None,
        }
    }

    pub fn end_frame(&mut self) {
        self.previous_mouse = self.mouse;
        self.spawn_impulse = false;
        self.add_boids = false;
        self.remove_boids = false;
    }
}

// Mouse moved event handler
pub fn mouse_moved(_app: &App, model: &mut Model, pos: Point2) {
    model.input.mouse = Some(pos);
}

// Forget the cursor so the predator does not linger at the window edge
pub fn mouse_exited(_app: &App, model: &mut Model) {
    model.input.mouse = None;
    model.input.previous_mouse = None;
}

// Mouse pressed event handler
pub fn mouse_pressed(_app: &App, model: &mut Model, button: MouseButton) {
    // Clicks on the control panel belong to egui
    if model.egui.ctx().is_pointer_over_area() {
        return;
    }
    match button {
        MouseButton::Left => model.input.drag_held = true,
        MouseButton::Right => model.input.steer_held = true,
        MouseButton::Middle => model.input.repel_held = true,
        _ => {}
    }
}

// Mouse released event handler
pub fn mouse_released(_app: &App, model: &mut Model, button: MouseButton) {
    match button {
        MouseButton::Left => model.input.drag_held = false,
        MouseButton::Right => model.input.steer_held = false,
        MouseButton::Middle => model.input.repel_held = false,
        _ => {}
    }
}

pub fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    if model.egui.ctx().wants_keyboard_input() {
        return;
    }
    match key {
        Key::Space => model.input.spawn_impulse = true,
        Key::Equals | Key::Plus => model.input.add_boids = true,
        Key::Minus => model.input.remove_boids = true,
        Key::P => model.params.pause_simulation = !model.params.pause_simulation,
        Key::D => model.params.show_debug = !model.params.show_debug,
        _ => {}
    }
}

// The simulation domain follows the window
pub fn resized(_app: &App, model: &mut Model, size: Vec2) {
    let domain = Rect::from_w_h(size.x, size.y);
    if model.sim.resize(domain) {
        model.timestep.reset();
    }
}

// Handle raw window events for egui
pub fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    model.egui.handle_raw_event(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_cursor_is_a_predator() {
        let mut input = InputState::default();
        assert_eq!(input.interaction(), Interaction::None);
        input.mouse = Some(vec2(3.0, 4.0));
        assert_eq!(input.interaction(), Interaction::Predator(vec2(3.0, 4.0)));
        input.repel_held = true;
        assert_eq!(input.interaction(), Interaction::Repel(vec2(3.0, 4.0)));
        input.steer_held = true;
        assert_eq!(input.interaction(), Interaction::Attract(vec2(3.0, 4.0)));
    }

    #[test]
    fn drag_needs_button_and_movement() {
        let mut input = InputState {
            mouse: Some(vec2(10.0, 0.0)),
            previous_mouse: Some(vec2(0.0, 0.0)),
            ..Default::default()
        };
        assert_eq!(input.drag_segment(), None);
        input.drag_held = true;
        assert_eq!(input.drag_segment(), Some((vec2(0.0, 0.0), vec2(10.0, 0.0))));
        input.end_frame();
        assert_eq!(input.drag_segment(), None);
    }

    #[test]
    fn end_frame_clears_edges_only() {
        let mut input = InputState {
            steer_held: true,
            spawn_impulse: true,
            add_boids: true,
            remove_boids: true,
            ..Default::default()
        };
        input.end_frame();
        assert!(input.steer_held);
        assert!(!input.spawn_impulse && !input.add_boids && !input.remove_boids);
    }
}

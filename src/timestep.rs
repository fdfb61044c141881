/*
 * Timestep Module
 *
 * Fixed-timestep accumulator. Wall-clock time is banked and spent in
 * constant-size physics steps; whatever is left over becomes the render
 * interpolation factor and never feeds back into the simulation.
 */

use std::time::Duration;

use tracing::debug;

#[derive(Clone, Debug)]
pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(steps_per_second: f32, max_steps: u32) -> Self {
        Self {
            step: Self::step_for(steps_per_second),
            accumulator: Duration::ZERO,
            max_steps,
        }
    }

    fn step_for(steps_per_second: f32) -> Duration {
        Duration::from_secs_f32(1.0 / steps_per_second.max(1.0))
    }

    pub fn set_step_hz(&mut self, steps_per_second: f32, max_steps: u32) {
        self.step = Self::step_for(steps_per_second);
        self.max_steps = max_steps;
        self.accumulator = self.accumulator.min(self.step);
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn step_secs(&self) -> f32 {
        self.step.as_secs_f32()
    }

    /// Bank `elapsed` and return how many fixed steps to run now.
    ///
    /// At most `max_steps` are returned; a backlog beyond that is dropped
    /// (keeping only the sub-step remainder) so a slow frame cannot snowball
    /// into ever longer frames.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }

        if self.accumulator >= self.step {
            let remainder = self.accumulator.as_nanos() % self.step.as_nanos().max(1);
            debug!(
                dropped_ms = (self.accumulator.as_secs_f64() * 1000.0) as u64,
                steps,
                "physics backlog dropped"
            );
            self.accumulator = Duration::from_nanos(remainder as u64);
        }

        steps
    }

    // Fraction of a step banked but not yet simulated, in [0, 1]
    pub fn alpha(&self) -> f32 {
        (self.accumulator.as_secs_f32() / self.step.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_steps_are_consumed_and_remainder_kept() {
        let mut timestep = FixedTimestep::new(100.0, 10);
        assert_eq!(timestep.advance(Duration::from_millis(25)), 2);
        assert!((timestep.alpha() - 0.5).abs() < 1e-3);
        assert_eq!(timestep.advance(Duration::from_millis(5)), 1);
        assert!(timestep.alpha() < 1e-3);
    }

    #[test]
    fn steps_per_frame_are_capped() {
        let mut timestep = FixedTimestep::new(100.0, 3);
        assert_eq!(timestep.advance(Duration::from_millis(1000)), 3);
        // The backlog is gone; the next short frame runs normally
        assert!(timestep.alpha() < 1.0);
        assert_eq!(timestep.advance(Duration::from_millis(10)), 1);
    }

    #[test]
    fn zero_max_steps_never_advances() {
        let mut timestep = FixedTimestep::new(60.0, 0);
        assert_eq!(timestep.advance(Duration::from_secs(1)), 0);
        assert!(timestep.alpha() <= 1.0);
    }
}

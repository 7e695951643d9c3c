use std::time::{Duration, Instant};

pub struct Time {
    start: Instant,
    last: Instant,
    pub delta: Duration,
}
impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, delta: Duration::from_secs_f32(0.0) }
    }
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last;
        self.last = now;
    }
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-timestep accumulator decoupling physics stepping from the variable
/// frame delta. Backlog beyond `max_backlog` is dropped rather than replayed.
pub struct FixedStepper {
    accumulator: f32,
    fixed_dt: f32,
    max_backlog: f32,
}

impl FixedStepper {
    pub fn new(fixed_dt: f32, max_backlog: f32) -> Self {
        let fixed_dt = fixed_dt.max(1.0e-4);
        Self { accumulator: 0.0, fixed_dt, max_backlog: max_backlog.max(fixed_dt) }
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Feeds a frame delta into the accumulator. Returns the amount of
    /// simulation debt discarded, if the backlog cap was hit.
    pub fn advance(&mut self, dt: f32) -> Option<f32> {
        self.accumulator += dt.max(0.0);
        if self.accumulator > self.max_backlog {
            let dropped = self.accumulator - self.max_backlog;
            self.accumulator = self.max_backlog;
            Some(dropped)
        } else {
            None
        }
    }

    pub fn pop_step(&mut self) -> Option<f32> {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            Some(self.fixed_dt)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

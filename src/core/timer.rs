/// Self-contained timers - each accumulates its own state and decides when to fire

/// Fixed rate timer - fires at a given frequency
#[derive(Debug, Clone, Copy)]
pub struct FixedHz {
    pub interval: f32,
    pub accumulator: f32,
}

impl FixedHz {
    pub fn new(hz: f32) -> Self {
        Self {
            interval: 1.0 / hz,
            accumulator: 0.0,
        }
    }

    /// Update with delta seconds, returns true if the timer should fire
    pub fn tick(&mut self, delta: f32) -> bool {
        self.accumulator += delta;

        if self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            true
        } else {
            false
        }
    }

    /// Seconds left until the next fire
    pub fn remaining(&self) -> f32 {
        (self.interval - self.accumulator).max(0.0)
    }
}

/// Frame counter - fires on the first tick and then every N ticks
#[derive(Debug, Clone, Copy)]
pub struct EveryNTicks {
    interval: u64,
    count: u64,
}

impl EveryNTicks {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            count: 0,
        }
    }

    /// Advance one tick, true when this tick fires
    pub fn tick(&mut self) -> bool {
        let fire = self.count % self.interval == 0;
        self.count = self.count.wrapping_add(1);
        fire
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

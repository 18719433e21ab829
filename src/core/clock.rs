use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Monotonic millisecond tick source.
///
/// Ticks are `u32` and wrap every 2^32 ms (about 49.7 days), the same as a
/// system tick counter. Consumers compare them with [`tick_before`].
pub trait MonotonicClock: Send + Sync {
    fn now_millis(&self) -> u32;
}

/// Wrap-safe `a < b` for tick values less than 2^31 ms (about 24.8 days) apart
pub fn tick_before(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Milliseconds since construction, truncated to 32 bits
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_millis(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: AtomicU32::new(start),
        }
    }

    pub fn set(&self, millis: u32) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move forward, wrapping like a real tick counter
    pub fn advance(&self, millis: u32) {
        // fetch_add wraps on overflow
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Frame clock - tracks delta time between ticks
#[derive(Debug)]
pub struct FrameClock {
    last_tick: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
        }
    }

    /// Delta in seconds since the last tick, advancing the clock
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn tick_before_plain_order() {
        assert!(tick_before(50, 100));
        assert!(!tick_before(100, 100));
        assert!(!tick_before(150, 100));
    }

    #[test]
    fn tick_before_across_wrap() {
        let just_before_wrap = u32::MAX - 10;
        let just_after_wrap = 20u32;
        assert!(tick_before(just_before_wrap, just_after_wrap));
        assert!(!tick_before(just_after_wrap, just_before_wrap));
    }

    #[test]
    fn manual_clock_advances_and_wraps() {
        let clock = ManualClock::new(u32::MAX - 5);
        clock.advance(10);
        assert_eq!(clock.now_millis(), 4);
        clock.set(1000);
        assert_eq!(clock.now_millis(), 1000);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock::new();
        let start = clock.now_millis();
        thread::sleep(Duration::from_millis(10));
        assert!(clock.now_millis() >= start + 9);
    }

    #[test]
    fn frame_clock_measures_delta() {
        let mut clock = FrameClock::new();

        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick();

        assert!(delta >= 0.009);
    }
}

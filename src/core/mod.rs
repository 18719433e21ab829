pub mod clock;
pub mod timer;

pub use clock::{tick_before, FrameClock, ManualClock, MonotonicClock, SystemClock};
pub use timer::{EveryNTicks, FixedHz};

/// Small shared utilities
pub mod clock;
pub mod event_emitter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_emitter::EventEmitter;

/// Timer-driven producers that write into a conversation: remote presence and replies
pub mod presence;
pub mod reply;
pub mod timers;

pub use reply::ReplyPlan;
pub use timers::{TimerKey, TimerSet};

use rand::Rng;
use std::time::Duration;

/// Uniform draw within `[min, max]`; a collapsed range yields `min`
pub(crate) fn jitter<R: Rng + ?Sized>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    if min >= max {
        min
    } else {
        rng.gen_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let (min, max) = (Duration::from_millis(500), Duration::from_millis(1500));
        for _ in 0..1000 {
            let d = jitter(&mut rng, min, max);
            assert!(d >= min && d <= max, "{:?} out of bounds", d);
        }
        assert_eq!(jitter(&mut rng, max, max), max);
        assert_eq!(jitter(&mut rng, max, min), max);
    }
}

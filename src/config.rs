//! Host configuration.

use std::time::Duration;

/// Settings for the [`Host`](crate::Host) loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Minimum time between two rendered frames.
    pub min_frame_interval: Duration,

    /// Upper bound on input events dispatched by one `poll`; the rest stay queued.
    pub max_events_per_poll: usize,

    /// Negate horizontal wheel deltas before they reach the view tree.
    ///
    /// Some platforms report horizontal scrolling with the opposite sign.
    pub invert_wheel_x: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_frame_interval: Duration::from_micros(1_000_000 / 60),
            max_events_per_poll: 256,
            invert_wheel_x: false,
        }
    }
}

impl Config {
    pub fn min_frame_interval(mut self, interval: Duration) -> Self {
        self.min_frame_interval = interval;
        self
    }

    pub fn max_events_per_poll(mut self, max: usize) -> Self {
        self.max_events_per_poll = max.max(1);
        self
    }

    pub fn invert_wheel_x(mut self, invert: bool) -> Self {
        self.invert_wheel_x = invert;
        self
    }
}

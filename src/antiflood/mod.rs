//! Anti-flood protection.
//!
//! Counts attempts per actor and action in one-minute buckets held in a
//! shared counter store, so every instance of the application sees the same
//! totals.

mod actor;
mod clock;
mod config;
mod limiter;

pub use actor::Actor;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AntiFloodConfig, AntiFloodConfigBuilder};
pub use limiter::{AntiFlood, Attempt, DEFAULT_ACTION, MAX_WINDOW};

//! Time abstractions shared by the cache and the resilience registry
//!
//! Everything that measures TTLs or breaker cool-downs reads time through the
//! [`Clock`] trait, so tests can drive expiry with [`MockClock`] instead of
//! sleeping.
//!
//! ```
//! use std::time::Duration;
//!
//! use rocville_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
//! ```

mod clock;

pub use clock::{Clock, MockClock, SystemClock};

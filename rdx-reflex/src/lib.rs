//! # Reflex
//!
//! The core of a reflex and aim-training game: a session clock, a clickable
//! target that measures click latency, respawning items scored by how late
//! they are collected, a score and an activity log.
//!
//! ## Core Concepts
//!
//! - **Broker**: Every component is registered on one [`broker::Broker`] and
//!   talks to the others only by publishing messages. Delivery is synchronous
//!   and follows registration order.
//! - **Mirrors**: Each component keeps the last value it saw for every
//!   property of every peer, and reads shared state (session seconds,
//!   timescale, segments) from there.
//! - **Session Segments**: The timer records the real-time spans during which
//!   the session was running, so click intervals can exclude paused time.
//! - **Pluggable Time**: Real time and the one-second ticker are injected,
//!   which keeps the whole game deterministic under test.
//!
//! ## Example Usage
//!
//! ```rust
//! use reflex::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> reflex::error::Result<()> {
//!     let time = Arc::new(ManualTime::new(0));
//!     let mut game = Game::new(&ReflexConfig::default(), time.clone(), Box::new(ManualTicker::new()))?;
//!
//!     game.start()?;
//!     time.advance(1_000);
//!     game.advance()?;
//!     game.click_target()?;
//!
//!     assert_eq!(game.timer().clock().elapsed_seconds(), 1);
//!     assert_eq!(game.score().session(), 1);
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Reflex Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod broker;
pub mod clock;
pub mod common;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod stats;
pub mod time;

/// A prelude module for easy importing of the most common Reflex types.
pub mod prelude {
    pub use crate::clock::{RunState, Segment, SessionClock};
    pub use crate::common::prelude::*;
    pub use crate::components::items::{ItemOutcome, Lateness};
    pub use crate::error::ReflexError;
    pub use crate::events::{LogEntry, LogStyle, Message, Process};
    pub use crate::game::Game;
    pub use crate::time::{
        ManualTicker, ManualTime, MonotonicTime, SharedTime, Tick, Ticker, TimeSource,
        TokioTicker,
    };
}

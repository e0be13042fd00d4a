//! The components that make up a game.
//!
//! Each one registers with the broker under a fixed name and reacts to the
//! others only through bus messages: the timer owns session time, the score
//! sums points, the target and items turn activations into points and log
//! lines, and the logger keeps the running log.

pub mod items;
pub mod logger;
pub mod score;
pub mod target;
pub mod timer;

//! Contains common, primitive types and the text helpers shared by components.
//!
//! This module defines the identifier used to address registered components on
//! the broker, the millisecond timestamp type used by the session clock, and
//! the padding and `mm:ss` formatting used wherever a number is presented.

use slotmap::new_key_type;

/// A prelude module for convenient importing of the most common Reflex types.
///
/// # Example
/// ```
/// use reflex::common::prelude::*;
/// ```
pub mod prelude {
    pub use super::{format_time, pad, ComponentId, Millis};
    pub use crate::broker::{Broker, Component, Context, Handle};
    pub use crate::config::ReflexConfig;
}

new_key_type! {
    /// Uniquely and safely identifies a component registered with the broker.
    ///
    /// This key is assigned when a component is registered. Entries are never
    /// removed, so a key stays valid for the lifetime of its broker.
    pub struct ComponentId;
}

/// A real-time timestamp in milliseconds, measured from the origin of a
/// [`TimeSource`](crate::time::TimeSource).
pub type Millis = u64;

/// Converts `number` to a string left-padded with zeroes to `length` characters.
///
/// Values that are already at least `length` characters long are returned as-is.
pub fn pad(number: impl std::fmt::Display, length: usize) -> String {
    format!("{:0>width$}", number.to_string(), width = length)
}

/// Formats session seconds as `mm:ss`.
///
/// Minutes are not wrapped into hours, so long sessions keep counting up
/// (`3725` renders as `"62:05"`).
pub fn format_time(seconds: u64) -> String {
    format!("{}:{}", pad(seconds / 60, 2), pad(seconds % 60, 2))
}

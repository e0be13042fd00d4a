//! Error types for the Reflex engine.
//!
//! Every error here is a contract violation by the caller. Handlers validate
//! their input before mutating any state, so a returned error means the
//! offending action had no effect on the component that rejected it.

use crate::common::Millis;
use thiserror::Error;

/// Main error type for the Reflex engine.
#[derive(Error, Debug)]
pub enum ReflexError {
    /// A message was published on behalf of a component the broker does not know.
    #[error("Unregistered sender: {0}")]
    UnregisteredSender(String),

    /// A component was registered under a name that is already taken.
    #[error("A component named '{0}' is already registered")]
    DuplicateComponent(String),

    /// A handle was used with a broker entry holding a different component type.
    #[error("Component '{name}' is not a {expected}")]
    ComponentType { name: String, expected: &'static str },

    /// A message value violates the structure of the property it is sent under.
    #[error("Malformed message for property '{property}': {reason}")]
    MalformedMessage { property: String, reason: String },

    /// Two click times were presented out of chronological order.
    #[error("Invalid time sequence for click times: {first}, {second}")]
    InvalidSequence { first: Millis, second: Millis },

    /// A session segment was opened while open, or closed while closed.
    #[error("Invalid session segment state: {0}")]
    InvalidSegmentState(&'static str),

    /// An item activation referenced an id that is not configured.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Configuration could not be loaded or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReflexError>;

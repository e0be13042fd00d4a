//! Defines the messages components exchange over the broker.
//!
//! This module acts as the public protocol of the engine. Each built-in
//! property a component can publish is a variant of [`Message`], so receivers
//! pattern-match on what they care about and get exhaustiveness checking for
//! free. Application-defined properties travel as [`Message::Custom`].

use crate::clock::Segment;
use std::collections::BTreeMap;
use std::fmt;

/// The session process states announced by the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Process {
    Start,
    Pause,
    End,
}

impl Process {
    pub fn as_str(&self) -> &'static str {
        match self {
            Process::Start => "start",
            Process::Pause => "pause",
            Process::End => "end",
        }
    }
}

/// Presentation style of a log entry.
///
/// Items colour their click log by lateness band; rejected clicks are grey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStyle {
    Blue,
    Green,
    Yellow,
    Red,
    Grey,
}

impl LogStyle {
    /// The CSS class name this style corresponds to on a web surface.
    pub fn css_class(&self) -> &'static str {
        match self {
            LogStyle::Blue => "color-blue",
            LogStyle::Green => "color-green",
            LogStyle::Yellow => "color-yellow",
            LogStyle::Red => "color-red",
            LogStyle::Grey => "color-grey",
        }
    }
}

/// A log line published under the `log` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub entry: String,
    pub style: LogStyle,
}

impl LogEntry {
    pub fn new(entry: impl Into<String>, style: LogStyle) -> Self {
        Self {
            entry: entry.into(),
            style,
        }
    }
}

/// A loosely-typed value, used for custom properties and for presenting the
/// broker state table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A single publication on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Session run state changes, published by the timer.
    Process(Process),
    /// Elapsed session seconds, published by the timer on every change.
    Seconds(u64),
    /// The current timescale multiplier, published by the timer when it changes.
    TimescaleMultiplier(u32),
    /// The full list of session segments, published by the timer on every change.
    SessionSegments(Vec<Segment>),
    /// Points awarded by a click, before timescale scaling.
    Points(u64),
    /// A log line for the logger.
    Log(LogEntry),
    /// Target visibility, published by the target when toggled.
    TargetVisibility(bool),
    /// An application-defined property.
    Custom { property: String, value: Value },
}

impl Message {
    /// Property names claimed by the built-in variants.
    pub const BUILTIN_PROPERTIES: [&'static str; 7] = [
        "process",
        "seconds",
        "timescaleMultiplier",
        "sessionSegments",
        "points",
        "log",
        "targetVisibility",
    ];

    /// The property name this message is published under.
    pub fn property(&self) -> &str {
        match self {
            Message::Process(_) => "process",
            Message::Seconds(_) => "seconds",
            Message::TimescaleMultiplier(_) => "timescaleMultiplier",
            Message::SessionSegments(_) => "sessionSegments",
            Message::Points(_) => "points",
            Message::Log(_) => "log",
            Message::TargetVisibility(_) => "targetVisibility",
            Message::Custom { property, .. } => property,
        }
    }

    /// Renders the payload as a generic [`Value`].
    pub fn value(&self) -> Value {
        match self {
            Message::Process(process) => Value::Text(process.as_str().to_string()),
            Message::Seconds(seconds) => Value::Number(*seconds as f64),
            Message::TimescaleMultiplier(n) => Value::Number(f64::from(*n)),
            Message::SessionSegments(segments) => Value::List(
                segments
                    .iter()
                    .map(|segment| {
                        let mut record = BTreeMap::new();
                        record.insert("start".to_string(), Value::Number(segment.start as f64));
                        record.insert(
                            "end".to_string(),
                            segment
                                .end
                                .map_or(Value::Null, |end| Value::Number(end as f64)),
                        );
                        Value::Record(record)
                    })
                    .collect(),
            ),
            Message::Points(points) => Value::Number(*points as f64),
            Message::Log(log) => {
                let mut record = BTreeMap::new();
                record.insert("entry".to_string(), Value::Text(log.entry.clone()));
                record.insert(
                    "cssClass".to_string(),
                    Value::Text(log.style.css_class().to_string()),
                );
                Value::Record(record)
            }
            Message::TargetVisibility(visible) => Value::Bool(*visible),
            Message::Custom { value, .. } => value.clone(),
        }
    }
}

/// A message as delivered to a receiver, tagged with the sender's name.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub sender: &'a str,
    pub message: &'a Message,
}

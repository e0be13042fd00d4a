//! The activity log.

use crate::broker::{Component, Context};
use crate::common::format_time;
use crate::components::timer::TIMER;
use crate::config::LoggerConfig;
use crate::error::Result;
use crate::events::{Envelope, LogStyle, Message};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tracing::debug;

/// Routing name of the logger.
pub const LOGGER: &str = "Logger";

/// One line of the activity log.
#[derive(Debug, Clone)]
pub struct LoggedEntry {
    /// Session time of the entry, as `mm:ss`.
    pub session_time: String,
    pub entry: String,
    pub style: LogStyle,
    pub recorded_at: DateTime<Local>,
}

impl LoggedEntry {
    /// The line as presented: `"mm:ss - entry"`.
    pub fn line(&self) -> String {
        format!("{} - {}", self.session_time, self.entry)
    }
}

/// Collects `log` messages, newest first.
#[derive(Debug)]
pub struct Logger {
    entries: VecDeque<LoggedEntry>,
    capacity: usize,
}

impl Logger {
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: config.capacity,
        }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LoggedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Component for Logger {
    fn name(&self) -> &str {
        LOGGER
    }

    fn receive(&mut self, envelope: Envelope<'_>, ctx: &mut Context<'_>) -> Result<()> {
        let Message::Log(log) = envelope.message else {
            return Ok(());
        };
        let seconds = ctx.peer(TIMER).and_then(|t| t.seconds()).unwrap_or(0);
        let logged = LoggedEntry {
            session_time: format_time(seconds),
            entry: log.entry.clone(),
            style: log.style,
            recorded_at: Local::now(),
        };
        debug!(from = envelope.sender, style = log.style.css_class(), "{}", logged.line());

        self.entries.push_front(logged);
        self.entries.truncate(self.capacity);
        Ok(())
    }
}

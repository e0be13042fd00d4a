//! Respawning items and their spawn gates.

use crate::broker::{Component, Context};
use crate::common::format_time;
use crate::components::timer::TIMER;
use crate::config::ItemConfig;
use crate::error::{ReflexError, Result};
use crate::events::{Envelope, LogEntry, LogStyle, Message, Process};
use tracing::debug;

/// Routing name of the item spawner.
pub const ITEMS: &str = "Items";

/// Styling hints for presenting an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStyling {
    pub background_color_class: String,
    pub background_image_class: String,
}

/// A collectible item with a spawn gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub presentation_name: String,
    pub id: String,
    pub spawn_interval_seconds: u64,
    /// Startup delay applied at the beginning of every session.
    pub start_spawn_time_seconds: u64,
    /// Session second from which the item accepts clicks.
    pub spawn_time_seconds: u64,
    pub styling: ItemStyling,
}

impl Item {
    fn from_config(config: &ItemConfig) -> Self {
        Self {
            presentation_name: config.presentation_name.clone(),
            id: config.id.clone(),
            spawn_interval_seconds: config.spawn_interval_seconds,
            start_spawn_time_seconds: config.start_spawn_time_seconds,
            spawn_time_seconds: config.start_spawn_time_seconds,
            styling: ItemStyling {
                background_color_class: config.background_color_class.clone(),
                background_image_class: config.background_image_class.clone(),
            },
        }
    }

    /// Whether a click at session second `now` gets through the gate.
    pub fn is_available(&self, now: u64) -> bool {
        now >= self.spawn_time_seconds
    }

    /// Points for a click `late` seconds after the spawn time: the full
    /// interval when on time, one less per late second, never below zero.
    pub fn points_for(&self, late: u64) -> u64 {
        self.spawn_interval_seconds - late.min(self.spawn_interval_seconds)
    }
}

/// How late an accepted click was, for log presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lateness {
    OnTime,
    Slight,
    Moderate,
    Late,
}

impl Lateness {
    pub fn classify(late: u64) -> Self {
        match late {
            0 => Lateness::OnTime,
            1..=3 => Lateness::Slight,
            4..=5 => Lateness::Moderate,
            _ => Lateness::Late,
        }
    }

    pub fn style(&self) -> LogStyle {
        match self {
            Lateness::OnTime => LogStyle::Blue,
            Lateness::Slight => LogStyle::Green,
            Lateness::Moderate => LogStyle::Yellow,
            Lateness::Late => LogStyle::Red,
        }
    }
}

/// The result of activating an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// No session is running; the activation did nothing.
    Ignored,
    /// The item was available.
    Collected { points: u64, lateness: Lateness },
    /// The item is still respawning.
    Early { seconds: u64 },
}

/// Owns every item and gates their clicks against session time.
#[derive(Debug)]
pub struct Items {
    items: Vec<Item>,
}

impl Items {
    pub fn new(configs: &[ItemConfig]) -> Self {
        Self {
            items: configs.iter().map(Item::from_config).collect(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Handles an activation of the item identified by `id`.
    pub fn click(&mut self, id: &str, ctx: &mut Context<'_>) -> Result<ItemOutcome> {
        let timer = ctx.peer(TIMER);
        if timer.and_then(|t| t.process()) != Some(Process::Start) {
            return Ok(ItemOutcome::Ignored);
        }
        let now = timer.and_then(|t| t.seconds()).unwrap_or(0);

        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| ReflexError::UnknownItem(id.to_string()))?;

        if !item.is_available(now) {
            let seconds = item.spawn_time_seconds - now;
            debug!(item = %item.id, seconds, "Item clicked early");
            ctx.send(Message::Log(LogEntry::new(
                format!("{} clicked {} seconds early", item.presentation_name, seconds),
                LogStyle::Grey,
            )));
            return Ok(ItemOutcome::Early { seconds });
        }

        let spawned_at = item.spawn_time_seconds;
        let late = now - spawned_at;
        item.spawn_time_seconds = now + item.spawn_interval_seconds;
        let points = item.points_for(late);
        let lateness = Lateness::classify(late);
        debug!(item = %item.id, late, points, next = item.spawn_time_seconds, "Item collected");

        ctx.send(Message::Points(points));
        ctx.send(Message::Log(LogEntry::new(
            format!(
                "{}: {} - {} = {} late",
                item.presentation_name,
                format_time(now),
                format_time(spawned_at),
                format_time(late)
            ),
            lateness.style(),
        )));
        Ok(ItemOutcome::Collected { points, lateness })
    }
}

impl Component for Items {
    fn name(&self) -> &str {
        ITEMS
    }

    fn receive(&mut self, envelope: Envelope<'_>, _ctx: &mut Context<'_>) -> Result<()> {
        if let Message::Process(Process::End) = envelope.message {
            for item in &mut self.items {
                item.spawn_time_seconds = item.start_spawn_time_seconds;
            }
        }
        Ok(())
    }
}

//! Wires the components of a game onto one broker.

use crate::broker::{Broker, Component, Handle};
use crate::components::items::{ItemOutcome, Items};
use crate::components::logger::Logger;
use crate::components::score::Score;
use crate::components::target::Target;
use crate::components::timer::Timer;
use crate::config::ReflexConfig;
use crate::error::Result;
use crate::time::{SharedTime, Tick, Ticker};
use tracing::info;

/// A fully wired game.
///
/// Owns the broker and a typed handle to every component, and exposes one
/// method per user control. Each method runs to completion, including the
/// whole fan-out it triggers, before returning.
pub struct Game {
    broker: Broker,
    timer: Handle<Timer>,
    score: Handle<Score>,
    target: Handle<Target>,
    items: Handle<Items>,
    logger: Handle<Logger>,
}

impl Game {
    /// Registers the components in the order Score, Target, Logger, Timer,
    /// Items. Delivery order follows registration order.
    pub fn new(config: &ReflexConfig, time: SharedTime, ticker: Box<dyn Ticker>) -> Result<Self> {
        let mut broker = Broker::new();
        let score = broker.register(Score::new(&config.score))?;
        let target = broker.register(Target::new(&config.target, time.clone()))?;
        let logger = broker.register(Logger::new(&config.logger))?;
        let timer = broker.register(Timer::new(time, ticker))?;
        let items = broker.register(Items::new(&config.items))?;
        info!(
            components = broker.components().count(),
            items = config.items.len(),
            "Game wired"
        );

        Ok(Self {
            broker,
            timer,
            score,
            target,
            items,
            logger,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        self.broker.act(&self.timer, |timer, ctx| timer.start(ctx))
    }

    pub fn pause(&mut self) -> Result<()> {
        self.broker.act(&self.timer, |timer, ctx| timer.pause(ctx))
    }

    pub fn stop(&mut self) -> Result<()> {
        self.broker.act(&self.timer, |timer, ctx| timer.stop(ctx))
    }

    pub fn set_timescale(&mut self, n: i64) -> Result<()> {
        self.broker
            .act(&self.timer, |timer, ctx| timer.set_timescale(n, ctx))
    }

    pub fn increase_timescale(&mut self) -> Result<()> {
        self.broker
            .act(&self.timer, |timer, ctx| timer.increase_timescale(ctx))
    }

    pub fn decrease_timescale(&mut self) -> Result<()> {
        self.broker
            .act(&self.timer, |timer, ctx| timer.decrease_timescale(ctx))
    }

    /// Feeds one ticker firing to the timer.
    pub fn tick(&mut self, tick: Tick) -> Result<()> {
        self.broker
            .act(&self.timer, |timer, ctx| timer.tick(tick, ctx))
    }

    /// Fires the currently armed tick, if any. Used with a manual ticker.
    pub fn advance(&mut self) -> Result<bool> {
        match self.timer().armed_tick() {
            Some(tick) => self.tick(tick).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn click_target(&mut self) -> Result<bool> {
        self.broker
            .act(&self.target, |target, ctx| target.click(ctx))
    }

    pub fn toggle_target(&mut self) -> Result<()> {
        self.broker
            .act(&self.target, |target, ctx| target.toggle_visibility(ctx))
    }

    pub fn click_item(&mut self, id: &str) -> Result<ItemOutcome> {
        self.broker.act(&self.items, |items, ctx| items.click(id, ctx))
    }

    pub fn clear_log(&mut self) -> Result<()> {
        self.broker.act(&self.logger, |logger, _ctx| {
            logger.clear();
            Ok(())
        })
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn timer(&self) -> &Timer {
        self.component(&self.timer)
    }

    pub fn score(&self) -> &Score {
        self.component(&self.score)
    }

    pub fn target(&self) -> &Target {
        self.component(&self.target)
    }

    pub fn items(&self) -> &Items {
        self.component(&self.items)
    }

    pub fn logger(&self) -> &Logger {
        self.component(&self.logger)
    }

    fn component<C: Component>(&self, handle: &Handle<C>) -> &C {
        match self.broker.inspect(handle) {
            Ok(component) => component,
            // Handles are created by `new` on this broker with these types.
            Err(err) => unreachable!("game handle out of sync with its broker: {err}"),
        }
    }
}

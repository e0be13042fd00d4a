//! The randomized target and its click-latency statistics.

use crate::broker::{Component, Context, PeerState};
use crate::components::timer::TIMER;
use crate::config::TargetConfig;
use crate::error::Result;
use crate::events::{Envelope, Message, Process};
use crate::stats::ClickStats;
use crate::time::SharedTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Routing name of the target.
pub const TARGET: &str = "Target";

/// Position and size of the target on the presentation surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub left: u32,
    pub top: u32,
    pub side: u32,
}

/// The clickable target.
pub struct Target {
    config: TargetConfig,
    geometry: Geometry,
    visible: bool,
    stats: ClickStats,
    time: SharedTime,
    rng: StdRng,
}

impl Target {
    pub fn new(config: &TargetConfig, time: SharedTime) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            geometry: default_geometry(config),
            config: config.clone(),
            visible: true,
            stats: ClickStats::new(),
            time,
            rng,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn stats(&self) -> &ClickStats {
        &self.stats
    }

    /// Average accepted-click interval in milliseconds.
    pub fn average_click(&self) -> i64 {
        self.stats.average()
    }

    /// Handles an activation of the target. Returns whether it was accepted.
    pub fn click(&mut self, ctx: &mut Context<'_>) -> Result<bool> {
        if !is_running(ctx.peer(TIMER)) || !self.visible {
            debug!(visible = self.visible, "Target click ignored");
            return Ok(false);
        }
        self.record_click(ctx)?;
        self.randomize();
        ctx.send(Message::Points(self.config.points_value));
        Ok(true)
    }

    /// Flips visibility. While running, the toggle also counts as a click time.
    pub fn toggle_visibility(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if is_running(ctx.peer(TIMER)) {
            self.record_click(ctx)?;
        }
        self.visible = !self.visible;
        ctx.send(Message::TargetVisibility(self.visible));
        Ok(())
    }

    fn record_click(&mut self, ctx: &Context<'_>) -> Result<()> {
        let segments = ctx
            .peer(TIMER)
            .and_then(PeerState::segments)
            .unwrap_or_default();
        if let Some(interval) = self.stats.record(self.time.now(), segments)? {
            debug!(interval, average = self.stats.average(), "Click interval recorded");
        }
        Ok(())
    }

    /// Draws a new size in `[side / 2, side * 3 + side / 2)`, then a new
    /// position that keeps the target inside the viewport.
    fn randomize(&mut self) {
        let base = f64::from(self.config.side);
        let side = (self.rng.gen::<f64>() * base * 3.0 + base / 2.0).floor() as u32;
        self.geometry = Geometry {
            left: self.random_offset(self.config.viewport_width, side),
            top: self.random_offset(self.config.viewport_height, side),
            side,
        };
    }

    fn random_offset(&mut self, extent: u32, side: u32) -> u32 {
        let room = extent.saturating_sub(side * 2);
        let offset = if room == 0 {
            0
        } else {
            self.rng.gen_range(0..room)
        };
        offset + side
    }

    fn reset(&mut self, ctx: &mut Context<'_>) {
        self.stats.reset();
        self.geometry = default_geometry(&self.config);
        if !self.visible {
            self.visible = true;
            ctx.send(Message::TargetVisibility(true));
        }
    }
}

fn default_geometry(config: &TargetConfig) -> Geometry {
    Geometry {
        left: config.left,
        top: config.top,
        side: config.side,
    }
}

fn is_running(timer: Option<&PeerState>) -> bool {
    timer.and_then(PeerState::process) == Some(Process::Start)
}

impl Component for Target {
    fn name(&self) -> &str {
        TARGET
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.send(Message::TargetVisibility(self.visible));
        Ok(())
    }

    fn receive(&mut self, envelope: Envelope<'_>, ctx: &mut Context<'_>) -> Result<()> {
        let Message::Process(process) = envelope.message else {
            return Ok(());
        };
        match process {
            Process::Start => {
                if self.stats.pending() == 0 && self.visible && self.config.seed_click_on_start {
                    self.record_click(ctx)?;
                }
                self.randomize();
            }
            Process::Pause => self.randomize(),
            Process::End => self.reset(ctx),
        }
        Ok(())
    }
}

//! The timer component: the bus-facing owner of the session clock.

use crate::broker::{Component, Context};
use crate::clock::{ClockEvent, RunState, SessionClock};
use crate::error::Result;
use crate::events::{Envelope, Message};
use crate::time::{SharedTime, Tick, Ticker};
use tracing::{info, trace};

/// Routing name of the timer.
pub const TIMER: &str = "Timer";

/// Drives the session clock from user controls and ticker firings, and
/// publishes every change to the bus.
pub struct Timer {
    clock: SessionClock,
    time: SharedTime,
    ticker: Box<dyn Ticker>,
    /// Generation of the live ticker schedule, if armed.
    armed: Option<u64>,
}

impl Timer {
    pub fn new(time: SharedTime, ticker: Box<dyn Ticker>) -> Self {
        Self {
            clock: SessionClock::new(),
            time,
            ticker,
            armed: None,
        }
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn run_state(&self) -> RunState {
        self.clock.run_state()
    }

    /// The tick that would currently be accepted, if the ticker is armed.
    pub fn armed_tick(&self) -> Option<Tick> {
        self.armed.map(|generation| Tick { generation })
    }

    pub fn start(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let events = self.clock.start(self.time.now())?;
        if !events.is_empty() {
            info!(seconds = self.clock.elapsed_seconds(), "Session running");
        }
        self.apply(events, ctx);
        Ok(())
    }

    pub fn pause(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let events = self.clock.pause(self.time.now())?;
        if !events.is_empty() {
            info!(seconds = self.clock.elapsed_seconds(), "Session paused");
        }
        self.apply(events, ctx);
        Ok(())
    }

    pub fn stop(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if self.clock.run_state() != RunState::Stopped {
            info!(seconds = self.clock.elapsed_seconds(), "Session ended");
        }
        let events = self.clock.stop();
        self.apply(events, ctx);
        Ok(())
    }

    pub fn set_timescale(&mut self, n: i64, ctx: &mut Context<'_>) -> Result<()> {
        let events = self.clock.set_timescale(n);
        self.apply(events, ctx);
        Ok(())
    }

    pub fn increase_timescale(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let next = i64::from(self.clock.timescale()) + 1;
        self.set_timescale(next, ctx)
    }

    pub fn decrease_timescale(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let next = i64::from(self.clock.timescale()) - 1;
        self.set_timescale(next, ctx)
    }

    /// Handles one ticker firing. Ticks from a cancelled or replaced schedule
    /// are dropped.
    pub fn tick(&mut self, tick: Tick, ctx: &mut Context<'_>) -> Result<()> {
        if self.armed != Some(tick.generation) {
            trace!(generation = tick.generation, armed = ?self.armed, "Dropping stale tick");
            return Ok(());
        }
        let events = self.clock.tick();
        self.apply(events, ctx);
        Ok(())
    }

    fn apply(&mut self, events: Vec<ClockEvent>, ctx: &mut Context<'_>) {
        for event in events {
            match event {
                ClockEvent::ScheduleTicker(period) => {
                    self.armed = Some(self.ticker.schedule(period));
                }
                ClockEvent::CancelTicker => {
                    self.ticker.cancel();
                    self.armed = None;
                }
                ClockEvent::Process(process) => ctx.send(Message::Process(process)),
                ClockEvent::Seconds(seconds) => ctx.send(Message::Seconds(seconds)),
                ClockEvent::Timescale(n) => ctx.send(Message::TimescaleMultiplier(n)),
                ClockEvent::SegmentsChanged => {
                    ctx.send(Message::SessionSegments(self.clock.segments().to_vec()))
                }
            }
        }
    }
}

impl Component for Timer {
    fn name(&self) -> &str {
        TIMER
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.send(Message::Seconds(self.clock.elapsed_seconds()));
        ctx.send(Message::TimescaleMultiplier(self.clock.timescale()));
        ctx.send(Message::SessionSegments(Vec::new()));
        Ok(())
    }

    fn receive(&mut self, _envelope: Envelope<'_>, _ctx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Broker, Handle};
    use crate::events::Process;
    use crate::time::{ManualTicker, ManualTime};
    use std::sync::Arc;

    fn setup() -> (Broker, Handle<Timer>, Arc<ManualTime>) {
        let time = Arc::new(ManualTime::new(0));
        let mut broker = Broker::new();
        let timer = broker
            .register(Timer::new(time.clone(), Box::new(ManualTicker::new())))
            .unwrap();
        (broker, timer, time)
    }

    fn tick(broker: &mut Broker, timer: &Handle<Timer>) {
        broker
            .act(timer, |t, ctx| match t.armed_tick() {
                Some(tick) => t.tick(tick, ctx),
                None => Ok(()),
            })
            .unwrap();
    }

    #[test]
    fn initialize_publishes_the_stopped_state() {
        let (broker, _timer, _time) = setup();
        let state = broker.state_of(TIMER).unwrap();
        assert_eq!(state.seconds(), Some(0));
        assert_eq!(state.timescale(), Some(1));
        assert_eq!(state.segments(), Some(&[][..]));
        assert_eq!(state.process(), None);
    }

    #[test]
    fn start_pause_publish_process_and_segments() {
        let (mut broker, timer, time) = setup();
        time.set(1_000);
        broker.act(&timer, |t, ctx| t.start(ctx)).unwrap();
        assert_eq!(broker.state_of(TIMER).unwrap().process(), Some(Process::Start));

        time.set(4_000);
        broker.act(&timer, |t, ctx| t.pause(ctx)).unwrap();
        let state = broker.state_of(TIMER).unwrap();
        assert_eq!(state.process(), Some(Process::Pause));
        let segments = state.segments().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 1_000);
        assert_eq!(segments[0].end, Some(4_000));
        assert!(broker.inspect(&timer).unwrap().armed_tick().is_none());
    }

    #[test]
    fn ticks_publish_seconds() {
        let (mut broker, timer, _time) = setup();
        broker.act(&timer, |t, ctx| t.start(ctx)).unwrap();
        for _ in 0..3 {
            tick(&mut broker, &timer);
        }
        assert_eq!(broker.state_of(TIMER).unwrap().seconds(), Some(3));
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let (mut broker, timer, _time) = setup();
        broker.act(&timer, |t, ctx| t.start(ctx)).unwrap();
        let stale = broker.inspect(&timer).unwrap().armed_tick().unwrap();
        broker.act(&timer, |t, ctx| t.set_timescale(2, ctx)).unwrap();

        broker.act(&timer, |t, ctx| t.tick(stale, ctx)).unwrap();
        assert_eq!(broker.inspect(&timer).unwrap().clock().elapsed_seconds(), 0);

        tick(&mut broker, &timer);
        assert_eq!(broker.inspect(&timer).unwrap().clock().elapsed_seconds(), 1);
    }

    #[test]
    fn timescale_steps_never_go_below_one() {
        let (mut broker, timer, _time) = setup();
        broker.act(&timer, |t, ctx| t.decrease_timescale(ctx)).unwrap();
        assert_eq!(broker.state_of(TIMER).unwrap().timescale(), Some(1));
        broker.act(&timer, |t, ctx| t.increase_timescale(ctx)).unwrap();
        broker.act(&timer, |t, ctx| t.increase_timescale(ctx)).unwrap();
        assert_eq!(broker.state_of(TIMER).unwrap().timescale(), Some(3));
    }

    #[test]
    fn stop_resets_published_state() {
        let (mut broker, timer, _time) = setup();
        broker.act(&timer, |t, ctx| t.start(ctx)).unwrap();
        broker.act(&timer, |t, ctx| t.set_timescale(4, ctx)).unwrap();
        tick(&mut broker, &timer);
        broker.act(&timer, |t, ctx| t.stop(ctx)).unwrap();

        let state = broker.state_of(TIMER).unwrap();
        assert_eq!(state.process(), Some(Process::End));
        assert_eq!(state.seconds(), Some(0));
        assert_eq!(state.timescale(), Some(1));
        assert_eq!(state.segments(), Some(&[][..]));
    }
}

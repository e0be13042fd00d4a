//! The session clock: run state, elapsed seconds, timescale and the list of
//! active session segments.
//!
//! [`SessionClock`] is a pure state machine. Each transition validates,
//! mutates, and returns the [`ClockEvent`]s describing what changed; the
//! [`Timer`](crate::components::timer::Timer) component turns those into
//! ticker commands and bus publications.

use crate::common::Millis;
use crate::error::{ReflexError, Result};
use crate::events::Process;
use std::time::Duration;

/// The shortest real time between two ticks, whatever the timescale.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// A contiguous stretch of real time during which the session was running.
///
/// `end` is `None` while the segment is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: Millis,
    pub end: Option<Millis>,
}

/// The run state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Something a clock transition changed or asks its owner to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockEvent {
    /// (Re)arm the repeating ticker at this period.
    ScheduleTicker(Duration),
    /// Disarm the repeating ticker.
    CancelTicker,
    Process(Process),
    Seconds(u64),
    Timescale(u32),
    /// The segment list changed; the owner publishes a fresh snapshot.
    SegmentsChanged,
}

/// An ordered list of session segments.
///
/// At most the last segment is open, and it is open exactly while the session
/// is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSegments {
    segments: Vec<Segment>,
}

impl SessionSegments {
    /// Opens a new segment at `at`. Fails if the last segment is still open.
    pub fn open(&mut self, at: Millis) -> Result<()> {
        if self.is_open() {
            return Err(ReflexError::InvalidSegmentState(
                "cannot open a segment while the previous one is open",
            ));
        }
        self.segments.push(Segment {
            start: at,
            end: None,
        });
        Ok(())
    }

    /// Closes the open segment at `at`. Fails if no segment is open.
    pub fn close(&mut self, at: Millis) -> Result<()> {
        match self.segments.last_mut() {
            Some(segment) if segment.end.is_none() => {
                segment.end = Some(at);
                Ok(())
            }
            _ => Err(ReflexError::InvalidSegmentState(
                "cannot close a segment when none is open",
            )),
        }
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn is_open(&self) -> bool {
        matches!(self.segments.last(), Some(segment) if segment.end.is_none())
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }
}

/// Canonical session timing state.
#[derive(Debug, Clone)]
pub struct SessionClock {
    run_state: RunState,
    elapsed_seconds: u64,
    timescale: u32,
    segments: SessionSegments,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self {
            run_state: RunState::Stopped,
            elapsed_seconds: 0,
            timescale: 1,
            segments: SessionSegments::default(),
        }
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn timescale(&self) -> u32 {
        self.timescale
    }

    pub fn segments(&self) -> &[Segment] {
        self.segments.as_slice()
    }

    /// Real time between two increments of the elapsed seconds. Never shorter
    /// than [`MIN_TICK_PERIOD`].
    pub fn tick_period(&self) -> Duration {
        (Duration::from_secs(1) / self.timescale).max(MIN_TICK_PERIOD)
    }

    /// Stopped or Paused → Running. Every entry into Running opens a new segment.
    pub fn start(&mut self, now: Millis) -> Result<Vec<ClockEvent>> {
        if self.run_state == RunState::Running {
            return Ok(Vec::new());
        }
        self.segments.open(now)?;
        self.run_state = RunState::Running;
        Ok(vec![
            ClockEvent::ScheduleTicker(self.tick_period()),
            ClockEvent::Process(Process::Start),
            ClockEvent::SegmentsChanged,
        ])
    }

    /// Running → Paused. A no-op in any other state.
    pub fn pause(&mut self, now: Millis) -> Result<Vec<ClockEvent>> {
        if self.run_state != RunState::Running {
            return Ok(Vec::new());
        }
        self.segments.close(now)?;
        self.run_state = RunState::Paused;
        Ok(vec![
            ClockEvent::CancelTicker,
            ClockEvent::Process(Process::Pause),
            ClockEvent::SegmentsChanged,
        ])
    }

    /// Any state → Stopped, resetting seconds, timescale and segments.
    pub fn stop(&mut self) -> Vec<ClockEvent> {
        let was_stopped = self.run_state == RunState::Stopped;
        let old_timescale = self.timescale;

        self.run_state = RunState::Stopped;
        self.elapsed_seconds = 0;
        self.timescale = 1;
        self.segments.clear();

        let mut events = vec![ClockEvent::CancelTicker];
        if !was_stopped {
            events.push(ClockEvent::Process(Process::End));
        }
        events.push(ClockEvent::Seconds(0));
        if old_timescale != 1 {
            events.push(ClockEvent::Timescale(1));
        }
        events.push(ClockEvent::SegmentsChanged);
        events
    }

    /// Advances the elapsed seconds by one. Ignored unless running.
    pub fn tick(&mut self) -> Vec<ClockEvent> {
        if self.run_state != RunState::Running {
            return Vec::new();
        }
        self.elapsed_seconds += 1;
        vec![ClockEvent::Seconds(self.elapsed_seconds)]
    }

    /// Sets the timescale multiplier. Values of zero or below are ignored.
    pub fn set_timescale(&mut self, n: i64) -> Vec<ClockEvent> {
        let Ok(n) = u32::try_from(n) else {
            return Vec::new();
        };
        if n == 0 {
            return Vec::new();
        }
        let old = self.timescale;
        self.timescale = n;

        let mut events = Vec::new();
        if self.run_state == RunState::Running {
            events.push(ClockEvent::ScheduleTicker(self.tick_period()));
        }
        if old != n {
            events.push(ClockEvent::Timescale(n));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Start,
        Pause,
        Stop,
    }

    fn apply(clock: &mut SessionClock, op: Op, now: Millis) {
        match op {
            Op::Start => {
                clock.start(now).unwrap();
            }
            Op::Pause => {
                clock.pause(now).unwrap();
            }
            Op::Stop => {
                clock.stop();
            }
        }
    }

    fn assert_segment_invariant(clock: &SessionClock) {
        let segments = clock.segments();
        let open = segments.iter().filter(|s| s.end.is_none()).count();
        assert!(open <= 1, "more than one open segment: {:?}", segments);
        if open == 1 {
            assert!(segments.last().unwrap().end.is_none());
        }
        assert_eq!(open == 1, clock.run_state() == RunState::Running);
    }

    #[test]
    fn segment_invariant_holds_for_all_short_sequences() {
        let ops = [Op::Start, Op::Pause, Op::Stop];
        // Every sequence of length 5 over {start, pause, stop}.
        for code in 0..3usize.pow(5) {
            let mut clock = SessionClock::new();
            let mut c = code;
            for step in 0..5 {
                apply(&mut clock, ops[c % 3], step * 100);
                c /= 3;
                assert_segment_invariant(&clock);
            }
        }
    }

    #[test]
    fn start_opens_segment_and_schedules_ticker() {
        let mut clock = SessionClock::new();
        let events = clock.start(5).unwrap();
        assert_eq!(
            events,
            vec![
                ClockEvent::ScheduleTicker(Duration::from_secs(1)),
                ClockEvent::Process(Process::Start),
                ClockEvent::SegmentsChanged,
            ]
        );
        assert_eq!(clock.segments(), &[Segment { start: 5, end: None }]);
        assert!(clock.start(6).unwrap().is_empty());
    }

    #[test]
    fn resume_opens_a_new_segment() {
        let mut clock = SessionClock::new();
        clock.start(0).unwrap();
        clock.pause(1000).unwrap();
        clock.start(4000).unwrap();
        assert_eq!(
            clock.segments(),
            &[
                Segment {
                    start: 0,
                    end: Some(1000)
                },
                Segment {
                    start: 4000,
                    end: None
                },
            ]
        );
    }

    #[test]
    fn pause_when_not_running_is_a_no_op() {
        let mut clock = SessionClock::new();
        assert!(clock.pause(10).unwrap().is_empty());
        clock.start(0).unwrap();
        clock.pause(10).unwrap();
        assert!(clock.pause(20).unwrap().is_empty());
        assert_eq!(clock.run_state(), RunState::Paused);
    }

    #[test]
    fn stop_resets_everything_and_announces_end() {
        let mut clock = SessionClock::new();
        clock.start(0).unwrap();
        clock.tick();
        clock.tick();
        clock.set_timescale(3);

        let events = clock.stop();
        assert_eq!(
            events,
            vec![
                ClockEvent::CancelTicker,
                ClockEvent::Process(Process::End),
                ClockEvent::Seconds(0),
                ClockEvent::Timescale(1),
                ClockEvent::SegmentsChanged,
            ]
        );
        assert_eq!(clock.elapsed_seconds(), 0);
        assert_eq!(clock.timescale(), 1);
        assert!(clock.segments().is_empty());
    }

    #[test]
    fn stop_while_stopped_does_not_announce_end() {
        let mut clock = SessionClock::new();
        let events = clock.stop();
        assert!(!events.contains(&ClockEvent::Process(Process::End)));
        assert!(events.contains(&ClockEvent::Seconds(0)));
    }

    #[test]
    fn ticks_only_count_while_running() {
        let mut clock = SessionClock::new();
        assert!(clock.tick().is_empty());
        clock.start(0).unwrap();
        assert_eq!(clock.tick(), vec![ClockEvent::Seconds(1)]);
        clock.pause(10).unwrap();
        assert!(clock.tick().is_empty());
        assert_eq!(clock.elapsed_seconds(), 1);
    }

    #[test]
    fn timescale_change_preserves_elapsed_seconds() {
        for n in 1..=8 {
            let mut clock = SessionClock::new();
            clock.start(0).unwrap();
            for _ in 0..7 {
                clock.tick();
            }
            let segments = clock.segments().to_vec();
            let events = clock.set_timescale(n);
            assert_eq!(clock.elapsed_seconds(), 7);
            assert_eq!(clock.segments(), segments.as_slice());
            assert_eq!(
                events[0],
                ClockEvent::ScheduleTicker(Duration::from_secs(1) / n as u32)
            );
        }
    }

    #[test]
    fn non_positive_timescale_is_ignored() {
        let mut clock = SessionClock::new();
        assert!(clock.set_timescale(0).is_empty());
        assert!(clock.set_timescale(-2).is_empty());
        assert_eq!(clock.timescale(), 1);
    }

    #[test]
    fn huge_timescale_keeps_a_millisecond_tick_period() {
        let mut clock = SessionClock::new();
        clock.start(0).unwrap();
        let events = clock.set_timescale(2_000_000_000);
        assert_eq!(clock.timescale(), 2_000_000_000);
        assert_eq!(clock.tick_period(), MIN_TICK_PERIOD);
        assert_eq!(events[0], ClockEvent::ScheduleTicker(MIN_TICK_PERIOD));

        clock.set_timescale(1_000);
        assert_eq!(clock.tick_period(), Duration::from_millis(1));
        clock.set_timescale(999);
        assert!(clock.tick_period() > MIN_TICK_PERIOD);
    }

    #[test]
    fn timescale_publishes_only_on_change_and_reschedules_only_while_running() {
        let mut clock = SessionClock::new();
        assert_eq!(clock.set_timescale(2), vec![ClockEvent::Timescale(2)]);
        assert!(clock.set_timescale(2).is_empty());
        clock.start(0).unwrap();
        assert_eq!(
            clock.set_timescale(2),
            vec![ClockEvent::ScheduleTicker(Duration::from_millis(500))]
        );
    }

    #[test]
    fn segment_list_rejects_invalid_transitions() {
        let mut segments = SessionSegments::default();
        assert!(matches!(
            segments.close(1),
            Err(ReflexError::InvalidSegmentState(_))
        ));
        segments.open(1).unwrap();
        assert!(matches!(
            segments.open(2),
            Err(ReflexError::InvalidSegmentState(_))
        ));
        segments.close(3).unwrap();
        assert!(segments.close(4).is_err());
    }
}

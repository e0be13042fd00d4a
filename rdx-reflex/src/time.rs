//! The engine's seams to real time: a monotonic clock source and a repeating
//! ticker that can be cancelled and re-armed at a new period.

use crate::common::Millis;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// A monotonic, millisecond-resolution source of "now".
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Millis;
}

/// A time source shared between components.
pub type SharedTime = Arc<dyn TimeSource>;

/// Milliseconds elapsed since the source was created.
///
/// Built on `tokio::time::Instant`, so it follows paused time in tests.
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Millis {
        to_millis(self.origin.elapsed())
    }
}

/// Whole milliseconds in `duration`, saturating at `Millis::MAX`.
fn to_millis(duration: Duration) -> Millis {
    Millis::try_from(duration.as_millis()).unwrap_or(Millis::MAX)
}

/// A time source that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualTime {
    now: AtomicU64,
}

impl ManualTime {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, by: Millis) {
        self.now.fetch_add(by, Ordering::SeqCst);
    }

    pub fn set(&self, to: Millis) {
        self.now.store(to, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// One firing of a ticker, tagged with the schedule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tick {
    pub generation: u64,
}

/// A repeating timer primitive.
///
/// `schedule` always cancels whatever was scheduled before, so there is never
/// more than one live schedule. Each schedule gets a fresh generation number;
/// ticks carrying an older generation are stale.
pub trait Ticker: Send {
    fn schedule(&mut self, period: Duration) -> u64;
    fn cancel(&mut self);
}

/// A ticker backed by a tokio task per schedule.
///
/// Ticks are delivered on the unbounded channel handed to [`TokioTicker::new`];
/// whoever owns the receiving end feeds them back into the timer.
pub struct TokioTicker {
    sender: mpsc::UnboundedSender<Tick>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl TokioTicker {
    pub fn new(sender: mpsc::UnboundedSender<Tick>) -> Self {
        Self {
            sender,
            task: None,
            generation: 0,
        }
    }

    /// Creates a ticker together with the receiving end of its tick channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl Ticker for TokioTicker {
    fn schedule(&mut self, period: Duration) -> u64 {
        self.cancel();
        self.generation += 1;
        let tick = Tick {
            generation: self.generation,
        };
        let sender = self.sender.clone();
        trace!(generation = tick.generation, ?period, "Ticker scheduled");
        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(tick).is_err() {
                    break;
                }
            }
        }));
        self.generation
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            trace!(generation = self.generation, "Ticker cancelled");
        }
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A ticker that never fires by itself; the owner drives ticks explicitly.
#[derive(Debug, Default)]
pub struct ManualTicker {
    generation: u64,
    period: Option<Duration>,
    schedules: u32,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The period of the live schedule, if any.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// How many times `schedule` has been called.
    pub fn schedules(&self) -> u32 {
        self.schedules
    }
}

impl Ticker for ManualTicker {
    fn schedule(&mut self, period: Duration) -> u64 {
        self.generation += 1;
        self.period = Some(period);
        self.schedules += 1;
        self.generation
    }

    fn cancel(&mut self) {
        self.period = None;
    }
}

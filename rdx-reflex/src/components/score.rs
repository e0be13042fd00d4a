//! The score aggregator.

use crate::broker::{Component, Context};
use crate::common::pad;
use crate::components::timer::TIMER;
use crate::config::ScoreConfig;
use crate::error::Result;
use crate::events::{Envelope, Message, Process};
use tracing::debug;

/// Routing name of the score component.
pub const SCORE: &str = "Score";

/// Keeps the session score and the high score for the life of the process.
#[derive(Debug)]
pub struct Score {
    session: u64,
    high: u64,
    padded_length: usize,
}

impl Score {
    pub fn new(config: &ScoreConfig) -> Self {
        Self {
            session: 0,
            high: 0,
            padded_length: config.padded_length,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    /// The session score, zero-padded for display.
    pub fn session_text(&self) -> String {
        pad(self.session, self.padded_length)
    }

    /// The high score, zero-padded for display.
    pub fn high_text(&self) -> String {
        pad(self.high, self.padded_length)
    }

    fn set_session(&mut self, session: u64) {
        self.session = session;
        if self.session > self.high {
            self.high = self.session;
        }
    }
}

impl Component for Score {
    fn name(&self) -> &str {
        SCORE
    }

    fn receive(&mut self, envelope: Envelope<'_>, ctx: &mut Context<'_>) -> Result<()> {
        match envelope.message {
            Message::Points(points) => {
                let timescale = ctx
                    .peer(TIMER)
                    .and_then(|timer| timer.timescale())
                    .unwrap_or(1);
                let awarded = points * u64::from(timescale);
                self.set_session(self.session + awarded);
                debug!(from = envelope.sender, points, timescale, session = self.session, "Points awarded");
            }
            Message::Process(Process::End) => self.set_session(0),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use crate::events::Value;

    /// Stands in for the timer by publishing under its name.
    struct FakeTimer;

    impl Component for FakeTimer {
        fn name(&self) -> &str {
            TIMER
        }

        fn receive(&mut self, _envelope: Envelope<'_>, _ctx: &mut Context<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn setup() -> (Broker, crate::broker::Handle<Score>) {
        let mut broker = Broker::new();
        let score = broker.register(Score::new(&ScoreConfig::default())).unwrap();
        broker.register(FakeTimer).unwrap();
        (broker, score)
    }

    #[test]
    fn points_are_scaled_by_the_mirrored_timescale() {
        let (mut broker, score) = setup();
        broker.publish_as(TIMER, Message::Points(2)).unwrap();
        assert_eq!(broker.inspect(&score).unwrap().session(), 2);

        broker
            .publish_as(TIMER, Message::TimescaleMultiplier(3))
            .unwrap();
        broker.publish_as(TIMER, Message::Points(2)).unwrap();
        assert_eq!(broker.inspect(&score).unwrap().session(), 8);
    }

    #[test]
    fn end_resets_session_but_keeps_high() {
        let (mut broker, score) = setup();
        broker.publish_as(TIMER, Message::Points(22)).unwrap();
        broker
            .publish_as(TIMER, Message::Process(Process::End))
            .unwrap();
        broker.publish_as(TIMER, Message::Points(5)).unwrap();

        let score = broker.inspect(&score).unwrap();
        assert_eq!(score.session(), 5);
        assert_eq!(score.high(), 22);
        assert_eq!(score.session_text(), "000005");
        assert_eq!(score.high_text(), "000022");
    }

    #[test]
    fn unrelated_messages_are_only_mirrored() {
        let (mut broker, score) = setup();
        broker
            .publish_as(
                TIMER,
                Message::Custom {
                    property: "combo".to_string(),
                    value: Value::Number(4.0),
                },
            )
            .unwrap();
        assert_eq!(broker.inspect(&score).unwrap().session(), 0);
        let mirror = broker.mirror_of(SCORE).unwrap();
        assert!(mirror.peer(TIMER).unwrap().get("combo").is_some());
    }
}

//! Frame-driven cadence for the world's subsystems.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::TickSummary;
use crate::config::CadenceConfig;
use crate::world::World;

/// Wall-clock length of one frame.
pub const FRAME_PERIOD: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Render,
    Step,
    Bubbles,
    Autobuy,
}

/// One registered subsystem and the frame it next becomes eligible on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    pub subsystem: Subsystem,
    pub interval: u64,
    pub next_frame: u64,
}

/// What ran during a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub ran: Vec<Subsystem>,
    /// Present when the world stepped this frame.
    pub tick: Option<TickSummary>,
}

/// Runs subsystems in registration order, each on its own frame interval.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    tickers: Vec<Ticker>,
    frame: u64,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register render, step, bubbles and autobuy in that order, skipping zero intervals.
    #[must_use]
    pub fn from_cadence(cadence: &CadenceConfig) -> Self {
        let mut scheduler = Self::new();
        scheduler.register(Subsystem::Render, cadence.render);
        scheduler.register(Subsystem::Step, cadence.step);
        scheduler.register(Subsystem::Bubbles, cadence.bubbles);
        scheduler.register(Subsystem::Autobuy, cadence.autobuy);
        scheduler
    }

    /// Add a subsystem due on the current frame. Returns false for a zero interval.
    pub fn register(&mut self, subsystem: Subsystem, interval: u64) -> bool {
        if interval == 0 {
            return false;
        }
        self.tickers.push(Ticker {
            subsystem,
            interval,
            next_frame: self.frame,
        });
        true
    }

    #[must_use]
    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Frames run so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Run every due subsystem once, then advance the frame counter.
    pub fn run_frame(&mut self, world: &mut World) -> FrameReport {
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };
        for ticker in &mut self.tickers {
            if self.frame < ticker.next_frame {
                continue;
            }
            match ticker.subsystem {
                Subsystem::Render => world.render(),
                Subsystem::Step => report.tick = Some(world.step()),
                Subsystem::Bubbles => {
                    world.check_bubbles();
                }
                Subsystem::Autobuy => {
                    world.autobuy();
                }
            }
            ticker.next_frame += ticker.interval;
            report.ran.push(ticker.subsystem);
        }
        self.frame += 1;
        report
    }
}

/// Paces frames against the wall clock.
///
/// A poll that finds one or more periods elapsed reports a single due frame and drops the
/// backlog, so a stalled host never replays missed frames in a burst.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    period: Duration,
    last: Instant,
}

impl FrameClock {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self::with_period(FRAME_PERIOD, now)
    }

    #[must_use]
    pub fn with_period(period: Duration, now: Instant) -> Self {
        Self { period, last: now }
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last);
        if elapsed < self.period {
            return false;
        }
        if self.period.is_zero() {
            self.last = now;
            return true;
        }
        let periods = elapsed.as_nanos() / self.period.as_nanos();
        let skipped = u32::try_from(periods).unwrap_or(u32::MAX);
        self.last += self.period.saturating_mul(skipped);
        true
    }

    /// Time left until the next frame is due.
    #[must_use]
    pub fn until_next(&self, now: Instant) -> Duration {
        (self.last + self.period).saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::AquariumConfig;

    fn world() -> World {
        let config = AquariumConfig {
            rng_seed: Some(17),
            ..AquariumConfig::default()
        };
        World::new(config, Catalog::default()).expect("world")
    }

    #[test]
    fn subsystems_run_on_their_cadence() {
        let mut scheduler = FrameScheduler::from_cadence(&CadenceConfig::default());
        assert_eq!(scheduler.tickers().len(), 3);
        let mut world = world();
        let mut steps = 0;
        let mut renders = 0;
        let mut bubble_checks = 0;
        for _ in 0..60 {
            let report = scheduler.run_frame(&mut world);
            steps += usize::from(report.tick.is_some());
            renders += report.ran.iter().filter(|s| **s == Subsystem::Render).count();
            bubble_checks += report.ran.iter().filter(|s| **s == Subsystem::Bubbles).count();
        }
        assert_eq!(scheduler.frame(), 60);
        assert_eq!(renders, 30);
        assert_eq!(steps, 6);
        assert_eq!(bubble_checks, 2);
        assert_eq!(world.tick().0, 6);
    }

    #[test]
    fn first_frame_runs_in_registration_order() {
        let mut scheduler = FrameScheduler::from_cadence(&CadenceConfig {
            autobuy: 20,
            ..CadenceConfig::default()
        });
        let report = scheduler.run_frame(&mut world());
        assert_eq!(
            report.ran,
            vec![
                Subsystem::Render,
                Subsystem::Step,
                Subsystem::Bubbles,
                Subsystem::Autobuy
            ]
        );
        assert_eq!(report.frame, 0);
    }

    #[test]
    fn clock_drops_backlog() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start);
        assert!(!clock.poll(start + Duration::from_millis(19)));
        assert!(clock.poll(start + Duration::from_millis(75)));
        assert!(!clock.poll(start + Duration::from_millis(79)));
        assert!(clock.poll(start + Duration::from_millis(80)));
        assert_eq!(
            clock.until_next(start + Duration::from_millis(85)),
            Duration::from_millis(15)
        );
    }
}

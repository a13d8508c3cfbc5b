//! Periodic tick sources and the main loop event type.
//!
//! Tickers are driven with explicit instants so the loop (and tests) decide
//! what "now" is; nothing here sleeps.

use std::time::{Duration, Instant};
use x11rb::protocol::Event;

use crate::tray::TrayCommand;

/// Everything that can wake the main loop. Producers on other threads send
/// these over one channel so window state is only touched on the main thread.
#[derive(Debug)]
pub enum LoopEvent {
    X11(Event),
    Tray(TrayCommand),
    ConnectionLost(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    /// First tick one interval after `now`
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self::starting_at(interval, now + interval)
    }

    /// First tick at `first_due`, then every `interval`
    pub fn starting_at(interval: Duration, first_due: Instant) -> Self {
        Self {
            interval,
            next_due: first_due,
        }
    }

    /// Returns true if a tick is due at `now`. Missed ticks collapse into one,
    /// so a stalled loop does not fire a burst afterwards.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now && !self.interval.is_zero() {
            let behind = now.duration_since(self.next_due);
            let skipped = (behind.as_nanos() / self.interval.as_nanos()) as u32 + 1;
            self.next_due += self.interval * skipped;
        }
        true
    }

    pub fn time_until(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

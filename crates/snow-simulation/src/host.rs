//! Frame host abstraction
//!
//! The host owns the wall clock and the "call me on the next frame" mechanism
//! (a window redraw request, a display-link callback). The frame loop only ever
//! talks to it through `FrameHost`, so it can be driven by a virtual clock.

use std::collections::VecDeque;
use std::time::Duration;

/// Identifies one requested tick; stale tokens are ignored by the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(pub u64);

pub trait FrameHost {
    /// Monotonic wall-clock time
    fn now(&self) -> Duration;

    /// Ask for the frame loop to be ticked on the next frame.
    fn request_tick(&mut self) -> TickToken;

    fn cancel_tick(&mut self, token: TickToken);
}

/// Virtual clock and tick queue for tests and headless driving
#[derive(Debug, Default)]
pub struct ManualHost {
    now: Duration,
    next_token: u64,
    pending: VecDeque<TickToken>,
    cancelled: Vec<TickToken>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: Duration) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    pub fn set_now(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Next requested tick, oldest first
    pub fn take_tick(&mut self) -> Option<TickToken> {
        self.pending.pop_front()
    }

    pub fn pending_ticks(&self) -> usize {
        self.pending.len()
    }

    pub fn cancelled(&self) -> &[TickToken] {
        &self.cancelled
    }
}

impl FrameHost for ManualHost {
    fn now(&self) -> Duration {
        self.now
    }

    fn request_tick(&mut self) -> TickToken {
        let token = TickToken(self.next_token);
        self.next_token += 1;
        self.pending.push_back(token);
        token
    }

    fn cancel_tick(&mut self, token: TickToken) {
        self.pending.retain(|t| *t != token);
        self.cancelled.push(token);
    }
}

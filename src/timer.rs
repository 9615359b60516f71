//! Tick sources for the two countdowns.
//!
//! A driver only delivers [`TickToken`]s; it never touches arena state. The
//! engine drops any token whose generation is stale, so a tick that was
//! already in flight when its timer got cancelled becomes a no-op.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Main,
    Recovery,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickToken {
    pub kind: TimerKind,
    pub generation: u64,
}

pub trait TickDriver: Send {
    /// Start delivering `token` once per period, replacing any source already
    /// running for `token.kind`.
    fn arm(&mut self, token: TickToken);

    fn disarm(&mut self, kind: TimerKind);
}

/// Driver for callers that deliver ticks themselves (tests, the simulator).
#[derive(Debug, Default)]
pub struct ManualTickDriver;

impl TickDriver for ManualTickDriver {
    fn arm(&mut self, _token: TickToken) {}

    fn disarm(&mut self, _kind: TimerKind) {}
}

/// One tokio interval task per armed timer, each pushing its token into a
/// shared channel that the server drains under the engine lock.
pub struct TokioTickDriver {
    period: Duration,
    tx: mpsc::UnboundedSender<TickToken>,
    tasks: HashMap<TimerKind, JoinHandle<()>>,
}

impl TokioTickDriver {
    pub fn new(period: Duration, tx: mpsc::UnboundedSender<TickToken>) -> Self {
        Self {
            period,
            tx,
            tasks: HashMap::new(),
        }
    }
}

impl TickDriver for TokioTickDriver {
    fn arm(&mut self, token: TickToken) {
        self.disarm(token.kind);
        let tx = self.tx.clone();
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(token).is_err() {
                    break;
                }
            }
        });
        debug!(?token, "tick source armed");
        self.tasks.insert(token.kind, handle);
    }

    fn disarm(&mut self, kind: TimerKind) {
        if let Some(handle) = self.tasks.remove(&kind) {
            handle.abort();
            debug!(?kind, "tick source disarmed");
        }
    }
}

impl Drop for TokioTickDriver {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

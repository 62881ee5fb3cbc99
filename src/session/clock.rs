use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One elapsed countdown second, tagged with the run that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub epoch: u64,
}

/// Periodic one-second countdown source
///
/// Each `start` begins a new epoch whose first tick lands one full period
/// later. Ticks from a stopped epoch may still sit in the channel; callers
/// compare against `current_epoch()` and drop them.
pub struct CountdownClock {
    period: Duration,
    ticks: mpsc::UnboundedSender<ClockTick>,
    running: Option<RunningClock>,
    epoch: u64,
}

struct RunningClock {
    epoch: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CountdownClock {
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<ClockTick>) {
        let (ticks, ticks_rx) = mpsc::unbounded_channel();
        let clock = Self {
            period,
            ticks,
            running: None,
            epoch: 0,
        };
        (clock, ticks_rx)
    }

    /// Start ticking; does nothing while already running
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        self.epoch += 1;
        let epoch = self.epoch;
        let period = self.period;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let ticks = self.ticks.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if ticks.send(ClockTick { epoch }).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        debug!("Countdown clock started (epoch {})", epoch);
        self.running = Some(RunningClock {
            epoch,
            cancel,
            handle,
        });
    }

    /// Stop ticking; safe to call when not running
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.handle.abort();
            debug!("Countdown clock stopped (epoch {})", running.epoch);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Epoch whose ticks are live, if running
    pub fn current_epoch(&self) -> Option<u64> {
        self.running.as_ref().map(|r| r.epoch)
    }
}

impl Drop for CountdownClock {
    fn drop(&mut self) {
        self.stop();
    }
}

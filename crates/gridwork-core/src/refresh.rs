//! Redraw scheduling during drags.
//!
//! Pointer moves arrive faster than a redraw completes. The scheduler runs at
//! most one redraw at a time on a background thread; requests that arrive
//! while one is running collapse into a single pending redraw that starts as
//! soon as the current one finishes.

use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// The overlay/view surface that can be asked to redraw.
pub trait Repaint: Send + 'static {
    fn repaint(&mut self);
}

impl<F: FnMut() + Send + 'static> Repaint for F {
    fn repaint(&mut self) {
        self()
    }
}

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A redraw was started.
    Started,
    /// A redraw is running; this request is now the single pending one.
    Pending,
    /// The scheduler has shut down.
    Closed,
}

/// Counters for observing the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Redraws that ran to completion.
    pub runs: u64,
    /// Requests folded into an already pending redraw.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: bool,
    pending: bool,
    stats: RefreshStats,
}

type Shared = Arc<(Mutex<Slot>, Condvar)>;

fn lock(shared: &Shared) -> MutexGuard<'_, Slot> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Commands sent to the refresh thread.
enum RefreshCommand {
    Run,
    Shutdown,
}

/// Single-slot, newest-wins redraw scheduler.
pub struct RefreshScheduler {
    shared: Shared,
    cmd_tx: Option<Sender<RefreshCommand>>,
    thread: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Start the refresh thread for a repaint target.
    pub fn new(mut target: impl Repaint) -> Self {
        let shared: Shared = Arc::new((Mutex::new(Slot::default()), Condvar::new()));
        let (cmd_tx, cmd_rx) = channel::<RefreshCommand>();
        let worker = Arc::clone(&shared);

        let thread = thread::spawn(move || {
            while let Ok(RefreshCommand::Run) = cmd_rx.recv() {
                loop {
                    target.repaint();
                    let mut slot = lock(&worker);
                    slot.stats.runs += 1;
                    if slot.pending {
                        slot.pending = false;
                        continue;
                    }
                    slot.in_flight = false;
                    worker.1.notify_all();
                    break;
                }
            }
            log::debug!("Refresh thread exiting");
        });

        Self {
            shared,
            cmd_tx: Some(cmd_tx),
            thread: Some(thread),
        }
    }

    /// Ask for a redraw. Never blocks on the redraw itself.
    pub fn request(&self) -> RequestOutcome {
        let Some(tx) = &self.cmd_tx else {
            return RequestOutcome::Closed;
        };
        let mut slot = lock(&self.shared);
        if slot.in_flight {
            if slot.pending {
                slot.stats.dropped += 1;
            }
            slot.pending = true;
            return RequestOutcome::Pending;
        }
        if tx.send(RefreshCommand::Run).is_err() {
            log::warn!("Refresh thread is gone, dropping redraw request");
            return RequestOutcome::Closed;
        }
        slot.in_flight = true;
        RequestOutcome::Started
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.shared).in_flight
    }

    pub fn stats(&self) -> RefreshStats {
        lock(&self.shared).stats
    }

    /// Block until no redraw is running or pending.
    pub fn wait_idle(&self) {
        let (_, cvar) = &*self.shared;
        let mut slot = lock(&self.shared);
        while slot.in_flight {
            slot = cvar.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop the refresh thread after any running redraw finishes.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(RefreshCommand::Shutdown);
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("Refresh thread panicked");
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("stats", &self.stats())
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_single_request_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sched = RefreshScheduler::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(sched.request(), RequestOutcome::Started);
        sched.wait_idle();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(sched.stats().runs, 1);
        assert!(!sched.is_busy());
    }

    #[test]
    fn test_burst_coalesces_to_one_pending() {
        let (gate_tx, gate_rx) = channel::<()>();
        let (started_tx, started_rx) = channel::<()>();
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));
        let (r, m) = (Arc::clone(&running), Arc::clone(&max_running));

        let sched = RefreshScheduler::new(move || {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(now, Ordering::SeqCst);
            let _ = started_tx.send(());
            let _ = gate_rx.recv();
            r.fetch_sub(1, Ordering::SeqCst);
        });

        assert_eq!(sched.request(), RequestOutcome::Started);
        started_rx.recv().unwrap();
        for _ in 0..5 {
            assert_eq!(sched.request(), RequestOutcome::Pending);
        }
        // Let the first and the single follow-up run finish.
        gate_tx.send(()).unwrap();
        started_rx.recv().unwrap();
        gate_tx.send(()).unwrap();
        sched.wait_idle();

        let stats = sched.stats();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.dropped, 4);
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_after_shutdown() {
        let mut sched = RefreshScheduler::new(|| {});
        sched.shutdown();
        assert_eq!(sched.request(), RequestOutcome::Closed);
    }
}

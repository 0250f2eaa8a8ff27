//! Cancellable periodic task on a named worker thread.
//!
//! The worker waits on a stop channel with `recv_timeout` until the next
//! deadline and runs the callback on each timeout. [`TickHandle::cancel`]
//! disconnects the stop channel and joins the thread, so once it returns the
//! callback will never run again.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};

use crate::core::errors::{MsimError, Result};

/// Owner of a running periodic task. Dropping the handle cancels the task.
#[derive(Debug)]
pub struct TickHandle {
    name: String,
    period: Duration,
    stop_tx: Option<Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl TickHandle {
    /// Worker thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interval between callback runs.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Whether the worker thread has exited (callback panic or cancellation).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }

    /// Stop the task and wait for the worker to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            eprintln!("[MSIM-TICK] {} worker panicked", self.name);
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `on_tick` every `period` on a thread named `name` until cancelled.
///
/// The first call happens one `period` after spawning.
pub fn spawn_ticker<F>(name: &str, period: Duration, mut on_tick: F) -> Result<TickHandle>
where
    F: FnMut() + Send + 'static,
{
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let join = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || ticker_thread_main(&stop_rx, period, &mut on_tick))
        .map_err(|source| MsimError::Runtime {
            details: format!("failed to spawn {name} thread: {source}"),
        })?;

    Ok(TickHandle {
        name: name.to_string(),
        period,
        stop_tx: Some(stop_tx),
        join: Some(join),
    })
}

fn ticker_thread_main<F: FnMut()>(stop_rx: &Receiver<()>, period: Duration, on_tick: &mut F) {
    let mut next = Instant::now() + period;
    loop {
        let wait = next.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                on_tick();
                next += period;
                // Skip missed deadlines after a long callback instead of bursting.
                let now = Instant::now();
                if next < now {
                    next = now + period;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

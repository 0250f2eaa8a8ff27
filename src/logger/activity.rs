//! Activity logger: a dedicated thread owns the [`JsonlWriter`]; everything
//! else sends [`ActivityEvent`]s over a bounded crossbeam channel.
//!
//! [`ActivityLoggerHandle::send`] uses `try_send`, so a tick thread is never
//! blocked by a slow disk. Events that do not fit are counted and reported in
//! the log as one warning line.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::config::Config;
use crate::core::errors::{MsimError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

const CHANNEL_CAPACITY: usize = 256;

// ──────────────────── events ────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    SimulatorStarted {
        capacity: usize,
        tick_interval_ms: u64,
    },
    SimulatorStopped {
        samples_generated: u64,
    },
    StressEntered {
        tick_interval_ms: u64,
    },
    StressExited {
        elapsed_secs: u64,
        released_batches: usize,
    },
    PayloadPruned {
        dropped_batches: usize,
        retained_batches: usize,
    },
    ConfigLoaded {
        config_hash: String,
        source: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Ask the logger thread to flush and exit.
    Shutdown,
}

impl ActivityEvent {
    /// Error event carrying the code and message of `err`.
    #[must_use]
    pub fn from_error(err: &MsimError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ──────────────────── handle ────────────────────

/// Cloneable, non-blocking sender half of the activity logger.
#[derive(Debug, Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Queue an event. A full channel drops it and bumps the dropped counter.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events dropped since the logger thread last reported them.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit. Blocks only until the
    /// sentinel is queued; join the returned thread to wait for the flush.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

// ──────────────────── configuration ────────────────────

#[derive(Debug, Clone)]
pub struct ActivityLoggerConfig {
    pub jsonl_config: JsonlConfig,
    pub channel_capacity: usize,
}

impl ActivityLoggerConfig {
    /// Log to `paths.activity_log` with default rotation settings.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            jsonl_config: JsonlConfig::for_path(config.paths.activity_log.clone()),
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

impl Default for ActivityLoggerConfig {
    fn default() -> Self {
        Self {
            jsonl_config: JsonlConfig::default(),
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

// ──────────────────── spawn ────────────────────

/// Start the `msim-logger` thread.
///
/// It runs until [`ActivityLoggerHandle::shutdown`] is called or every handle
/// is dropped.
pub fn spawn_logger(
    config: ActivityLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("msim-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config.jsonl_config, &dropped_clone))
        .map_err(|e| MsimError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

// ──────────────────── logger thread ────────────────────

fn logger_thread_main(
    rx: &Receiver<ActivityEvent>,
    jsonl_config: JsonlConfig,
    dropped: &AtomicU64,
) {
    let mut jsonl = JsonlWriter::open(jsonl_config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if event == ActivityEvent::Shutdown {
            break;
        }

        jsonl.write_entry(&event_to_log_entry(&event));
        if jsonl.state() != "normal" {
            jsonl.try_recover();
        }
    }

    jsonl.flush();
    jsonl.fsync();
}

// ──────────────────── event conversion ────────────────────

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::SimulatorStarted {
            capacity,
            tick_interval_ms,
        } => {
            let mut e = LogEntry::new(EventType::SimulatorStart, Severity::Info);
            e.capacity = Some(*capacity);
            e.interval_ms = Some(*tick_interval_ms);
            e.ok = Some(true);
            e
        }
        ActivityEvent::SimulatorStopped { samples_generated } => {
            let mut e = LogEntry::new(EventType::SimulatorStop, Severity::Info);
            e.samples = Some(*samples_generated);
            e.ok = Some(true);
            e
        }
        ActivityEvent::StressEntered { tick_interval_ms } => {
            let mut e = LogEntry::new(EventType::StressEnter, Severity::Warning);
            e.interval_ms = Some(*tick_interval_ms);
            e
        }
        ActivityEvent::StressExited {
            elapsed_secs,
            released_batches,
        } => {
            let mut e = LogEntry::new(EventType::StressExit, Severity::Info);
            e.elapsed_secs = Some(*elapsed_secs);
            e.batches = Some(*released_batches);
            e
        }
        ActivityEvent::PayloadPruned {
            dropped_batches,
            retained_batches,
        } => {
            let mut e = LogEntry::new(EventType::PayloadPrune, Severity::Info);
            e.batches = Some(*dropped_batches);
            e.details = Some(format!("retained={retained_batches}"));
            e
        }
        ActivityEvent::ConfigLoaded {
            config_hash,
            source,
        } => {
            let mut e = LogEntry::new(EventType::ConfigLoad, Severity::Info);
            e.details = Some(format!("source={source} config_hash={config_hash}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        // Handled by the thread loop; never written.
        ActivityEvent::Shutdown => LogEntry::new(EventType::SimulatorStop, Severity::Info),
    }
}

// ──────────────────── tests ────────────────────

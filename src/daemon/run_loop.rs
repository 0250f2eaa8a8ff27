//! Foreground run loop behind `msim run`: owns the simulator, the activity
//! logger thread and the signal flags, and polls a [`StatusReport`] once per
//! poll interval the way a dashboard component would.

#![allow(missing_docs)]

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::daemon::signals::SignalHandler;
use crate::logger::activity::{
    ActivityEvent, ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger,
};
use crate::simulator::Simulator;
use crate::simulator::status::StatusReport;

/// Granularity of shutdown checks while waiting for the next poll.
const WAIT_SLICE: Duration = Duration::from_millis(50);

// ──────────────────── arguments ────────────────────

#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Stop after this long; `None` runs until a signal arrives.
    pub duration: Option<Duration>,
    pub schedule: StressSchedule,
    /// How often the status callback runs. Default: 1 s.
    pub poll_interval: Duration,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            duration: None,
            schedule: StressSchedule::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

// ──────────────────── stress schedule ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    Enter,
    Exit,
}

/// Optional timed stress window: enter after `after`, leave `hold` later.
///
/// Each edge fires once; manual toggles in between are not overridden until
/// the next edge.
#[derive(Debug, Clone, Default)]
pub struct StressSchedule {
    after: Option<Duration>,
    hold: Option<Duration>,
    entered: bool,
    exited: bool,
}

impl StressSchedule {
    #[must_use]
    pub fn new(after: Option<Duration>, hold: Option<Duration>) -> Self {
        Self {
            after,
            hold,
            entered: false,
            exited: false,
        }
    }

    /// The edge due at `elapsed`, if one has not fired yet.
    pub fn due(&mut self, elapsed: Duration) -> Option<ScheduleAction> {
        let after = self.after?;
        if !self.entered {
            if elapsed >= after {
                self.entered = true;
                return Some(ScheduleAction::Enter);
            }
            return None;
        }
        if !self.exited
            && let Some(hold) = self.hold
            && elapsed >= after + hold
        {
            self.exited = true;
            return Some(ScheduleAction::Exit);
        }
        None
    }
}

// ──────────────────── summary ────────────────────

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub elapsed_secs: u64,
    pub polls: u64,
    pub samples_generated: u64,
    pub stress_ticks: u64,
    pub payload_prunes: u64,
    /// Ended by a signal rather than `duration`.
    pub interrupted: bool,
}

// ──────────────────── runner ────────────────────

pub struct SimulatorRunner {
    simulator: Simulator,
    logger_handle: ActivityLoggerHandle,
    logger_join: Option<thread::JoinHandle<()>>,
    signals: SignalHandler,
}

impl SimulatorRunner {
    /// Spawn the activity logger and build a simulator that logs through it.
    ///
    /// `source` names where the config came from, for the `config_load` event.
    pub fn init(config: &Config, source: &str, signals: SignalHandler) -> Result<Self> {
        Self::init_with_logger(
            config,
            source,
            signals,
            ActivityLoggerConfig::from_config(config),
        )
    }

    pub fn init_with_logger(
        config: &Config,
        source: &str,
        signals: SignalHandler,
        logger_config: ActivityLoggerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (logger_handle, logger_join) = spawn_logger(logger_config)?;
        logger_handle.send(ActivityEvent::ConfigLoaded {
            config_hash: config.stable_hash().unwrap_or_default(),
            source: source.to_string(),
        });
        let simulator = Simulator::with_logger(config, logger_handle.clone())?;
        Ok(Self {
            simulator,
            logger_handle,
            logger_join: Some(logger_join),
            signals,
        })
    }

    #[must_use]
    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    #[must_use]
    pub fn signals(&self) -> &SignalHandler {
        &self.signals
    }

    /// Start the simulator and call `on_status` once per poll until
    /// `args.duration` passes or shutdown is requested. Stops everything
    /// before returning.
    pub fn run<F>(&mut self, args: &RunArgs, mut on_status: F) -> Result<RunSummary>
    where
        F: FnMut(&StatusReport),
    {
        let started = Instant::now();
        let mut schedule = args.schedule.clone();
        let mut polls = 0_u64;
        let mut interrupted = false;

        if let Err(err) = self.simulator.start() {
            self.logger_handle.send(ActivityEvent::from_error(&err));
            return Err(err);
        }

        let mut next_poll = started + args.poll_interval;
        loop {
            if self.signals.should_shutdown() {
                interrupted = true;
                break;
            }
            let elapsed = started.elapsed();
            if args.duration.is_some_and(|d| elapsed >= d) {
                break;
            }

            if self.signals.should_toggle_stress() {
                self.toggle_stress()?;
            }
            match schedule.due(elapsed) {
                Some(ScheduleAction::Enter) => {
                    self.enter_stress()?;
                }
                Some(ScheduleAction::Exit) => {
                    self.simulator.exit_stress_mode();
                }
                None => {}
            }

            let now = Instant::now();
            if now >= next_poll {
                on_status(&self.simulator.status());
                polls += 1;
                next_poll += args.poll_interval;
                if next_poll < now {
                    next_poll = now + args.poll_interval;
                }
            }

            let mut wait = next_poll.saturating_duration_since(Instant::now());
            if let Some(d) = args.duration {
                wait = wait.min(d.saturating_sub(started.elapsed()));
            }
            thread::sleep(wait.min(WAIT_SLICE));
        }

        self.simulator.exit_stress_mode();
        self.simulator.stop();
        let counters = self.simulator.counters();
        Ok(RunSummary {
            elapsed_secs: started.elapsed().as_secs(),
            polls,
            samples_generated: counters.samples_generated,
            stress_ticks: counters.stress_ticks,
            payload_prunes: counters.payload_prunes,
            interrupted,
        })
    }

    fn toggle_stress(&self) -> Result<()> {
        if self.simulator.is_stressed() {
            self.simulator.exit_stress_mode();
            Ok(())
        } else {
            self.enter_stress()
        }
    }

    fn enter_stress(&self) -> Result<()> {
        if let Err(err) = self.simulator.enter_stress_mode() {
            self.logger_handle.send(ActivityEvent::from_error(&err));
            return Err(err);
        }
        Ok(())
    }

    /// Stop the simulator and flush the activity log.
    pub fn shutdown(&mut self) {
        self.simulator.exit_stress_mode();
        self.simulator.stop();
        self.logger_handle.shutdown();
        if let Some(join) = self.logger_join.take()
            && join.join().is_err()
        {
            eprintln!("[MSIM-RUN] logger thread panicked");
        }
    }
}

impl Drop for SimulatorRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ──────────────────── tests ────────────────────

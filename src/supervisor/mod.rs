mod outcome;

pub use outcome::{report, InstanceOutcome, Outcome};

use crate::{
    cluster::{self, Instance},
    config, pid,
    process::{LaunchSpec, ProcessControl},
};

use macros_rs::ternary;
use nix::sys::signal::Signal;
use std::{env, thread, time::Duration};

/// Attempts to confirm a launch before giving up
pub const MAX_START_TRIES: u32 = 10;
/// Pause between start-confirmation polls
pub const START_POLL_INTERVAL_MS: u64 = 500;
/// Single wait after SIGKILL before re-probing a stopped instance
pub const STOP_SETTLE_DELAY_MS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
    Status,
}

/// Liveness derived from the PID file plus a process-existence probe.
/// Recomputed on every check, never cached across actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LivenessState {
    /// No PID file (or nothing readable as a PID)
    NotRunning,
    /// PID file present, process absent
    Dead(i64),
    /// PID file present, process present
    Running(i64),
}

/// Timing knobs for the two blocking waits. Tests shrink these to
/// milliseconds; production uses the module defaults.
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    pub max_tries: u32,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_tries: MAX_START_TRIES,
            poll_interval: Duration::from_millis(START_POLL_INTERVAL_MS),
            settle_delay: Duration::from_millis(STOP_SETTLE_DELAY_MS),
        }
    }
}

pub struct Supervisor<'c, C: ProcessControl> {
    control: &'c C,
    settings: Settings,
}

impl<'c, C: ProcessControl> Supervisor<'c, C> {
    pub fn new(control: &'c C) -> Self {
        Self::with_settings(control, Settings::default())
    }

    pub fn with_settings(control: &'c C, settings: Settings) -> Self {
        Self { control, settings }
    }

    /// Resolve the pattern, expand each matching declaration into its
    /// cluster, and drive every instance through the requested action.
    /// Sequential across configs and instances; per-instance failures are
    /// reported and never stop siblings. Only resolution-time problems
    /// (no match, unreadable declaration, missing working directory)
    /// abort the invocation.
    pub fn perform(&self, action: Action, pattern: &str) -> Result<(), String> {
        self.perform_in(&config::conf_dir(), action, pattern)
    }

    /// Same as [`perform`](Self::perform), against an explicit configuration
    /// directory.
    pub fn perform_in(&self, conf_dir: &str, action: Action, pattern: &str) -> Result<(), String> {
        let configs = config::resolve_in(conf_dir, pattern)?;

        for config in configs {
            env::set_current_dir(&config.dir).map_err(|err| {
                format!(
                    "Couldn't change into '{}' for '{}': {}",
                    config.dir.display(),
                    config.app,
                    err
                )
            })?;

            let instances = cluster::expand(&config)?;
            let mut outcomes = Vec::with_capacity(instances.len());
            for instance in &instances {
                let results = self.apply(action, instance);
                for result in &results {
                    crate::log!(
                        "[supervisor] instance transition",
                        "app" => config.app,
                        "port" => result.port,
                        "outcome" => result.outcome.label(),
                    );
                }
                outcomes.extend(results);
            }

            outcome::report(&config.app, &outcomes);
        }

        Ok(())
    }

    pub fn liveness(&self, instance: &Instance) -> LivenessState {
        match pid::read(&instance.pid_file()) {
            None => LivenessState::NotRunning,
            Some(pid) => ternary!(
                self.control.is_alive(pid),
                LivenessState::Running(pid),
                LivenessState::Dead(pid)
            ),
        }
    }

    /// The per-instance transition table. `restart` is stop then start,
    /// strictly sequential, with start running no matter how the stop went.
    /// Its two outcomes are reported as two indented lines under the one
    /// application header, not as two separate action passes.
    pub fn apply(&self, action: Action, instance: &Instance) -> Vec<InstanceOutcome> {
        match action {
            Action::Status => vec![self.status(instance)],
            Action::Stop => vec![self.stop(instance)],
            Action::Start => vec![self.start(instance)],
            Action::Restart => {
                let stopped = self.stop(instance);
                let started = self.start(instance);
                vec![stopped, started]
            }
        }
    }

    /// Pure report. A dead instance's PID file is left in place for
    /// inspection; only `stop` cleans it up.
    fn status(&self, instance: &Instance) -> InstanceOutcome {
        InstanceOutcome::new(instance.port, Outcome::Status(self.liveness(instance)))
    }

    fn start(&self, instance: &Instance) -> InstanceOutcome {
        match self.liveness(instance) {
            LivenessState::Running(pid) => {
                ::log::debug!(
                    "{} ({}) already running with pid {}, not relaunching",
                    instance.app,
                    instance.port,
                    pid
                );
                InstanceOutcome::new(instance.port, Outcome::AlreadyRunning)
            }
            // A stale PID file is no reason not to launch; the poll below
            // only succeeds once the file names a live process again
            LivenessState::NotRunning | LivenessState::Dead(_) => {
                if let Err(err) = self.control.spawn(&launch_spec(instance)) {
                    ::log::error!(
                        "Failed to launch {} ({}): {}",
                        instance.app,
                        instance.port,
                        err
                    );
                    return InstanceOutcome::new(instance.port, Outcome::StartFailed);
                }

                // The launched process writes its own PID file once it is
                // fully initialized, so confirmation is a bounded poll
                for _ in 0..self.settings.max_tries {
                    thread::sleep(self.settings.poll_interval);
                    if let LivenessState::Running(_) = self.liveness(instance) {
                        return InstanceOutcome::new(instance.port, Outcome::Started);
                    }
                }

                InstanceOutcome::new(instance.port, Outcome::StartFailed)
            }
        }
    }

    fn stop(&self, instance: &Instance) -> InstanceOutcome {
        let pid_file = instance.pid_file();

        match self.liveness(instance) {
            LivenessState::NotRunning => {
                InstanceOutcome::new(instance.port, Outcome::NotRunning)
            }
            LivenessState::Dead(pid) => {
                ::log::debug!(
                    "{} ({}) left a stale pid file naming {}, cleaning up",
                    instance.app,
                    instance.port,
                    pid
                );
                pid::remove(&pid_file);
                InstanceOutcome::new(instance.port, Outcome::AlreadyDead)
            }
            LivenessState::Running(pid) => {
                if let Err(err) = self.control.signal(pid, Signal::SIGKILL) {
                    ::log::error!("Failed to signal {} ({}): {}", instance.app, pid, err);
                    return InstanceOutcome::new(instance.port, Outcome::StopFailed);
                }

                // One fixed settle delay, then a single re-probe; stop is
                // deliberately not retried the way start is
                thread::sleep(self.settings.settle_delay);
                if self.control.is_alive(pid) {
                    InstanceOutcome::new(instance.port, Outcome::StopFailed)
                } else {
                    pid::remove(&pid_file);
                    InstanceOutcome::new(instance.port, Outcome::Stopped)
                }
            }
        }
    }
}

fn launch_spec(instance: &Instance) -> LaunchSpec {
    LaunchSpec {
        command: instance.command.clone(),
        dir: instance.dir.clone(),
        user: instance.user.clone(),
        env: instance.environment(),
    }
}

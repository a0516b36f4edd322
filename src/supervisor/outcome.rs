use super::LivenessState;
use std::fmt;

/// Terminal result of one instance's transition. Each outcome is reported
/// with the port it belongs to; the state machine never touches stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    AlreadyRunning,
    Started,
    StartFailed,
    NotRunning,
    AlreadyDead,
    Stopped,
    StopFailed,
    Status(LivenessState),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::AlreadyRunning => "already running",
            Outcome::Started => "started",
            Outcome::StartFailed => "failed to start",
            Outcome::NotRunning => "not running",
            Outcome::AlreadyDead => "already dead",
            Outcome::Stopped => "stopped",
            Outcome::StopFailed => "failed to stop",
            Outcome::Status(LivenessState::NotRunning) => "not running",
            Outcome::Status(LivenessState::Dead(_)) => "has died",
            Outcome::Status(LivenessState::Running(_)) => "running",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceOutcome {
    pub port: u16,
    pub outcome: Outcome,
}

impl InstanceOutcome {
    pub fn new(port: u16, outcome: Outcome) -> Self {
        Self { port, outcome }
    }
}

impl fmt::Display for InstanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {} ({})", capitalize(self.outcome.label()), self.port)
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// One line per application, one indented line per instance.
pub fn report(app: &str, outcomes: &[InstanceOutcome]) {
    println!("Application {app}:");
    for outcome in outcomes {
        println!("{outcome}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_lines_are_capitalized_and_carry_the_port() {
        let line = InstanceOutcome::new(4000, Outcome::Started).to_string();
        assert_eq!(line, "  Started (4000)");

        let line = InstanceOutcome::new(4001, Outcome::AlreadyRunning).to_string();
        assert_eq!(line, "  Already running (4001)");

        let line = InstanceOutcome::new(4002, Outcome::Status(LivenessState::Dead(9999))).to_string();
        assert_eq!(line, "  Has died (4002)");
    }

    #[test]
    fn status_labels_follow_liveness() {
        assert_eq!(Outcome::Status(LivenessState::NotRunning).label(), "not running");
        assert_eq!(Outcome::Status(LivenessState::Running(42)).label(), "running");
        assert_eq!(Outcome::StartFailed.label(), "failed to start");
        assert_eq!(Outcome::StopFailed.label(), "failed to stop");
    }
}

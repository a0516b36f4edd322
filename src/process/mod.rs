use global_placeholders::global;
use nix::{
    errno::Errno,
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use std::{
    fs::OpenOptions,
    path::PathBuf,
    process::{Command, Stdio},
};

/// Everything needed to launch one supervised instance.
#[derive(Clone, Debug)]
pub struct LaunchSpec {
    pub command: String,
    pub dir: PathBuf,
    pub user: String,
    pub env: Vec<(String, String)>,
}

/// OS process capability the supervisor state machine runs against.
/// Tests swap in a fake so no real process is ever spawned.
pub trait ProcessControl {
    fn spawn(&self, spec: &LaunchSpec) -> Result<(), String>;
    fn signal(&self, pid: i64, signal: Signal) -> Result<(), String>;
    fn is_alive(&self, pid: i64) -> bool;
}

/// Check if a process with the given PID is alive
/// Uses libc::kill with signal 0 to check process existence without sending
/// a signal. A zombie (defunct) process still sits in the process table, so
/// it would pass the kill check; it is treated as dead here because a dead
/// instance must be stoppable and cleanable.
///
/// PID <= 0 is never considered alive:
/// - PID 0 signals all processes in the current process group
/// - Negative PIDs signal process groups
/// - These are not valid individual process IDs
///
/// Values past `i32::MAX` can't name a real process either. PID files are
/// untrusted input, so an oversized value must read as dead instead of
/// truncating onto whatever unrelated process owns the low 32 bits.
pub fn is_pid_alive(pid: i64) -> bool {
    let pid = match i32::try_from(pid) {
        Ok(pid) if pid > 0 => pid,
        _ => return false,
    };

    // kill(pid, 0) returns 0 on success, -1 on error. EPERM means the
    // process exists but belongs to someone we can't signal, so still alive.
    let result = unsafe { libc::kill(pid, 0) };

    if result != 0 {
        let err = std::io::Error::last_os_error();
        let errno = err.raw_os_error().unwrap_or(0);
        return errno == libc::EPERM;
    }

    #[cfg(target_os = "linux")]
    {
        if is_zombie(i64::from(pid)) {
            return false;
        }
    }

    true
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: i64) -> bool {
    let stat = match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat,
        Err(_) => return false,
    };

    // State is the first field after the parenthesized comm, which may
    // itself contain spaces and parentheses
    stat.rsplit(')')
        .next()
        .and_then(|rest| rest.split_whitespace().next())
        .map_or(false, |state| state == "Z")
}

/// Single-quote a value for interpolation into the `su -c` command line.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// The real thing: spawns via `su`, signals via `nix`, probes via signal 0.
pub struct SystemProcess;

impl ProcessControl for SystemProcess {
    fn spawn(&self, spec: &LaunchSpec) -> Result<(), String> {
        let log_path = global!("psup.log");
        let stdout_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|err| format!("Failed to open log file '{}': {}", log_path, err))?;
        let stderr_log = stdout_log
            .try_clone()
            .map_err(|err| format!("Failed to clone log handle: {}", err))?;

        // su scrubs the environment, so the contract variables are prefixed
        // onto the command line as assignments
        let assignments = spec
            .env
            .iter()
            .map(|(key, value)| format!("{}={}", key, shell_quote(value)))
            .collect::<Vec<String>>()
            .join(" ");
        let command_line = format!("{} {}", assignments, spec.command);

        let mut cmd = Command::new("su");
        cmd.arg("-c")
            .arg(&command_line)
            .arg(&spec.user)
            .current_dir(&spec.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log));

        // Detach into a fresh session so the instance outlives this
        // invocation and never receives our terminal's signals
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        cmd.spawn().map_err(|err| {
            format!(
                "Failed to launch '{}' as user '{}': {}",
                spec.command, spec.user, err
            )
        })?;

        // The instance writes its own PID file once it is up; the child
        // handle is dropped on purpose, confirmation happens by polling
        Ok(())
    }

    fn signal(&self, pid: i64, signal: Signal) -> Result<(), String> {
        // Same validity window as the probe; a pid the probe would call
        // dead must never be signaled after truncation
        let pid = match i32::try_from(pid) {
            Ok(pid) if pid > 0 => pid,
            _ => return Ok(()),
        };

        match kill(Pid::from_raw(pid), signal) {
            Ok(_) => Ok(()),
            Err(Errno::ESRCH) => {
                // Process already terminated
                Ok(())
            }
            Err(err) => Err(format!("Failed to signal process {}: {:?}", pid, err)),
        }
    }

    fn is_alive(&self, pid: i64) -> bool {
        is_pid_alive(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_alive() {
        assert!(is_pid_alive(std::process::id() as i64));
    }

    #[test]
    fn invalid_pids_are_never_alive() {
        assert!(!is_pid_alive(0));
        assert!(!is_pid_alive(-1));
    }

    #[test]
    fn oversized_pids_never_probe_the_truncated_process() {
        // Our own pid plus 2^32 truncates to our own pid in i32 space; it
        // must still read as dead
        let own = std::process::id() as i64;
        assert!(!is_pid_alive(own + (1i64 << 32)));
        assert!(!is_pid_alive(i64::from(i32::MAX) + 1));
        assert!(!is_pid_alive(i64::MAX));
    }

    #[test]
    fn absent_pid_is_not_alive() {
        // Far above any default pid_max
        assert!(!is_pid_alive(2_000_000_000));
    }

    #[test]
    fn signaling_an_absent_pid_is_not_an_error() {
        let control = SystemProcess;
        assert!(control.signal(2_000_000_000, Signal::SIGKILL).is_ok());
    }

    #[test]
    fn signaling_invalid_pids_is_a_no_op() {
        let control = SystemProcess;
        assert!(control.signal(0, Signal::SIGKILL).is_ok());
        assert!(control.signal(-42, Signal::SIGKILL).is_ok());
    }

    #[test]
    fn signaling_an_oversized_pid_is_a_no_op() {
        // Would truncate to our own pid; the signal must never be sent
        let control = SystemProcess;
        let own = std::process::id() as i64;
        assert!(control.signal(own + (1i64 << 32), Signal::SIGTERM).is_ok());
        assert!(is_pid_alive(own));
    }

    #[test]
    fn shell_quote_wraps_and_escapes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}

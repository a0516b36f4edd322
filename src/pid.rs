use std::{fs, io::ErrorKind, path::Path};

/// Read the PID recorded for an instance: first line of the file, trimmed,
/// parsed as a decimal. Missing file, empty file, or a non-numeric first
/// line all mean "no PID recorded"; stale and corrupt PID files are an
/// expected steady-state condition, never an error surfaced to the caller.
pub fn read(path: &Path) -> Option<i64> {
    let contents = fs::read_to_string(path).ok()?;
    contents.lines().next()?.trim().parse::<i64>().ok()
}

/// Delete an instance's PID file. A file that is already gone is a no-op;
/// anything else is logged and swallowed so one instance's cleanup failure
/// never aborts its siblings.
pub fn remove(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != ErrorKind::NotFound {
            ::log::warn!("Failed to remove pid file {:?}: {}", path, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn pid_file(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("blog.4000.pid");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_first_line_as_pid() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read(&pid_file(&dir, "4242\n")), Some(4242));
    }

    #[test]
    fn trailing_whitespace_and_extra_lines_are_ignored() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read(&pid_file(&dir, "  4242  \nstartup noise\n")), Some(4242));
    }

    #[test]
    fn missing_file_is_no_pid() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read(&dir.path().join("absent.pid")), None);
    }

    #[test]
    fn empty_file_is_no_pid() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read(&pid_file(&dir, "")), None);
    }

    #[test]
    fn garbage_first_line_is_no_pid() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read(&pid_file(&dir, "starting up\n4242\n")), None);
    }

    #[test]
    fn remove_deletes_the_file() {
        let dir = TempDir::new().unwrap();
        let path = pid_file(&dir, "4242\n");
        remove(&path);
        assert!(!path.exists());
    }

    #[test]
    fn remove_of_missing_file_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        remove(&dir.path().join("absent.pid"));
    }
}

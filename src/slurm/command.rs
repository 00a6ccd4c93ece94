use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

/// A reporting command, e.g. `squeue --noheader --format=...`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ReportCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns the value of a `key=value` argument, e.g. `start` for sreport
    pub fn value(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .filter_map(|arg| arg.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for ReportCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }

        Ok(())
    }
}

/// Source of report output.
///
/// Implementations never fail: errors are logged and surface as empty (or
/// diagnostic) output, which the parsers treat like any other unusable text.
pub trait Reporter {
    fn run_report(&self, command: &ReportCommand) -> String;
}

impl<F> Reporter for F
where
    F: Fn(&ReportCommand) -> String,
{
    fn run_report(&self, command: &ReportCommand) -> String {
        self(command)
    }
}

/// Runs reporting commands as child processes
#[derive(Clone, Debug, Default)]
pub struct SystemReporter {
    /// Commands running for longer than this are killed
    timeout: Option<Duration>,
}

impl SystemReporter {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn execute(&self, command: &ReportCommand) -> std::io::Result<Option<(String, String)>> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Pipes are drained on separate threads so that commands producing more
        // output than fits in the pipe buffer cannot block while we wait
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => status,
                None => {
                    log::warn!("{:?} timed out after {:?}; killing", command.program, timeout);
                    // The process may have exited in the meantime
                    let _ = child.kill();
                    child.wait()?;
                    return Ok(None);
                }
            },
            None => child.wait()?,
        };

        if !status.success() {
            log::warn!("{:?} exited with {}", command.program, status);
        }

        Ok(Some((join(stdout), join(stderr))))
    }
}

impl Reporter for SystemReporter {
    fn run_report(&self, command: &ReportCommand) -> String {
        log::debug!("executing command: {}", command);

        match self.execute(command) {
            Ok(Some((stdout, stderr))) => {
                if !stderr.trim().is_empty() {
                    log::error!("{:?} stderr: {}", command.program, stderr.trim_end());
                }

                log::trace!("{:?} output: {}", command.program, stdout);
                stdout
            }
            Ok(None) => String::new(),
            Err(error) => {
                log::error!("failed to execute {:?}: {}", command.program, error);
                String::new()
            }
        }
    }
}

fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            if let Err(error) = pipe.read_to_end(&mut buffer) {
                log::warn!("failed to read command output: {}", error);
            }

            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let command = ReportCommand::new("sreport")
            .arg("cluster")
            .arg("utilization")
            .arg("start=2024-03-01");

        assert_eq!(command.to_string(), "sreport cluster utilization start=2024-03-01");
        assert_eq!(command.value("start"), Some("2024-03-01"));
        assert_eq!(command.value("end"), None);
    }

    #[test]
    fn test_closure_reporter() {
        let reporter = |command: &ReportCommand| format!("ran {}", command.program);

        assert_eq!(reporter.run_report(&ReportCommand::new("sinfo")), "ran sinfo");
    }

    #[test]
    fn test_missing_executable_returns_empty_output() {
        let reporter = SystemReporter::default();
        let command = ReportCommand::new("/nonexistent/slurmdash-test-binary");

        assert_eq!(reporter.run_report(&command), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let reporter = SystemReporter::new(Some(Duration::from_secs(10)));
        let command = ReportCommand::new("sh").arg("-c").arg("echo a; echo b >&2");

        assert_eq!(reporter.run_report(&command), "a\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_command_within_timeout_keeps_output() {
        let reporter = SystemReporter::new(Some(Duration::from_secs(10)));
        let command = ReportCommand::new("sh").arg("-c").arg("echo partial; exit 3");

        assert_eq!(reporter.run_report(&command), "partial\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_returns_empty_output() {
        let reporter = SystemReporter::new(Some(Duration::from_millis(100)));
        let command = ReportCommand::new("sh").arg("-c").arg("echo early; sleep 5");

        assert_eq!(reporter.run_report(&command), "");
    }
}

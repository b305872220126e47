use std::cell::RefCell;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to start '{command}': {message}")]
    SpawnFailed { command: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

impl ShellOutput {
    /// What the user sees: stdout when there is any, otherwise stderr.
    pub fn display_text(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub launched: bool,
    pub message: String,
}

pub trait ProcessLauncher {
    /// Starts the command and returns as soon as the process exists.
    fn spawn_detached(&mut self, command: &str) -> Result<(), LaunchError>;
    /// Runs the command to completion and captures its output.
    fn run_blocking(&mut self, command: &str) -> Result<ShellOutput, LaunchError>;
}

pub struct SystemLauncher {
    shell: PathBuf,
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
        }
    }
}

impl SystemLauncher {
    pub fn with_shell(shell: PathBuf) -> Self {
        Self { shell }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        cmd
    }
}

impl ProcessLauncher for SystemLauncher {
    fn spawn_detached(&mut self, command: &str) -> Result<(), LaunchError> {
        let trimmed = non_empty(command)?;
        let mut cmd = self.command(trimmed);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|error| LaunchError::SpawnFailed {
            command: trimmed.to_string(),
            message: error.to_string(),
        })?;

        let pid = child.id();
        std::thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || {
                let _ = child.wait();
            })
            .map_err(|error| LaunchError::SpawnFailed {
                command: trimmed.to_string(),
                message: format!("failed to start reaper: {error}"),
            })?;
        log::info!("launched detached pid={pid} command={trimmed}");
        Ok(())
    }

    fn run_blocking(&mut self, command: &str) -> Result<ShellOutput, LaunchError> {
        let trimmed = non_empty(command)?;
        let output = self
            .command(trimmed)
            .stdin(Stdio::null())
            .output()
            .map_err(|error| LaunchError::SpawnFailed {
                command: trimmed.to_string(),
                message: error.to_string(),
            })?;

        log::info!("shell command finished status={:?} command={trimmed}", output.status.code());
        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }
}

#[derive(Debug, Default)]
struct Recorded {
    spawned: Vec<String>,
    executed: Vec<String>,
}

/// Records requests instead of starting processes. Clones share one record,
/// so a caller can hand a clone to the shell and inspect the original.
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    record: Rc<RefCell<Recorded>>,
    scripted_output: ShellOutput,
    fail_with: Option<String>,
}

impl RecordingLauncher {
    pub fn with_output(stdout: &str, stderr: &str) -> Self {
        Self {
            scripted_output: ShellOutput {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                status: Some(0),
            },
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn spawned(&self) -> Vec<String> {
        self.record.borrow().spawned.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.record.borrow().executed.clone()
    }

    fn check_failure(&self, command: &str) -> Result<(), LaunchError> {
        match &self.fail_with {
            Some(message) => Err(LaunchError::SpawnFailed {
                command: command.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn_detached(&mut self, command: &str) -> Result<(), LaunchError> {
        let trimmed = non_empty(command)?;
        self.check_failure(trimmed)?;
        self.record.borrow_mut().spawned.push(trimmed.to_string());
        Ok(())
    }

    fn run_blocking(&mut self, command: &str) -> Result<ShellOutput, LaunchError> {
        let trimmed = non_empty(command)?;
        self.check_failure(trimmed)?;
        self.record.borrow_mut().executed.push(trimmed.to_string());
        Ok(self.scripted_output.clone())
    }
}

pub fn launch(launcher: &mut dyn ProcessLauncher, exec_command: &str) -> LaunchOutcome {
    match launcher.spawn_detached(exec_command) {
        Ok(()) => LaunchOutcome {
            launched: true,
            message: format!("Launching: {}", exec_command.trim()),
        },
        Err(error) => {
            log::warn!("application launch failed: {error}");
            LaunchOutcome {
                launched: false,
                message: format!("Error launching application: {error}"),
            }
        }
    }
}

pub fn run_shell(launcher: &mut dyn ProcessLauncher, command: &str) -> String {
    match launcher.run_blocking(command) {
        Ok(output) => output.display_text().to_string(),
        Err(error) => {
            log::warn!("shell command failed: {error}");
            format!("I'm sorry, but I encountered an error while executing the command: {error}")
        }
    }
}

fn non_empty(command: &str) -> Result<&str, LaunchError> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::EmptyCommand);
    }
    Ok(trimmed)
}

use sundar_core::action_executor::{
    launch, run_shell, LaunchError, ProcessLauncher, RecordingLauncher, ShellOutput, SystemLauncher,
};

#[test]
fn launch_reports_success_message() {
    let recorder = RecordingLauncher::default();
    let mut launcher = recorder.clone();

    let outcome = launch(&mut launcher, "  editor  --flag ");
    assert!(outcome.launched);
    assert_eq!(outcome.message, "Launching: editor  --flag");
    assert_eq!(recorder.spawned(), vec!["editor  --flag".to_string()]);
    assert!(recorder.executed().is_empty());
}

#[test]
fn launch_failure_becomes_message() {
    let mut launcher = RecordingLauncher::failing("no such file");
    let outcome = launch(&mut launcher, "missing-app");

    assert!(!outcome.launched);
    assert!(outcome.message.starts_with("Error launching application:"));
    assert!(outcome.message.contains("no such file"));
}

#[test]
fn empty_command_is_rejected() {
    let mut launcher = RecordingLauncher::default();
    assert_eq!(launcher.spawn_detached("   "), Err(LaunchError::EmptyCommand));
    assert_eq!(launcher.run_blocking(""), Err(LaunchError::EmptyCommand));
}

#[test]
fn run_shell_prefers_stdout_then_stderr() {
    let mut launcher = RecordingLauncher::with_output("total 0\n", "warning\n");
    assert_eq!(run_shell(&mut launcher, "ls"), "total 0\n");

    let mut launcher = RecordingLauncher::with_output("", "ls: cannot access\n");
    assert_eq!(run_shell(&mut launcher, "ls /nope"), "ls: cannot access\n");
}

#[test]
fn run_shell_failure_is_apology() {
    let mut launcher = RecordingLauncher::failing("boom");
    let text = run_shell(&mut launcher, "ls");
    assert!(text.starts_with("I'm sorry, but I encountered an error while executing the command:"));
}

#[test]
fn display_text_falls_back_to_stderr() {
    let output = ShellOutput {
        stdout: String::new(),
        stderr: "err".to_string(),
        status: Some(1),
    };
    assert_eq!(output.display_text(), "err");
}

#[cfg(unix)]
#[test]
fn system_launcher_captures_output() {
    let mut launcher = SystemLauncher::default();
    let output = launcher.run_blocking("printf hello; printf oops >&2").unwrap();
    assert_eq!(output.stdout, "hello");
    assert_eq!(output.stderr, "oops");
    assert_eq!(output.status, Some(0));
}

#[cfg(unix)]
#[test]
fn system_launcher_spawns_detached() {
    let mut launcher = SystemLauncher::default();
    assert!(launcher.spawn_detached("true").is_ok());
}

#[test]
fn missing_shell_is_spawn_failure() {
    let mut launcher = SystemLauncher::with_shell("/definitely/not/a/shell".into());
    let error = launcher.run_blocking("ls").unwrap_err();
    assert!(matches!(error, LaunchError::SpawnFailed { .. }));
}

//! Local command execution primitives.

use std::process::Command;

/// Captured output of a finished local or remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("Command error: {}", err),
            success: false,
            exit_code: -1,
        }
    }
}

/// Run a shell command on the operator's machine.
pub fn run_shell(command: &str) -> CommandOutput {
    run_shell_in(command, None)
}

/// Run a shell command on the operator's machine in a specific directory.
pub fn run_shell_in(command: &str, current_dir: Option<&str>) -> CommandOutput {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    match cmd.output() {
        Ok(out) => CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput::from_io_error(&e),
    }
}

/// Extract error text from captured output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &CommandOutput) -> &str {
    if output.stderr.trim().is_empty() {
        output.stdout.trim()
    } else {
        output.stderr.trim()
    }
}

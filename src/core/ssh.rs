use std::path::Path;
use std::process::Command;

use crate::env::HostSpec;
use crate::error::{Error, Result};
use crate::utils::command::{self, CommandOutput};
use crate::utils::shell;

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the target host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

impl SshClient {
    pub fn connect(spec: &HostSpec, identity_file: Option<&str>) -> Result<Self> {
        let identity_file = match identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(expanded));
                }
                Some(expanded)
            }
            _ => None,
        };

        let is_local = is_local_host(&spec.host);
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", spec.host);
        }

        Ok(Self {
            host: spec.host.clone(),
            user: spec.user.clone(),
            port: spec.port,
            identity_file,
            is_local,
        })
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Timeout and keepalive options prevent hangs on stalled
        // connections or unexpected prompts.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        args
    }

    /// Run a shell command on the target host as the connection user.
    pub fn execute(&self, command: &str) -> CommandOutput {
        if self.is_local {
            return command::run_shell(command);
        }

        let args = self.build_ssh_args(command);
        let output = Command::new("ssh").args(&args).output();

        match output {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("SSH error: {}", e),
                success: false,
                exit_code: -1,
            },
        }
    }

    /// Run a command as root via sudo.
    pub fn execute_sudo(&self, command: &str) -> CommandOutput {
        self.execute(&sudo_command(None, command))
    }

    /// Run a command as a specific user via sudo -u.
    pub fn execute_as(&self, user: &str, command: &str) -> CommandOutput {
        self.execute(&sudo_command(Some(user), command))
    }

    /// Like [`execute`](Self::execute), but a non-zero exit becomes an error.
    pub fn execute_checked(&self, command: &str) -> Result<CommandOutput> {
        let output = self.execute(command);
        self.check(command, output)
    }

    /// Like [`execute_sudo`](Self::execute_sudo), but a non-zero exit becomes an error.
    pub fn execute_sudo_checked(&self, command: &str) -> Result<CommandOutput> {
        let output = self.execute_sudo(command);
        self.check(command, output)
    }

    /// Like [`execute_as`](Self::execute_as), but a non-zero exit becomes an error.
    pub fn execute_as_checked(&self, user: &str, command: &str) -> Result<CommandOutput> {
        let output = self.execute_as(user, command);
        self.check(command, output)
    }

    fn check(&self, command: &str, output: CommandOutput) -> Result<CommandOutput> {
        if output.success {
            Ok(output)
        } else {
            Err(Error::remote_command_failed(&self.host, command, &output))
        }
    }

    /// Copy a local file to the target host via scp.
    pub fn upload_file(&self, local_path: &Path, remote_path: &str) -> CommandOutput {
        if self.is_local {
            let cp = format!(
                "cp {} {}",
                shell::quote_path(&local_path.to_string_lossy()),
                shell::quote_path(remote_path)
            );
            return command::run_shell(&cp);
        }

        let mut args: Vec<String> = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.extend(["-i".to_string(), identity_file.clone()]);
        }

        if self.port != 22 {
            args.extend(["-P".to_string(), self.port.to_string()]);
        }

        args.push(local_path.to_string_lossy().to_string());
        args.push(format!("{}@{}:{}", self.user, self.host, remote_path));

        match Command::new("scp").args(&args).output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("SCP error: {}", e),
                success: false,
                exit_code: -1,
            },
        }
    }

    pub fn upload_file_checked(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let output = self.upload_file(local_path, remote_path);
        if output.success {
            Ok(())
        } else {
            let label = format!("scp {} -> {}", local_path.display(), remote_path);
            Err(Error::remote_command_failed(&self.host, label, &output))
        }
    }
}

/// Wrap a command for sudo execution, optionally as a specific user.
pub fn sudo_command(user: Option<&str>, command: &str) -> String {
    match user {
        Some(user) => format!(
            "sudo -u {} sh -c {}",
            shell::quote_arg(user),
            shell::escape_command_for_shell(command)
        ),
        None => format!("sudo sh -c {}", shell::escape_command_for_shell(command)),
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SshClient {
        SshClient {
            host: "web1.example.org".to_string(),
            user: "deploy".to_string(),
            port: 22,
            identity_file: None,
            is_local: false,
        }
    }

    #[test]
    fn ssh_args_use_batch_mode() {
        let args = client().build_ssh_args("uptime");
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert_eq!(args.last().unwrap(), "uptime");
        assert!(args.contains(&"deploy@web1.example.org".to_string()));
    }

    #[test]
    fn ssh_args_omit_port_flag_for_default_port() {
        let args = client().build_ssh_args("uptime");
        assert!(!args.contains(&"-p".to_string()));
    }

    #[test]
    fn ssh_args_include_nonstandard_port() {
        let mut c = client();
        c.port = 2222;
        let args = c.build_ssh_args("uptime");
        assert!(args.contains(&"-p".to_string()));
        assert!(args.contains(&"2222".to_string()));
    }

    #[test]
    fn sudo_command_as_user_quotes_payload() {
        assert_eq!(
            sudo_command(Some("wwwdata"), "mkdir /srv/app/releases/1.0"),
            "sudo -u wwwdata sh -c 'mkdir /srv/app/releases/1.0'"
        );
    }

    #[test]
    fn sudo_command_as_root() {
        assert_eq!(
            sudo_command(None, "aptitude install -y g++"),
            "sudo sh -c 'aptitude install -y g++'"
        );
    }

    #[test]
    fn sudo_command_escapes_embedded_quotes() {
        let wrapped = sudo_command(Some("wwwdata"), "echo 'hi'");
        assert_eq!(wrapped, "sudo -u wwwdata sh -c 'echo '\\''hi'\\'''");
    }

    #[test]
    fn localhost_is_detected() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("127.0.0.1"));
        assert!(!is_local_host("web1.example.org"));
    }
}

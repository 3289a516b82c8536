//! Release tarball creation from a git branch on the operator's machine.

use crate::error::{Error, Result};
use crate::utils::command;

/// Build the archive shell command.
///
/// The prefix token is `--prefix=<value>` when non-empty and an empty
/// string otherwise; the surrounding spaces are kept either way.
pub fn archive_command(
    branch: &str,
    filename: &str,
    path: &str,
    prefix: &str,
    format: &str,
) -> String {
    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        format!("--prefix={}", prefix)
    };

    format!(
        "cd {path}; git archive --format={format} {prefix} {branch} | gzip > {filename}",
        path = path,
        format = format,
        prefix = prefix,
        branch = branch,
        filename = filename,
    )
}

/// Create a compressed archive of `branch` at `path/filename`.
///
/// The branch is not validated; a missing branch surfaces as the git
/// command's non-zero exit.
pub fn create(branch: &str, filename: &str, path: &str, prefix: &str, format: &str) -> Result<()> {
    let cmd = archive_command(branch, filename, path, prefix, format);
    log_status!("archive", "{}", cmd);

    let output = command::run_shell(&cmd);
    if output.success {
        Ok(())
    } else {
        log_status!("archive", "git archive failed: {}", command::error_text(&output));
        Err(Error::local_command_failed(cmd, &output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_with_empty_prefix() {
        assert_eq!(
            archive_command("master", "1.0.tar.gz", "/tmp", "", "tar"),
            "cd /tmp; git archive --format=tar  master | gzip > 1.0.tar.gz"
        );
    }

    #[test]
    fn command_with_prefix() {
        let cmd = archive_command("master", "1.0.tar.gz", "/tmp", "proj-", "tar");
        assert!(cmd.contains("--prefix=proj-"));
        assert_eq!(
            cmd,
            "cd /tmp; git archive --format=tar --prefix=proj- master | gzip > 1.0.tar.gz"
        );
    }

    #[test]
    fn missing_branch_surfaces_as_local_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().display().to_string();

        // Not a git repository, so git archive exits non-zero.
        let err = create("master", "x.tar.gz", &path, "", "tar").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::LocalCommandFailed);
    }
}

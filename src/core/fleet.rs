//! Per-host task dispatch with independent success/failure tracking.
//!
//! Hosts run sequentially; one failing host does not stop later hosts, and
//! every host's outcome lands in the aggregated report.

use serde::Serialize;

use crate::env::RawEnv;
use crate::error::Result;
use crate::ssh::SshClient;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOutcome {
    pub host: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl HostOutcome {
    fn ok(host: &str) -> Self {
        Self {
            host: host.to_string(),
            status: "ok".to_string(),
            error: None,
            error_code: None,
        }
    }

    fn failed(host: &str, err: &crate::error::Error) -> Self {
        Self {
            host: host.to_string(),
            status: "failed".to_string(),
            error: Some(err.message.clone()),
            error_code: Some(err.code.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total: u32,
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetReport {
    pub hosts: Vec<HostOutcome>,
    pub summary: FleetSummary,
}

impl FleetReport {
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed > 0 {
            20
        } else {
            0
        }
    }
}

/// Run a task against every configured host, collecting per-host outcomes.
///
/// Host-spec or identity-file problems abort before dispatch; task failures
/// are captured per host and never short-circuit the remaining hosts.
pub fn run_on_hosts<F>(env: &RawEnv, task: F) -> Result<FleetReport>
where
    F: Fn(&SshClient) -> Result<()>,
{
    let specs = env.host_specs()?;

    let mut hosts = Vec::with_capacity(specs.len());
    let mut succeeded: u32 = 0;
    let mut failed: u32 = 0;

    for spec in &specs {
        let client = SshClient::connect(spec, env.identity_file.as_deref())?;

        match task(&client) {
            Ok(()) => {
                hosts.push(HostOutcome::ok(&spec.host));
                succeeded += 1;
            }
            Err(err) => {
                log_status!("fleet", "{} failed: {}", spec.host, err.message);
                hosts.push(HostOutcome::failed(&spec.host, &err));
                failed += 1;
            }
        }
    }

    Ok(FleetReport {
        hosts,
        summary: FleetSummary {
            total: succeeded + failed,
            succeeded,
            failed,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::utils::command::CommandOutput;

    fn env_with_hosts(hosts: &[&str]) -> RawEnv {
        RawEnv {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..RawEnv::default()
        }
    }

    fn fail_for(host: &str) -> Error {
        let output = CommandOutput {
            stdout: String::new(),
            stderr: "mv: cannot stat".to_string(),
            success: false,
            exit_code: 1,
        };
        Error::remote_command_failed(host, "mv current previous", &output)
    }

    #[test]
    fn one_failing_host_does_not_stop_the_rest() {
        let env = env_with_hosts(&["deploy@a.example.org", "deploy@b.example.org"]);

        let report = run_on_hosts(&env, |client| {
            if client.host == "a.example.org" {
                Err(fail_for(&client.host))
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.hosts[0].status, "failed");
        assert_eq!(
            report.hosts[0].error_code.as_deref(),
            Some("remote.command_failed")
        );
        assert_eq!(report.hosts[1].status, "ok");
    }

    #[test]
    fn failed_report_maps_to_exit_code_20() {
        let env = env_with_hosts(&["deploy@a.example.org"]);
        let report = run_on_hosts(&env, |client| Err(fail_for(&client.host))).unwrap();
        assert_eq!(report.exit_code(), 20);
    }

    #[test]
    fn clean_report_maps_to_exit_code_0() {
        let env = env_with_hosts(&["deploy@a.example.org"]);
        let report = run_on_hosts(&env, |_| Ok(())).unwrap();
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn no_hosts_is_a_config_error() {
        let env = RawEnv::default();
        assert!(run_on_hosts(&env, |_| Ok(())).is_err());
    }
}

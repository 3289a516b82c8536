use clap::Args;
use serde::Serialize;

use stagehand::configure::{self, ConfigureOpts, ConfigureResult};
use stagehand::fleet::FleetReport;
use stagehand::{packages, release};

use super::CmdResult;

/// Install dependencies, link the release as current, and write its
/// config, in that order. A phase with failed hosts stops the run; later
/// phases assume the earlier ones landed.
#[derive(Args)]
pub struct InstallArgs {
    /// Xapian release to download and build
    #[arg(long, default_value = packages::DEFAULT_XAPIAN_VERSION)]
    pub xapian_version: String,
}

#[derive(Serialize)]
pub struct InstallOutput {
    pub command: String,
    pub deps: FleetReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<FleetReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure: Option<ConfigureResult>,
}

pub fn run(args: InstallArgs, global: &super::GlobalArgs) -> CmdResult<InstallOutput> {
    let env = super::load_env(global)?;

    let deps = packages::run(&env, &args.xapian_version)?;
    if deps.summary.failed > 0 {
        let exit_code = deps.exit_code();
        return Ok((
            InstallOutput {
                command: "install".to_string(),
                deps,
                link: None,
                configure: None,
            },
            exit_code,
        ));
    }

    let link = release::run_link(&env)?;
    if link.summary.failed > 0 {
        let exit_code = link.exit_code();
        return Ok((
            InstallOutput {
                command: "install".to_string(),
                deps,
                link: Some(link),
                configure: None,
            },
            exit_code,
        ));
    }

    let configured = configure::run(&env, &ConfigureOpts::default())?;
    let exit_code = configured.report.exit_code();

    Ok((
        InstallOutput {
            command: "install".to_string(),
            deps,
            link: Some(link),
            configure: Some(configured),
        },
        exit_code,
    ))
}

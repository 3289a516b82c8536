use clap::Args;
use serde::Serialize;

use stagehand::fleet::FleetReport;
use stagehand::release;

use super::CmdResult;

#[derive(Args)]
pub struct LinkArgs {}

#[derive(Serialize)]
pub struct LinkOutput {
    pub command: String,
    pub report: FleetReport,
}

pub fn run(_args: LinkArgs, global: &super::GlobalArgs) -> CmdResult<LinkOutput> {
    let env = super::load_env(global)?;
    let report = release::run_link(&env)?;
    let exit_code = report.exit_code();

    Ok((
        LinkOutput {
            command: "link".to_string(),
            report,
        },
        exit_code,
    ))
}

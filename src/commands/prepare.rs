use clap::Args;
use serde::Serialize;

use stagehand::fleet::FleetReport;
use stagehand::provision;

use super::CmdResult;

#[derive(Args)]
pub struct PrepareArgs {}

#[derive(Serialize)]
pub struct PrepareOutput {
    pub command: String,
    pub report: FleetReport,
}

pub fn run(_args: PrepareArgs, global: &super::GlobalArgs) -> CmdResult<PrepareOutput> {
    let env = super::load_env(global)?;
    let report = provision::run(&env)?;
    let exit_code = report.exit_code();

    Ok((
        PrepareOutput {
            command: "prepare".to_string(),
            report,
        },
        exit_code,
    ))
}

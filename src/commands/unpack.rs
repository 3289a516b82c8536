use clap::Args;
use serde::Serialize;

use stagehand::fleet::FleetReport;
use stagehand::release;

use super::CmdResult;

#[derive(Args)]
pub struct UnpackArgs {}

#[derive(Serialize)]
pub struct UnpackOutput {
    pub command: String,
    pub report: FleetReport,
}

pub fn run(_args: UnpackArgs, global: &super::GlobalArgs) -> CmdResult<UnpackOutput> {
    let env = super::load_env(global)?;
    let report = release::run_unpack(&env)?;
    let exit_code = report.exit_code();

    Ok((
        UnpackOutput {
            command: "unpack".to_string(),
            report,
        },
        exit_code,
    ))
}

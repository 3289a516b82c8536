use clap::Args;
use serde::Serialize;

use stagehand::fleet::FleetReport;
use stagehand::release;

use super::CmdResult;

#[derive(Args)]
pub struct InitArgs {}

#[derive(Serialize)]
pub struct InitOutput {
    pub command: String,
    pub report: FleetReport,
}

pub fn run(_args: InitArgs, global: &super::GlobalArgs) -> CmdResult<InitOutput> {
    let env = super::load_env(global)?;
    let report = release::run_init(&env)?;
    let exit_code = report.exit_code();

    Ok((
        InitOutput {
            command: "init".to_string(),
            report,
        },
        exit_code,
    ))
}

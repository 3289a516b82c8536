use clap::Args;
use serde::Serialize;

use stagehand::fleet::FleetReport;
use stagehand::packages;

use super::CmdResult;

#[derive(Args)]
pub struct DepsArgs {
    /// Xapian release to download and build
    #[arg(long, default_value = packages::DEFAULT_XAPIAN_VERSION)]
    pub xapian_version: String,
}

#[derive(Serialize)]
pub struct DepsOutput {
    pub command: String,
    pub xapian_version: String,
    pub report: FleetReport,
}

pub fn run(args: DepsArgs, global: &super::GlobalArgs) -> CmdResult<DepsOutput> {
    let env = super::load_env(global)?;
    let report = packages::run(&env, &args.xapian_version)?;
    let exit_code = report.exit_code();

    Ok((
        DepsOutput {
            command: "deps".to_string(),
            xapian_version: args.xapian_version,
            report,
        },
        exit_code,
    ))
}

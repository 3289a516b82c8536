use clap::Args;
use serde::Serialize;

use stagehand::release::{self, UploadResult};

use super::CmdResult;

#[derive(Args)]
pub struct UploadArgs {
    /// Keep the local tarball after uploading
    #[arg(long)]
    pub keep_local: bool,
}

#[derive(Serialize)]
pub struct UploadOutput {
    pub command: String,
    #[serde(flatten)]
    pub result: UploadResult,
}

pub fn run(args: UploadArgs, global: &super::GlobalArgs) -> CmdResult<UploadOutput> {
    let env = super::load_env(global)?;
    let result = release::run_upload(&env, args.keep_local)?;
    let exit_code = result.report.exit_code();

    Ok((
        UploadOutput {
            command: "upload".to_string(),
            result,
        },
        exit_code,
    ))
}

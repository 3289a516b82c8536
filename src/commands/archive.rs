use clap::Args;
use serde::Serialize;

use stagehand::archive;

use super::CmdResult;

#[derive(Args)]
pub struct ArchiveArgs {
    /// Branch to archive
    #[arg(long)]
    pub branch: String,

    /// Tarball file name (e.g. 1.0.tar.gz)
    #[arg(long)]
    pub filename: String,

    /// Directory the tarball is written to
    #[arg(long)]
    pub path: String,

    /// Path prefix for entries inside the archive
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Format passed to git archive
    #[arg(long, default_value = "tar")]
    pub format: String,
}

#[derive(Serialize)]
pub struct ArchiveOutput {
    pub command: String,
    pub archive_command: String,
    pub tarball: String,
}

pub fn run(args: ArchiveArgs, _global: &super::GlobalArgs) -> CmdResult<ArchiveOutput> {
    if args.branch.is_empty() {
        return Err(stagehand::Error::validation_invalid_argument(
            "branch",
            "Branch name must not be empty",
        ));
    }
    if args.filename.is_empty() {
        return Err(stagehand::Error::validation_invalid_argument(
            "filename",
            "Tarball file name must not be empty",
        ));
    }

    archive::create(
        &args.branch,
        &args.filename,
        &args.path,
        &args.prefix,
        &args.format,
    )?;

    Ok((
        ArchiveOutput {
            command: "archive".to_string(),
            archive_command: archive::archive_command(
                &args.branch,
                &args.filename,
                &args.path,
                &args.prefix,
                &args.format,
            ),
            tarball: format!("{}/{}", args.path, args.filename),
        },
        0,
    ))
}

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{
    archive, configure, deps, env, init, install, link, prepare, unpack, upload, GlobalArgs,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(version = VERSION)]
#[command(about = "CLI for staging web application releases on remote hosts")]
struct Cli {
    /// Path to the environment file (defaults to ./stagehand.json)
    #[arg(long = "env-file", global = true, value_name = "FILE")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the base directory and virtualenv on each host
    Prepare(prepare::PrepareArgs),
    /// Create a release tarball from a git branch
    Archive(archive::ArchiveArgs),
    /// Archive the configured branch, upload it, and unpack it
    Upload(upload::UploadArgs),
    /// Unpack the uploaded tarball into the releases directory
    Unpack(unpack::UnpackArgs),
    /// Install dependencies, link the release, and write its config
    Install(install::InstallArgs),
    /// Install the application's packages into the virtualenv
    Deps(deps::DepsArgs),
    /// Point the current symlink at the configured version
    Link(link::LinkArgs),
    /// Generate conf/general.yml for the release
    Configure(configure::ConfigureArgs),
    /// Run schema sync, migrations, and static collection
    Init(init::InitArgs),
    /// Inspect or validate the deployment environment
    Env(env::EnvArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        env_file: cli.env_file.clone(),
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

use stagehand::env::RawEnv;

pub type CmdResult<T> = stagehand::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub env_file: Option<String>,
}

/// Load the deployment environment, honoring a `--env-file` override.
pub(crate) fn load_env(global: &GlobalArgs) -> stagehand::Result<RawEnv> {
    RawEnv::load(global.env_file.as_deref())
}

pub mod archive;
pub mod configure;
pub mod deps;
pub mod env;
pub mod init;
pub mod install;
pub mod link;
pub mod prepare;
pub mod unpack;
pub mod upload;

/// Dispatch a command to its handler and map the result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (stagehand::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Prepare(args) => dispatch!(args, global, prepare),
        crate::Commands::Archive(args) => dispatch!(args, global, archive),
        crate::Commands::Upload(args) => dispatch!(args, global, upload),
        crate::Commands::Unpack(args) => dispatch!(args, global, unpack),
        crate::Commands::Install(args) => dispatch!(args, global, install),
        crate::Commands::Deps(args) => dispatch!(args, global, deps),
        crate::Commands::Link(args) => dispatch!(args, global, link),
        crate::Commands::Configure(args) => dispatch!(args, global, configure),
        crate::Commands::Init(args) => dispatch!(args, global, init),
        crate::Commands::Env(args) => dispatch!(args, global, env),
    }
}

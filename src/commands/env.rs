use clap::{Args, Subcommand};
use serde::Serialize;

use stagehand::env::{EnvKey, RawEnv};

use super::CmdResult;

#[derive(Args)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub action: EnvAction,
}

#[derive(Subcommand)]
pub enum EnvAction {
    /// Print the resolved environment
    Show,
    /// Validate that every key a full deploy needs is present
    Check,
}

#[derive(Serialize)]
pub struct EnvOutput {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<RawEnv>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_keys: Option<Vec<String>>,
}

pub fn run(args: EnvArgs, global: &super::GlobalArgs) -> CmdResult<EnvOutput> {
    let env = super::load_env(global)?;
    let source = env.source_path.clone();

    match args.action {
        EnvAction::Show => Ok((
            EnvOutput {
                command: "env.show".to_string(),
                source,
                env: Some(env),
                checked_keys: None,
            },
            0,
        )),
        EnvAction::Check => {
            env.require(EnvKey::all())?;
            Ok((
                EnvOutput {
                    command: "env.check".to_string(),
                    source,
                    env: None,
                    checked_keys: Some(
                        EnvKey::all().iter().map(|k| k.name().to_string()).collect(),
                    ),
                },
                0,
            ))
        }
    }
}

use clap::Args;
use serde::Serialize;

use stagehand::configure::{self, ConfigureOpts, ConfigureResult};

use super::CmdResult;

#[derive(Args)]
pub struct ConfigureArgs {
    /// Database name
    #[arg(long, default_value = "odekro")]
    pub dbname: String,

    /// Database user
    #[arg(long, default_value = "postgres")]
    pub dbuser: String,

    /// Database password
    #[arg(long, default_value = "")]
    pub dbpass: String,

    /// Database host
    #[arg(long, default_value = "localhost")]
    pub dbhost: String,

    /// Application time zone
    #[arg(long, default_value = "Africa/Accra")]
    pub timezone: String,
}

impl ConfigureArgs {
    fn opts(&self) -> ConfigureOpts {
        ConfigureOpts {
            dbname: self.dbname.clone(),
            dbuser: self.dbuser.clone(),
            dbpass: self.dbpass.clone(),
            dbhost: self.dbhost.clone(),
            timezone: self.timezone.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct ConfigureOutput {
    pub command: String,
    #[serde(flatten)]
    pub result: ConfigureResult,
}

pub fn run(args: ConfigureArgs, global: &super::GlobalArgs) -> CmdResult<ConfigureOutput> {
    let env = super::load_env(global)?;
    let result = configure::run(&env, &args.opts())?;
    let exit_code = result.report.exit_code();

    Ok((
        ConfigureOutput {
            command: "configure".to_string(),
            result,
        },
        exit_code,
    ))
}

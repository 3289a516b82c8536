//! Fresh-host provisioning: base directories and the virtualenv.

use crate::env::{EnvKey, RawEnv};
use crate::error::Result;
use crate::fleet::{self, FleetReport};

/// Root-level commands that set up `basedir` on a host.
pub fn prepare_commands(basedir: &str, webapp_user: &str) -> Vec<String> {
    vec![
        format!(
            "mkdir -p {basedir}/releases; \
             mkdir -p {basedir}/shared; \
             mkdir -p {basedir}/packages; \
             virtualenv --python=python2.7 {basedir}",
            basedir = basedir
        ),
        format!(
            "cd {basedir} && chown -R {user}:{user} .",
            basedir = basedir,
            user = webapp_user
        ),
    ]
}

/// Set up a fresh virtualenv as well as a few useful directories.
pub fn run(env: &RawEnv) -> Result<FleetReport> {
    env.require(&[EnvKey::Hosts, EnvKey::Basedir, EnvKey::WebappUser])?;

    let basedir = env.basedir()?;
    let webapp_user = env.webapp_user()?;
    let commands = prepare_commands(basedir, webapp_user);

    fleet::run_on_hosts(env, |client| {
        log_status!("prepare", "Provisioning {} on {}", basedir, client.host);
        for cmd in &commands {
            client.execute_sudo_checked(cmd)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_creates_layout_then_hands_over_ownership() {
        let commands = prepare_commands("/srv/app", "wwwdata");
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("mkdir -p /srv/app/releases"));
        assert!(commands[0].contains("mkdir -p /srv/app/shared"));
        assert!(commands[0].contains("mkdir -p /srv/app/packages"));
        assert!(commands[0].contains("virtualenv --python=python2.7 /srv/app"));
        assert_eq!(commands[1], "cd /srv/app && chown -R wwwdata:wwwdata .");
    }

    #[test]
    fn run_validates_keys_before_dispatch() {
        let env = RawEnv::default();
        let err = run(&env).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigMissingKey);
        assert!(err.message.contains("webapp_user"));
    }
}

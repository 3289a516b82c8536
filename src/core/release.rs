//! The release pipeline: upload, unpack, link-current, app init.

use std::path::Path;

use serde::Serialize;

use crate::archive;
use crate::env::{EnvKey, RawEnv};
use crate::error::{Error, Result};
use crate::fleet::{self, FleetReport};

pub fn tarball_name(version: &str) -> String {
    format!("{}.tar.gz", version)
}

/// Commands that unpack an uploaded tarball into the releases directory.
///
/// `mkdir` is deliberately not `-p`: a release directory that already
/// exists is a conflict, not something to silently reuse.
pub fn unpack_commands(basedir: &str, version: &str) -> Vec<String> {
    vec![
        format!("mkdir {basedir}/releases/{version}"),
        format!("tar zxf {basedir}/packages/{version}.tar.gz -C {basedir}/releases/{version}"),
    ]
}

/// Commands that point the `current` symlink at a release, keeping the
/// replaced release as `previous`.
///
/// Removing `previous` is guarded by an existence check; the `mv` of
/// `current` is not, so a missing `current` surfaces as that step's
/// failure. Failure partway leaves `current` missing; there is no rollback.
pub fn link_commands(basedir: &str, version: &str) -> Vec<String> {
    vec![
        format!(
            "if [ -L {basedir}/releases/previous ]; then rm {basedir}/releases/previous; fi"
        ),
        format!("mv {basedir}/releases/current {basedir}/releases/previous"),
        format!("ln -s {basedir}/releases/{version} {basedir}/releases/current"),
    ]
}

/// Schema sync, migrations, and static collection inside the current
/// release, with the virtualenv's bin directory first on PATH.
pub fn init_commands(basedir: &str, project: &str) -> Vec<String> {
    [
        "python manage.py syncdb --noinput --verbosity=1",
        "python manage.py migrate --noinput --verbosity=1",
        "python manage.py collectstatic --noinput",
    ]
    .iter()
    .map(|manage| {
        format!(
            "cd {basedir}/releases/current/{project} && PATH={basedir}/bin:$PATH {manage}",
            basedir = basedir,
            project = project,
            manage = manage
        )
    })
    .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub tarball: String,
    pub removed_local: bool,
    pub report: FleetReport,
}

/// Create an archive from the configured branch and upload it to each host.
///
/// The tarball lands in `basedir/packages/` and is unpacked immediately.
/// The local copy is deleted afterwards unless `keep_local` is set.
pub fn run_upload(env: &RawEnv, keep_local: bool) -> Result<UploadResult> {
    env.require(&[
        EnvKey::Hosts,
        EnvKey::Basedir,
        EnvKey::WebappUser,
        EnvKey::Version,
        EnvKey::Project,
        EnvKey::GitBranch,
        EnvKey::LocalRoot,
    ])?;

    let basedir = env.basedir()?;
    let webapp_user = env.webapp_user()?;
    let version = env.version()?;
    let branch = env.git_branch()?;
    let local_root = env.local_root()?;

    let filename = tarball_name(version);
    let path = archive_dir(local_root);
    archive::create(branch, &filename, &path, "", "tar")?;

    let tarball = Path::new(&path).join(&filename);
    let unpack = unpack_commands(basedir, version);

    let report = fleet::run_on_hosts(env, |client| {
        log_status!("upload", "Uploading {} to {}", filename, client.host);

        // Stage through /tmp so the upload does not depend on the
        // connection user having write access to basedir.
        let staged = format!("/tmp/{}", filename);
        client.upload_file_checked(&tarball, &staged)?;
        client.execute_sudo_checked(&format!(
            "mv {} {}/packages/{}",
            staged, basedir, filename
        ))?;

        for cmd in &unpack {
            client.execute_as_checked(webapp_user, cmd)?;
        }
        Ok(())
    })?;

    let mut removed_local = false;
    if !keep_local {
        std::fs::remove_file(&tarball).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("remove {}", tarball.display())),
            )
        })?;
        removed_local = true;
    }

    Ok(UploadResult {
        tarball: tarball.display().to_string(),
        removed_local,
        report,
    })
}

/// Unpack an already-uploaded tarball into the releases directory.
pub fn run_unpack(env: &RawEnv) -> Result<FleetReport> {
    env.require(&[
        EnvKey::Hosts,
        EnvKey::Basedir,
        EnvKey::WebappUser,
        EnvKey::Version,
    ])?;

    let webapp_user = env.webapp_user()?;
    let commands = unpack_commands(env.basedir()?, env.version()?);

    fleet::run_on_hosts(env, |client| {
        for cmd in &commands {
            client.execute_as_checked(webapp_user, cmd)?;
        }
        Ok(())
    })
}

/// Symlink the configured version as the current release.
pub fn run_link(env: &RawEnv) -> Result<FleetReport> {
    env.require(&[
        EnvKey::Hosts,
        EnvKey::Basedir,
        EnvKey::WebappUser,
        EnvKey::Version,
    ])?;

    let webapp_user = env.webapp_user()?;
    let version = env.version()?;
    let commands = link_commands(env.basedir()?, version);

    fleet::run_on_hosts(env, |client| {
        log_status!("link", "Linking {} as current on {}", version, client.host);
        for cmd in &commands {
            client.execute_as_checked(webapp_user, cmd)?;
        }
        Ok(())
    })
}

/// Run the app's schema sync, migrations, and static collection.
pub fn run_init(env: &RawEnv) -> Result<FleetReport> {
    env.require(&[
        EnvKey::Hosts,
        EnvKey::Basedir,
        EnvKey::WebappUser,
        EnvKey::Project,
    ])?;

    let webapp_user = env.webapp_user()?;
    let commands = init_commands(env.basedir()?, env.project()?);

    fleet::run_on_hosts(env, |client| {
        for cmd in &commands {
            client.execute_as_checked(webapp_user, cmd)?;
        }
        Ok(())
    })
}

/// The directory the tarball is written to: the parent of the checkout root.
fn archive_dir(local_root: &str) -> String {
    Path::new(local_root)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_refuses_existing_release_dir() {
        let commands = unpack_commands("/srv/app", "1.2");
        // Plain mkdir: the second run for the same version must fail.
        assert_eq!(commands[0], "mkdir /srv/app/releases/1.2");
        assert_eq!(
            commands[1],
            "tar zxf /srv/app/packages/1.2.tar.gz -C /srv/app/releases/1.2"
        );
    }

    #[test]
    fn link_guards_previous_but_not_current() {
        let commands = link_commands("/srv/app", "1.2");
        assert_eq!(
            commands[0],
            "if [ -L /srv/app/releases/previous ]; then rm /srv/app/releases/previous; fi"
        );
        // Unguarded: a missing current symlink surfaces as this step failing.
        assert_eq!(
            commands[1],
            "mv /srv/app/releases/current /srv/app/releases/previous"
        );
        assert_eq!(
            commands[2],
            "ln -s /srv/app/releases/1.2 /srv/app/releases/current"
        );
    }

    #[test]
    fn init_runs_manage_commands_with_venv_path() {
        let commands = init_commands("/srv/app", "odekro");
        assert_eq!(commands.len(), 3);
        for cmd in &commands {
            assert!(cmd.starts_with("cd /srv/app/releases/current/odekro && "));
            assert!(cmd.contains("PATH=/srv/app/bin:$PATH"));
        }
        assert!(commands[0].contains("syncdb --noinput --verbosity=1"));
        assert!(commands[1].contains("migrate --noinput --verbosity=1"));
        assert!(commands[2].contains("collectstatic --noinput"));
    }

    #[test]
    fn tarball_is_named_after_version() {
        assert_eq!(tarball_name("2024.03"), "2024.03.tar.gz");
    }

    #[test]
    fn archive_dir_is_parent_of_checkout() {
        assert_eq!(archive_dir("/home/op/src/odekro"), "/home/op/src");
        assert_eq!(archive_dir("odekro"), ".");
    }

    #[test]
    fn upload_validates_keys_before_archiving() {
        let env = RawEnv {
            hosts: vec!["deploy@web1".to_string()],
            ..RawEnv::default()
        };
        let err = run_upload(&env, false).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigMissingKey);
        assert!(err.message.contains("git_branch"));
        assert!(err.message.contains("local_root"));
    }
}

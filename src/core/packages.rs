//! Dependency installation into the remote virtualenv: the geospatial
//! binding, the search-index library built from source, the application
//! server, and the pip requirements file.

use crate::env::{EnvKey, RawEnv};
use crate::error::Result;
use crate::fleet::{self, FleetReport};

pub const DEFAULT_XAPIAN_VERSION: &str = "1.2.12";
const XAPIAN_MIRROR: &str = "http://oligarchy.co.uk/xapian";

/// One remote installation step.
#[derive(Debug, Clone)]
pub struct PackageStep {
    pub command: String,
    /// Failure is logged and the sequence continues.
    pub best_effort: bool,
    /// Run as root instead of the application user.
    pub as_root: bool,
}

impl PackageStep {
    fn new(command: String) -> Self {
        Self {
            command,
            best_effort: false,
            as_root: false,
        }
    }

    fn best_effort(command: String) -> Self {
        Self {
            command,
            best_effort: true,
            as_root: false,
        }
    }

    fn as_root(command: String) -> Self {
        Self {
            command,
            best_effort: false,
            as_root: true,
        }
    }
}

/// GDAL: two-phase pip install around a native build of the extension.
/// The native build is best-effort; the final install step runs either way.
pub fn gdal_steps(basedir: &str) -> Vec<PackageStep> {
    vec![
        PackageStep::new(format!("cd {} && ./bin/pip install --no-install GDAL", basedir)),
        PackageStep::best_effort(format!(
            "cd {basedir}/build/GDAL && \
             {basedir}/bin/python setup.py build_ext --include-dirs=/usr/include/gdal/",
            basedir = basedir
        )),
        PackageStep::new(format!("cd {} && ./bin/pip install --no-download GDAL", basedir)),
    ]
}

/// Xapian core and bindings, built from source against the virtualenv.
/// Downloads and extractions are guarded by existence checks so a rerun
/// skips work already done.
pub fn xapian_steps(basedir: &str, version: &str) -> Vec<PackageStep> {
    let mut steps = vec![PackageStep::as_root(
        "aptitude install -y zlib1g-dev g++".to_string(),
    )];

    for pkg in ["core", "bindings"] {
        let tarfile = format!("xapian-{}-{}.tar.gz", pkg, version);
        let srcdir = format!("xapian-{}-{}", pkg, version);

        steps.push(PackageStep::new(format!(
            "cd {basedir}/packages && \
             if [ ! -e {tarfile} ]; then wget {mirror}/{version}/{tarfile}; fi",
            basedir = basedir,
            tarfile = tarfile,
            mirror = XAPIAN_MIRROR,
            version = version
        )));
        steps.push(PackageStep::new(format!(
            "cd {basedir}/packages && \
             if [ ! -e {srcdir} ]; then tar xzvf {tarfile}; fi",
            basedir = basedir,
            srcdir = srcdir,
            tarfile = tarfile
        )));
    }

    steps.push(PackageStep::new(format!(
        "cd {basedir}/packages/xapian-core-{version} && \
         PYTHON={basedir}/bin/python ./configure --prefix={basedir} && \
         make && make install",
        basedir = basedir,
        version = version
    )));

    steps.push(PackageStep::new(format!(
        "cd {basedir}/packages/xapian-bindings-{version} && \
         PYTHON={basedir}/bin/python LD_LIBRARY_PATH={basedir}/lib \
         ./configure XAPIAN_CONFIG={basedir}/bin/xapian-config \
         --prefix={basedir} --with-python && \
         make && make install",
        basedir = basedir,
        version = version
    )));

    steps
}

/// Force gunicorn into the virtualenv, shadowing any global install.
pub fn gunicorn_step(basedir: &str) -> PackageStep {
    PackageStep::new(format!("PATH={}/bin:$PATH pip install -I gunicorn", basedir))
}

/// Install the release's requirements file with the virtualenv's pip.
pub fn requirements_step(basedir: &str, version: &str, pip_requirements: &str) -> PackageStep {
    PackageStep::new(format!(
        "cd {basedir} && ./bin/pip install -r ./releases/{version}/{requirements}",
        basedir = basedir,
        version = version,
        requirements = pip_requirements
    ))
}

/// The full installation sequence for one host.
pub fn install_steps(
    basedir: &str,
    version: &str,
    pip_requirements: &str,
    xapian_version: &str,
) -> Vec<PackageStep> {
    let mut steps = gdal_steps(basedir);
    steps.extend(xapian_steps(basedir, xapian_version));
    steps.push(gunicorn_step(basedir));
    steps.push(requirements_step(basedir, version, pip_requirements));
    steps
}

/// Install the required packages on every host.
pub fn run(env: &RawEnv, xapian_version: &str) -> Result<FleetReport> {
    env.require(&[
        EnvKey::Hosts,
        EnvKey::Basedir,
        EnvKey::WebappUser,
        EnvKey::Version,
        EnvKey::Project,
        EnvKey::PipRequirements,
    ])?;

    let webapp_user = env.webapp_user()?;
    let steps = install_steps(
        env.basedir()?,
        env.version()?,
        env.pip_requirements()?,
        xapian_version,
    );

    fleet::run_on_hosts(env, |client| {
        for step in &steps {
            let result = if step.as_root {
                client.execute_sudo_checked(&step.command)
            } else {
                client.execute_as_checked(webapp_user, &step.command)
            };

            match result {
                Ok(_) => {}
                Err(err) if step.best_effort => {
                    log_status!("deps", "Continuing past optional step: {}", err.message);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gdal_native_build_is_best_effort() {
        let steps = gdal_steps("/srv/app");
        assert_eq!(steps.len(), 3);
        assert!(!steps[0].best_effort);
        assert!(steps[1].best_effort);
        assert!(!steps[2].best_effort);
        assert!(steps[1].command.contains("setup.py build_ext"));
        assert!(steps[1]
            .command
            .contains("--include-dirs=/usr/include/gdal/"));
        assert!(steps[2].command.contains("pip install --no-download GDAL"));
    }

    #[test]
    fn xapian_downloads_are_guarded() {
        let steps = xapian_steps("/srv/app", "1.2.12");

        let wget = &steps[1].command;
        assert!(wget.contains("if [ ! -e xapian-core-1.2.12.tar.gz ]"));
        assert!(wget.contains(
            "wget http://oligarchy.co.uk/xapian/1.2.12/xapian-core-1.2.12.tar.gz"
        ));

        let extract = &steps[2].command;
        assert!(extract.contains("if [ ! -e xapian-core-1.2.12 ]"));
        assert!(extract.contains("tar xzvf xapian-core-1.2.12.tar.gz"));
    }

    #[test]
    fn xapian_toolchain_prep_runs_as_root() {
        let steps = xapian_steps("/srv/app", "1.2.12");
        assert!(steps[0].as_root);
        assert_eq!(steps[0].command, "aptitude install -y zlib1g-dev g++");
        assert!(steps[1..].iter().all(|s| !s.as_root));
    }

    #[test]
    fn xapian_bindings_build_against_installed_core() {
        let steps = xapian_steps("/srv/app", "1.2.12");
        let bindings = &steps.last().unwrap().command;
        assert!(bindings.contains("cd /srv/app/packages/xapian-bindings-1.2.12"));
        assert!(bindings.contains("LD_LIBRARY_PATH=/srv/app/lib"));
        assert!(bindings.contains("XAPIAN_CONFIG=/srv/app/bin/xapian-config"));
        assert!(bindings.contains("--with-python"));
        assert!(bindings.ends_with("make && make install"));
    }

    #[test]
    fn gunicorn_is_force_reinstalled_in_venv() {
        let step = gunicorn_step("/srv/app");
        assert_eq!(
            step.command,
            "PATH=/srv/app/bin:$PATH pip install -I gunicorn"
        );
    }

    #[test]
    fn requirements_install_uses_release_file() {
        let step = requirements_step("/srv/app", "1.2", "requirements.txt");
        assert_eq!(
            step.command,
            "cd /srv/app && ./bin/pip install -r ./releases/1.2/requirements.txt"
        );
    }

    #[test]
    fn install_sequence_ends_with_requirements() {
        let steps = install_steps("/srv/app", "1.2", "requirements.txt", "1.2.12");
        assert!(steps.last().unwrap().command.contains("pip install -r"));
        assert!(steps
            .iter()
            .any(|s| s.command.contains("pip install -I gunicorn")));
    }

    #[test]
    fn run_validates_keys_before_dispatch() {
        let env = RawEnv::default();
        let err = run(&env, DEFAULT_XAPIAN_VERSION).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigMissingKey);
        assert!(err.message.contains("pip_requirements"));
    }
}

//! The deployment environment: every recipe's named settings, loaded once
//! per invocation and validated before any command is issued.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const ENV_FILE: &str = "stagehand.json";

/// Named environment settings a recipe can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKey {
    Hosts,
    Basedir,
    WebappUser,
    Version,
    Project,
    GitBranch,
    LocalRoot,
    PipRequirements,
}

impl EnvKey {
    pub fn name(&self) -> &'static str {
        match self {
            EnvKey::Hosts => "hosts",
            EnvKey::Basedir => "basedir",
            EnvKey::WebappUser => "webapp_user",
            EnvKey::Version => "version",
            EnvKey::Project => "project",
            EnvKey::GitBranch => "git_branch",
            EnvKey::LocalRoot => "local_root",
            EnvKey::PipRequirements => "pip_requirements",
        }
    }

    /// Every key a full deploy run touches, for `env check`.
    pub fn all() -> &'static [EnvKey] {
        &[
            EnvKey::Hosts,
            EnvKey::Basedir,
            EnvKey::WebappUser,
            EnvKey::Version,
            EnvKey::Project,
            EnvKey::GitBranch,
            EnvKey::LocalRoot,
            EnvKey::PipRequirements,
        ]
    }
}

/// One target host, written in the environment file as `user@host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSpec {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl HostSpec {
    pub fn parse(entry: &str) -> Result<Self> {
        let (user, rest) = entry
            .split_once('@')
            .ok_or_else(|| Error::ssh_host_invalid(entry, "missing user (expected user@host)"))?;

        if user.is_empty() {
            return Err(Error::ssh_host_invalid(entry, "empty user"));
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| {
                    Error::ssh_host_invalid(entry, format!("invalid port '{}'", port))
                })?;
                (host, port)
            }
            None => (rest, 22),
        };

        if host.is_empty() {
            return Err(Error::ssh_host_invalid(entry, "empty host"));
        }

        Ok(Self {
            user: user.to_string(),
            host: host.to_string(),
            port,
        })
    }
}

/// The environment file as written: everything optional. Recipes call
/// [`RawEnv::require`] with the keys they need before issuing any command;
/// absence is a typed configuration error, not a mid-recipe lookup failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEnv {
    pub hosts: Vec<String>,
    pub basedir: Option<String>,
    pub webapp_user: Option<String>,
    pub version: Option<String>,
    pub project: Option<String>,
    pub git_branch: Option<String>,
    pub local_root: Option<String>,
    pub pip_requirements: Option<String>,
    pub identity_file: Option<String>,

    #[serde(skip)]
    pub source_path: Option<String>,
}

impl RawEnv {
    /// Load the environment file: an explicit path if given, otherwise
    /// `./stagehand.json`, then `~/.config/stagehand/stagehand.json`.
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load_from(path);
        }

        let mut tried = Vec::new();

        let local = PathBuf::from(ENV_FILE);
        if local.exists() {
            return Self::load_from(ENV_FILE);
        }
        tried.push(local.display().to_string());

        let global = config_dir()?.join(ENV_FILE);
        if global.exists() {
            return Self::load_from(&global.display().to_string());
        }
        tried.push(global.display().to_string());

        Err(Error::config_file_not_found(tried))
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", path))))?;

        let mut env: RawEnv =
            serde_json::from_str(&raw).map_err(|e| Error::config_invalid_json(path, e))?;
        env.source_path = Some(path.to_string());
        Ok(env)
    }

    /// Check that every named key is present, reporting all missing keys in
    /// one error. Recipes call this before issuing any command.
    pub fn require(&self, keys: &[EnvKey]) -> Result<()> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.has(**key))
            .map(|key| key.name().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::config_missing_keys(missing, self.source_path.clone()))
        }
    }

    fn has(&self, key: EnvKey) -> bool {
        match key {
            EnvKey::Hosts => !self.hosts.is_empty(),
            _ => self.get(key).is_some(),
        }
    }

    fn get(&self, key: EnvKey) -> Option<&str> {
        let value = match key {
            EnvKey::Hosts => None,
            EnvKey::Basedir => self.basedir.as_deref(),
            EnvKey::WebappUser => self.webapp_user.as_deref(),
            EnvKey::Version => self.version.as_deref(),
            EnvKey::Project => self.project.as_deref(),
            EnvKey::GitBranch => self.git_branch.as_deref(),
            EnvKey::LocalRoot => self.local_root.as_deref(),
            EnvKey::PipRequirements => self.pip_requirements.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    fn required(&self, key: EnvKey) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            Error::config_missing_keys(vec![key.name().to_string()], self.source_path.clone())
        })
    }

    pub fn basedir(&self) -> Result<&str> {
        self.required(EnvKey::Basedir)
    }

    pub fn webapp_user(&self) -> Result<&str> {
        self.required(EnvKey::WebappUser)
    }

    pub fn version(&self) -> Result<&str> {
        self.required(EnvKey::Version)
    }

    pub fn project(&self) -> Result<&str> {
        self.required(EnvKey::Project)
    }

    pub fn git_branch(&self) -> Result<&str> {
        self.required(EnvKey::GitBranch)
    }

    pub fn local_root(&self) -> Result<&str> {
        self.required(EnvKey::LocalRoot)
    }

    pub fn pip_requirements(&self) -> Result<&str> {
        self.required(EnvKey::PipRequirements)
    }

    pub fn host_specs(&self) -> Result<Vec<HostSpec>> {
        if self.hosts.is_empty() {
            return Err(Error::config_missing_keys(
                vec![EnvKey::Hosts.name().to_string()],
                self.source_path.clone(),
            ));
        }
        self.hosts.iter().map(|h| HostSpec::parse(h)).collect()
    }
}

/// Global config directory (`~/.config/stagehand/`).
fn config_dir() -> Result<PathBuf> {
    let home = env::var("HOME").map_err(|_| {
        Error::internal_unexpected("HOME environment variable not set".to_string())
    })?;
    Ok(PathBuf::from(home).join(".config").join("stagehand"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    fn env_with(basedir: Option<&str>, version: Option<&str>) -> RawEnv {
        RawEnv {
            hosts: vec!["deploy@web1.example.org".to_string()],
            basedir: basedir.map(String::from),
            version: version.map(String::from),
            ..RawEnv::default()
        }
    }

    #[test]
    fn require_passes_when_keys_present() {
        let env = env_with(Some("/srv/app"), Some("1.0"));
        assert!(env
            .require(&[EnvKey::Hosts, EnvKey::Basedir, EnvKey::Version])
            .is_ok());
    }

    #[test]
    fn require_reports_every_missing_key() {
        let env = RawEnv::default();
        let err = env
            .require(&[EnvKey::Hosts, EnvKey::Basedir, EnvKey::Version])
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ConfigMissingKey);
        let keys = err.details["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(err.message.contains("hosts"));
        assert!(err.message.contains("basedir"));
        assert!(err.message.contains("version"));
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let env = env_with(Some(""), None);
        assert!(env.require(&[EnvKey::Basedir]).is_err());
    }

    #[test]
    fn host_spec_parses_user_host() {
        let spec = HostSpec::parse("deploy@web1.example.org").unwrap();
        assert_eq!(spec.user, "deploy");
        assert_eq!(spec.host, "web1.example.org");
        assert_eq!(spec.port, 22);
    }

    #[test]
    fn host_spec_parses_explicit_port() {
        let spec = HostSpec::parse("deploy@web1.example.org:2222").unwrap();
        assert_eq!(spec.port, 2222);
    }

    #[test]
    fn host_spec_rejects_missing_user() {
        let err = HostSpec::parse("web1.example.org").unwrap_err();
        assert_eq!(err.code, ErrorCode::SshHostInvalid);
    }

    #[test]
    fn host_spec_rejects_bad_port() {
        assert!(HostSpec::parse("deploy@web1:notaport").is_err());
    }

    #[test]
    fn load_from_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stagehand.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"hosts": ["deploy@web1"], "basedir": "/srv/app", "version": "2.1"}}"#
        )
        .unwrap();

        let env = RawEnv::load_from(&path.display().to_string()).unwrap();
        assert_eq!(env.hosts, vec!["deploy@web1".to_string()]);
        assert_eq!(env.basedir.as_deref(), Some("/srv/app"));
        assert_eq!(env.source_path.as_deref(), Some(path.to_str().unwrap()));
    }

    #[test]
    fn load_from_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stagehand.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = RawEnv::load_from(&path.display().to_string()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidJson);
    }
}

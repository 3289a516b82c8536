//! Runtime config generation: `conf/general.yml` materialized from the
//! example file shipped with the release, with DB settings, timezone, and
//! a fresh secret key substituted in.

use std::path::PathBuf;

use rand::Rng;
use regex::Regex;
use serde::Serialize;

use crate::env::{EnvKey, RawEnv};
use crate::error::{Error, Result};
use crate::fleet::{self, FleetReport};

pub const SECRET_KEY_LEN: usize = 50;
const SECRET_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*(-_=+)";

/// Generate a random secret of `len` characters. Fresh per run, no seeding.
pub fn generate_secret(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SECRET_CHARS[rng.gen_range(0..SECRET_CHARS.len())] as char)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ConfigureOpts {
    pub dbname: String,
    pub dbuser: String,
    pub dbpass: String,
    pub dbhost: String,
    pub timezone: String,
}

impl Default for ConfigureOpts {
    fn default() -> Self {
        Self {
            dbname: "odekro".to_string(),
            dbuser: "postgres".to_string(),
            dbpass: String::new(),
            dbhost: "localhost".to_string(),
            timezone: "Africa/Accra".to_string(),
        }
    }
}

/// Keys written as quoted strings (`KEY: '<value>'`).
pub fn quoted_settings(opts: &ConfigureOpts, secret: &str) -> Vec<(String, String)> {
    vec![
        ("DB_USER".to_string(), opts.dbuser.clone()),
        ("DB_NAME".to_string(), opts.dbname.clone()),
        ("DB_PASS".to_string(), opts.dbpass.clone()),
        ("DB_HOST".to_string(), opts.dbhost.clone()),
        ("TIME_ZONE".to_string(), opts.timezone.clone()),
        ("SECRET_KEY".to_string(), secret.to_string()),
    ]
}

/// Keys written as bare values (`KEY: <value>`).
pub fn bare_settings() -> Vec<(&'static str, &'static str)> {
    vec![("COUNTRY_APP", "kenya")]
}

/// Rewrite the first line matching `key: '...'` to `key: '<value>'`.
///
/// The value is inserted verbatim; an embedded `'` produces a malformed
/// quoted line, matching the behavior this replaces.
pub fn rewrite_quoted_key(content: &str, key: &str, value: &str) -> Result<String> {
    let pattern = format!(r"(?m)^{}: '[^']*'", regex::escape(key));
    let re = Regex::new(&pattern)
        .map_err(|e| Error::internal_unexpected(format!("bad substitution pattern: {}", e)))?;
    let replacement = format!("{}: '{}'", key, value);
    Ok(re.replace(content, regex::NoExpand(&replacement)).into_owned())
}

/// Rewrite the first line matching `key: ...` to `key: <value>`.
pub fn rewrite_bare_key(content: &str, key: &str, value: &str) -> Result<String> {
    let pattern = format!(r"(?m)^{}: .*", regex::escape(key));
    let re = Regex::new(&pattern)
        .map_err(|e| Error::internal_unexpected(format!("bad substitution pattern: {}", e)))?;
    let replacement = format!("{}: {}", key, value);
    Ok(re.replace(content, regex::NoExpand(&replacement)).into_owned())
}

/// Produce the generated config from the example file's content.
pub fn render(example: &str, opts: &ConfigureOpts, secret: &str) -> Result<String> {
    let mut content = example.to_string();

    for (key, value) in quoted_settings(opts, secret) {
        content = rewrite_quoted_key(&content, &key, &value)?;
    }
    for (key, value) in bare_settings() {
        content = rewrite_bare_key(&content, key, value)?;
    }

    Ok(content)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureResult {
    pub file: String,
    pub report: FleetReport,
}

/// Generate `conf/general.yml` for the configured release on every host.
///
/// Reads `general.yml-example` from the host, rewrites the settings lines
/// in memory, and writes the whole file back, overwriting any previously
/// generated config. One secret key is drawn per run and shared by all
/// hosts, so a load-balanced fleet agrees on signed values.
pub fn run(env: &RawEnv, opts: &ConfigureOpts) -> Result<ConfigureResult> {
    env.require(&[
        EnvKey::Hosts,
        EnvKey::Basedir,
        EnvKey::WebappUser,
        EnvKey::Version,
    ])?;

    let webapp_user = env.webapp_user()?;
    let yml_file = format!(
        "{}/releases/{}/conf/general.yml",
        env.basedir()?,
        env.version()?
    );
    let secret = generate_secret(SECRET_KEY_LEN);

    let local_tmp = local_tmp_path();
    let staged = format!("/tmp/stagehand-general-{}.yml", std::process::id());

    let report = fleet::run_on_hosts(env, |client| {
        let example = client
            .execute_as_checked(webapp_user, &format!("cat {}-example", yml_file))?
            .stdout;
        let rendered = render(&example, opts, &secret)?;

        std::fs::write(&local_tmp, &rendered).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("write {}", local_tmp.display())))
        })?;

        client.upload_file_checked(&local_tmp, &staged)?;
        client.execute_as_checked(webapp_user, &format!("cp {} {}", staged, yml_file))?;
        client.execute_checked(&format!("rm {}", staged))?;
        Ok(())
    })?;

    if local_tmp.exists() {
        std::fs::remove_file(&local_tmp).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("remove {}", local_tmp.display())))
        })?;
    }

    Ok(ConfigureResult {
        file: yml_file,
        report,
    })
}

fn local_tmp_path() -> PathBuf {
    std::env::temp_dir().join(format!("stagehand-general-{}.yml", std::process::id()))
}

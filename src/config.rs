//! Immutable process configuration.
//!
//! Built once at startup from CLI flags (which themselves fall back to
//! environment variables) plus the secret environment, then shared as
//! `Arc<Config>`.  Nothing mutates it afterwards.  Secret material lives in
//! [`SecretString`] so an accidental `Debug` log prints a redaction, not the
//! value.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::SecretString;
use tracing::warn;

// Environment variables read at startup.  Secrets whose value carries the
// `encrypted` prefix (a sops-style at-rest placeholder) are treated as
// absent rather than used literally.
pub const ENV_WEBHOOK_SECRET: &str = "WEBHOOK_SECRET";
pub const ENV_SMTP_PASSWORD: &str = "MAIL_SMTP_PASSWORD";
pub const ENV_STDOUT_MODE: &str = "MAIL_STDOUT";
pub const ENV_APP_ID: &str = "GITHUB_APP_ID";
pub const ENV_APP_PRIVATE_KEY: &str = "GITHUB_APP_PRIVATE_KEY";

pub const DEFAULT_NOTIFIER_PROGRAM: &str = "./git_multimail_wrapper.py";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// GitHub App credentials for minting installation tokens.
pub struct GithubAppConfig {
    pub app_id: u64,
    /// PEM text, decoded from the base64 environment value.
    pub private_key_pem: SecretString,
}

pub struct Config {
    /// Public hostname used for the TLS certificate.  `localhost` disables
    /// HTTPS entirely.
    pub hostname: String,
    pub port: u16,
    pub insecure: bool,
    /// Root directory for mirrors, TLS keys, and the stats log.
    pub persist_root: PathBuf,
    pub webhook_secret: SecretString,
    pub smtp_password: Option<SecretString>,
    /// When set, the notifier prints mail to stdout instead of sending it.
    pub stdout_mode: bool,
    pub github_app: Option<GithubAppConfig>,
    pub github_api_base: String,
    pub notifier_program: PathBuf,
    pub pipeline_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Assemble the configuration from resolved flag values and the
    /// environment.  Fails fast on anything unusable so the service never
    /// starts half-configured.
    pub fn from_parts(hostname: String, persist_root: PathBuf, port: u16) -> Result<Self> {
        let insecure = hostname == "localhost";
        if insecure && port == 443 {
            bail!("https on localhost will not work (choose another port)");
        }

        let webhook_secret = secret_env(ENV_WEBHOOK_SECRET)?
            .map(SecretString::from)
            .with_context(|| format!("${ENV_WEBHOOK_SECRET} is not set"))?;

        let smtp_password = secret_env(ENV_SMTP_PASSWORD)?.map(SecretString::from);
        let stdout_mode = smtp_password.is_none() || env_flag(ENV_STDOUT_MODE);

        let github_app = github_app_from_env()?;

        Ok(Self {
            hostname,
            port,
            insecure,
            persist_root,
            webhook_secret,
            smtp_password,
            stdout_mode,
            github_app,
            github_api_base: crate::github::DEFAULT_API_BASE.to_string(),
            notifier_program: PathBuf::from(DEFAULT_NOTIFIER_PROGRAM),
            pipeline_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
        })
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.persist_root.join("repos")
    }

    pub fn tls_keys_dir(&self) -> PathBuf {
        self.persist_root.join("tls_keys")
    }

    pub fn stats_log_path(&self) -> PathBuf {
        self.persist_root.join("events.log")
    }
}

// ---------------------------------------------------------------------------
// Environment helpers
// ---------------------------------------------------------------------------

/// Read a secret environment variable.  Unset or empty yields `Ok(None)`;
/// a value still carrying the `encrypted` at-rest prefix is treated as
/// absent rather than used literally.
fn secret_env(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) if value.starts_with("encrypted") => {
            warn!(var = name, "value looks encrypted at rest; treating as unset");
            Ok(None)
        }
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading ${name}")),
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false)
}

/// Both `GITHUB_APP_ID` and `GITHUB_APP_PRIVATE_KEY` (base64 PEM) must be
/// present to enable App authentication; exactly one of them set is a
/// startup error, neither means anonymous fetches of public repositories.
fn github_app_from_env() -> Result<Option<GithubAppConfig>> {
    let app_id = std::env::var(ENV_APP_ID).ok().filter(|v| !v.is_empty());
    let private_key = secret_env(ENV_APP_PRIVATE_KEY)?;

    match (app_id, private_key) {
        (Some(app_id), Some(key_b64)) => {
            let app_id: u64 = app_id
                .parse()
                .with_context(|| format!("${ENV_APP_ID} is not a number"))?;
            let pem = BASE64
                .decode(key_b64.trim())
                .with_context(|| format!("${ENV_APP_PRIVATE_KEY} is not valid base64"))?;
            let pem = String::from_utf8(pem)
                .with_context(|| format!("${ENV_APP_PRIVATE_KEY} does not decode to PEM text"))?;
            Ok(Some(GithubAppConfig {
                app_id,
                private_key_pem: SecretString::from(pem),
            }))
        }
        (None, None) => Ok(None),
        (Some(_), None) => bail!("${ENV_APP_ID} is set but ${ENV_APP_PRIVATE_KEY} is not"),
        (None, Some(_)) => bail!("${ENV_APP_PRIVATE_KEY} is set but ${ENV_APP_ID} is not"),
    }
}

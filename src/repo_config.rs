//! Per-repository notification configuration.
//!
//! Repositories opt in by committing `.github/commit-emails.json` to their
//! default branch.  Resolution reads the file from the mirror's `HEAD` on
//! every push -- nothing is cached or persisted, so a config change takes
//! effect with the push that carries it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::git::commands;

pub const CONFIG_PATH: &str = ".github/commit-emails.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailFormat {
    #[default]
    Default,
    Html,
    Text,
}

impl EmailFormat {
    /// The value to pass to the notifier, or `None` when the notifier's own
    /// default should stand.
    pub fn as_override(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Html => Some("html"),
            Self::Text => Some("text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub mailing_list: String,
    pub email_format: EmailFormat,
}

/// Outcome of configuration resolution.  A missing file is not an error:
/// the repository simply has not opted in.
#[derive(Debug)]
pub enum Resolution {
    Configured(RepoConfig),
    NotOptedIn,
}

/// Read and validate the configuration at the tip of the mirror's default
/// branch.  Any `git show` failure is treated as not-opted-in; a file that
/// exists but cannot be used is a hard error.
pub async fn resolve(mirror_path: &Path) -> Result<Resolution, PipelineError> {
    let text = match commands::git_show(mirror_path, "HEAD", CONFIG_PATH).await {
        Ok(text) => text,
        Err(e) => {
            debug!(
                mirror = %mirror_path.display(),
                error = format!("{e:#}"),
                "no commit-emails.json at HEAD",
            );
            return Ok(Resolution::NotOptedIn);
        }
    };
    parse(&text).map(Resolution::Configured)
}

/// Parse and validate the raw config file contents.
///
/// Unrecognized fields are a warning, not an error, so older deployments
/// keep working when repositories adopt newer settings.
pub fn parse(text: &[u8]) -> Result<RepoConfig, PipelineError> {
    #[derive(Deserialize)]
    struct RawConfig {
        #[serde(rename = "mailingList")]
        mailing_list: String,
        #[serde(rename = "emailFormat", default)]
        email_format: Option<String>,
        #[serde(flatten)]
        unknown: BTreeMap<String, serde_json::Value>,
    }

    let raw: RawConfig = serde_json::from_slice(text)
        .map_err(|e| PipelineError::Config(format!("decoding commit-emails.json: {e}")))?;

    if !raw.unknown.is_empty() {
        let fields: Vec<&str> = raw.unknown.keys().map(String::as_str).collect();
        warn!(fields = %fields.join(", "), "unknown fields in commit-emails.json");
    }

    if raw.mailing_list.trim().is_empty() {
        return Err(PipelineError::Config("mailingList must not be empty".into()));
    }

    let email_format = match raw.email_format.as_deref() {
        None | Some("") | Some("default") => EmailFormat::Default,
        Some("html") => EmailFormat::Html,
        Some("text") => EmailFormat::Text,
        Some(other) => {
            return Err(PipelineError::Config(format!(
                "invalid emailFormat (should be html or text): {other:?}"
            )));
        }
    };

    Ok(RepoConfig {
        mailing_list: raw.mailing_list,
        email_format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config = parse(br#"{"mailingList": "dev@example.com"}"#).unwrap();
        assert_eq!(config.mailing_list, "dev@example.com");
        assert_eq!(config.email_format, EmailFormat::Default);
    }

    #[test]
    fn parses_html_format() {
        let config =
            parse(br#"{"mailingList": "dev@example.com", "emailFormat": "html"}"#).unwrap();
        assert_eq!(config.email_format, EmailFormat::Html);
        assert_eq!(config.email_format.as_override(), Some("html"));
    }

    #[test]
    fn rejects_pdf_format() {
        let err =
            parse(br#"{"mailingList": "dev@example.com", "emailFormat": "pdf"}"#).unwrap_err();
        assert_eq!(err.stage(), "config");
        assert!(err.to_string().contains("pdf"));
    }

    #[test]
    fn rejects_empty_mailing_list() {
        assert!(parse(br#"{"mailingList": "  "}"#).is_err());
    }

    #[test]
    fn rejects_missing_mailing_list() {
        assert!(parse(br#"{"emailFormat": "html"}"#).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse(b"{").is_err());
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let config = parse(
            br#"{"mailingList": "dev@example.com", "digestInterval": "daily", "cc": []}"#,
        )
        .unwrap();
        assert_eq!(config.mailing_list, "dev@example.com");
    }

    #[test]
    fn explicit_default_format_is_accepted() {
        let config =
            parse(br#"{"mailingList": "dev@example.com", "emailFormat": "default"}"#).unwrap();
        assert_eq!(config.email_format, EmailFormat::Default);
        assert_eq!(config.email_format.as_override(), None);
    }

    #[tokio::test]
    async fn resolve_on_nonexistent_mirror_is_not_opted_in() {
        let tmp = tempfile::tempdir().unwrap();
        let resolution = resolve(tmp.path()).await.unwrap();
        assert!(matches!(resolution, Resolution::NotOptedIn));
    }
}

//! The notifier port.
//!
//! Turning a before/after/ref triple into formatted email is the job of an
//! external tool; this module only defines the contract with it -- stdin,
//! argument overrides, environment, exit status, captured streams -- as a
//! trait so the HTTP layer and tests can substitute a fake.

pub mod subprocess;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::repo_config::RepoConfig;

pub use subprocess::MultimailNotifier;

/// Everything one notification run needs.
#[derive(Debug, Clone)]
pub struct NotifyRequest {
    /// The bare mirror the notifier reads history from.
    pub git_dir: PathBuf,
    pub config: RepoConfig,
    pub before: String,
    pub after: String,
    pub git_ref: String,
    /// Pusher identity, exported to the notifier environment.
    pub pusher: String,
}

impl NotifyRequest {
    /// The exact stdin payload: `"<before> <after> <ref>"`, single spaces,
    /// no trailing newline.
    pub fn stdin_payload(&self) -> String {
        format!("{} {} {}", self.before, self.after, self.git_ref)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotifyOutput {
    /// Captured stdout, logged by the caller.
    pub stdout: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, request: &NotifyRequest) -> Result<NotifyOutput, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo_config::EmailFormat;

    #[test]
    fn stdin_payload_is_exact_triple() {
        let request = NotifyRequest {
            git_dir: PathBuf::from("/persist/repos/github.com/acme/widgets"),
            config: RepoConfig {
                mailing_list: "dev@example.com".into(),
                email_format: EmailFormat::Default,
            },
            before: "a".repeat(40),
            after: "b".repeat(40),
            git_ref: "refs/heads/main".into(),
            pusher: "alice".into(),
        };
        assert_eq!(
            request.stdin_payload(),
            format!("{} {} refs/heads/main", "a".repeat(40), "b".repeat(40))
        );
    }
}

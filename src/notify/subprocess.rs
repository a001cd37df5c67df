//! The production notifier: `git_multimail_wrapper.py` as a subprocess.
//!
//! Secret isolation is the point of this module.  The SMTP password reaches
//! the notifier only through an environment-scoped git config parameter:
//! not via `-c` (argv is visible in process listings) and not via any config
//! file (the global config file is public, and per-repo files are owned by
//! the repository).

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::PipelineError;

use super::{Notifier, NotifyOutput, NotifyRequest};

/// Global git config handed to the subprocess; holds the fixed
/// git_multimail constants (sender address, SMTP host, subject templates).
pub const GIT_MULTIMAIL_CONFIG: &str = "git-multimail.config";

pub struct MultimailNotifier {
    program: PathBuf,
    smtp_password: Option<SecretString>,
    stdout_mode: bool,
}

impl MultimailNotifier {
    pub fn new(
        program: impl Into<PathBuf>,
        smtp_password: Option<SecretString>,
        stdout_mode: bool,
    ) -> Self {
        Self {
            program: program.into(),
            smtp_password,
            stdout_mode,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.notifier_program,
            config.smtp_password.clone(),
            config.stdout_mode,
        )
    }
}

#[async_trait]
impl Notifier for MultimailNotifier {
    #[instrument(skip(self, request), fields(git_dir = %request.git_dir.display()))]
    async fn notify(&self, request: &NotifyRequest) -> Result<NotifyOutput, PipelineError> {
        let mut cmd = Command::new(&self.program);

        if self.stdout_mode {
            cmd.arg("--stdout");
        }
        cmd.arg("-c").arg(format!(
            "multimailhook.mailingList={}",
            request.config.mailing_list
        ));
        if let Some(format) = request.config.email_format.as_override() {
            cmd.arg("-c")
                .arg(format!("multimailhook.commitEmailFormat={format}"));
        }

        cmd.env("GIT_DIR", &request.git_dir);
        cmd.env("GIT_CONFIG_GLOBAL", GIT_MULTIMAIL_CONFIG);
        cmd.env("USER", &request.pusher);
        if let Some(password) = &self.smtp_password {
            // Single quotes are necessary for git to parse this correctly.
            cmd.env(
                "GIT_CONFIG_PARAMETERS",
                format!("'multimailhook.smtpPass={}'", password.expose_secret()),
            );
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(program = %self.program.display(), "spawning notifier");

        // Not killed if the caller's deadline expires: a slow notifier can
        // outlive its request.  TODO: thread the pipeline deadline into the
        // child once git_multimail handles SIGTERM cleanly.
        let mut child = cmd.spawn().map_err(|e| PipelineError::Notifier {
            status: "spawn failed".into(),
            stderr: e.to_string(),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.stdin_payload().as_bytes())
                .await
                .map_err(|e| PipelineError::Notifier {
                    status: "stdin write failed".into(),
                    stderr: e.to_string(),
                })?;
            // Drop to signal EOF.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PipelineError::Notifier {
                status: "wait failed".into(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PipelineError::Notifier {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(NotifyOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

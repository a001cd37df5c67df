//! commitmail -- relays GitHub push webhooks into commit-notification
//! emails.
//!
//! The service authenticates webhook deliveries, keeps a local bare mirror
//! per repository, resolves each repository's opt-in configuration from its
//! default branch, and drives the external `git_multimail_wrapper.py`
//! notifier with the push's before/after/ref triple.  Operator secrets
//! (SMTP credentials, the App signing key) never reach anything a
//! repository owner controls.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod git;
pub mod github;
pub mod health;
pub mod http;
pub mod locks;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod repo_config;
pub mod stats;
pub mod tls;

use std::sync::Arc;

use crate::config::Config;
use crate::git::MirrorStore;
use crate::github::InstallationAuthenticator;
use crate::locks::RepoLocks;
use crate::metrics::MetricsRegistry;
use crate::notify::Notifier;
use crate::stats::StatsLog;

/// Global state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub mirrors: MirrorStore,
    pub locks: RepoLocks,
    pub stats: StatsLog,
    pub metrics: MetricsRegistry,
    /// The notifier port; swapped for a fake in tests.
    pub notifier: Arc<dyn Notifier>,
    /// Present only when App credentials are configured.
    pub installation_auth: Option<Arc<InstallationAuthenticator>>,
}

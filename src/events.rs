//! Webhook event envelope parsing.
//!
//! The event kind comes from the `X-GitHub-Event` header, never from the
//! body.  Payloads parse into an explicit tagged union so that dispatch is
//! an exhaustive `match` rather than duck-typing over loosely related
//! shapes.  Repository full names are validated here, once, so downstream
//! path construction can trust them.

use serde::Deserialize;

use crate::error::PipelineError;

pub const EVENT_HEADER: &str = "X-GitHub-Event";

// ---------------------------------------------------------------------------
// Payload fragments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// `owner/name`, validated by [`parse`].
    pub full_name: String,
    pub clone_url: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pusher {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InstallationRef {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallationAccount {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationDetail {
    pub id: u64,
    #[serde(default)]
    pub account: Option<InstallationAccount>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PingEvent {
    /// App-level pings carry no repository; repo-level pings do.
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub sender: Sender,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub repository: Repository,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before: String,
    pub after: String,
    pub pusher: Pusher,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
    #[serde(default)]
    pub sender: Sender,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationEvent {
    pub action: String,
    pub installation: InstallationDetail,
    #[serde(default)]
    pub sender: Sender,
}

/// One inbound webhook delivery, discriminated by the event header.
#[derive(Debug, Clone)]
pub enum Event {
    Ping(PingEvent),
    Push(PushEvent),
    Installation(InstallationEvent),
    InstallationRepositories(InstallationEvent),
    /// Anything else: accepted and ignored so the sender does not retry.
    Other { kind: String },
}

impl Event {
    /// Stable kind label for metrics and the stats log.
    pub fn kind(&self) -> &str {
        match self {
            Self::Ping(_) => "ping",
            Self::Push(_) => "push",
            Self::Installation(_) => "installation",
            Self::InstallationRepositories(_) => "installation_repositories",
            Self::Other { kind } => kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a webhook body according to the event kind header.
pub fn parse(kind: &str, body: &[u8]) -> Result<Event, PipelineError> {
    match kind {
        "ping" => {
            let event: PingEvent = decode(body)?;
            if let Some(repository) = &event.repository {
                validate_full_name(&repository.full_name)?;
            }
            Ok(Event::Ping(event))
        }
        "push" => {
            let event: PushEvent = decode(body)?;
            validate_full_name(&event.repository.full_name)?;
            Ok(Event::Push(event))
        }
        "installation" => Ok(Event::Installation(decode(body)?)),
        "installation_repositories" => Ok(Event::InstallationRepositories(decode(body)?)),
        other => Ok(Event::Other {
            kind: other.to_string(),
        }),
    }
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, PipelineError> {
    serde_json::from_slice(body).map_err(|e| PipelineError::Parse(e.to_string()))
}

/// Repository full names must be exactly `owner/name` with the character
/// set GitHub allows.  This is the only place webhook-supplied names are
/// checked before they become filesystem path components.
fn validate_full_name(full_name: &str) -> Result<(), PipelineError> {
    let mut parts = full_name.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if is_safe_component(owner) && is_safe_component(name) => {
            Ok(())
        }
        _ => Err(PipelineError::Parse(format!(
            "invalid repository name: {full_name:?}"
        ))),
    }
}

fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_push_event() {
        let body = serde_json::json!({
            "ref": "refs/heads/main",
            "before": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "after": "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            "repository": {"full_name": "acme/widgets", "clone_url": "https://github.com/acme/widgets.git"},
            "pusher": {"name": "alice", "email": "alice@example.com"},
            "installation": {"id": 42},
            "sender": {"login": "alice"}
        });
        let event = parse("push", &serde_json::to_vec(&body).unwrap()).unwrap();
        match event {
            Event::Push(push) => {
                assert_eq!(push.repository.full_name, "acme/widgets");
                assert_eq!(push.git_ref, "refs/heads/main");
                assert_eq!(push.installation.unwrap().id, 42);
                assert_eq!(push.pusher.name, "alice");
            }
            other => panic!("expected push, got {other:?}"),
        }
    }

    #[test]
    fn push_missing_required_field_is_parse_error() {
        // No "pusher".
        let body = serde_json::json!({
            "ref": "refs/heads/main",
            "before": "a",
            "after": "b",
            "repository": {"full_name": "acme/widgets", "clone_url": "u"}
        });
        let err = parse("push", &serde_json::to_vec(&body).unwrap()).unwrap_err();
        assert_eq!(err.stage(), "parse");
    }

    #[test]
    fn parses_minimal_ping() {
        let event = parse("ping", b"{}").unwrap();
        match event {
            Event::Ping(ping) => assert!(ping.repository.is_none()),
            other => panic!("expected ping, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_other() {
        let event = parse("star", b"{\"anything\": true}").unwrap();
        assert_eq!(event.kind(), "star");
    }

    #[test]
    fn rejects_traversal_in_full_name() {
        for bad in [
            "../etc",
            "a/../b",
            "owner",
            "owner/name/extra",
            "owner/",
            "/name",
            "owner/na me",
        ] {
            let body = serde_json::json!({
                "ref": "refs/heads/main",
                "before": "a",
                "after": "b",
                "repository": {"full_name": bad, "clone_url": "u"},
                "pusher": {"name": "alice"}
            });
            assert!(
                parse("push", &serde_json::to_vec(&body).unwrap()).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse("push", b"{not json").unwrap_err();
        assert_eq!(err.stage(), "parse");
    }
}

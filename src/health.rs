use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub git: CheckResult,
    pub persist: CheckResult,
    pub notifier: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn healthy() -> Self {
        Self {
            ok: true,
            detail: None,
        }
    }

    fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

async fn check_git() -> CheckResult {
    match tokio::process::Command::new("git")
        .arg("version")
        .output()
        .await
    {
        Ok(output) if output.status.success() => CheckResult::healthy(),
        Ok(output) => CheckResult::unhealthy(format!("git version exited {}", output.status)),
        Err(e) => CheckResult::unhealthy(format!("git binary unavailable: {e}")),
    }
}

async fn check_persist(state: &AppState) -> CheckResult {
    match tokio::fs::metadata(&state.config.persist_root).await {
        Ok(meta) if meta.is_dir() => CheckResult::healthy(),
        Ok(_) => CheckResult::unhealthy("persist root is not a directory"),
        Err(e) => CheckResult::unhealthy(format!("persist root missing: {e}")),
    }
}

async fn check_notifier(state: &AppState) -> CheckResult {
    match tokio::fs::metadata(&state.config.notifier_program).await {
        Ok(meta) if meta.is_file() => CheckResult::healthy(),
        Ok(_) => CheckResult::unhealthy("notifier program is not a regular file"),
        Err(e) => CheckResult::unhealthy(format!(
            "notifier program {} not found: {e}",
            state.config.notifier_program.display()
        )),
    }
}

// ---------------------------------------------------------------------------
// Aggregate status
// ---------------------------------------------------------------------------

fn aggregate_status(checks: &HealthChecks) -> HealthStatus {
    let all_ok = checks.git.ok && checks.persist.ok && checks.notifier.ok;
    // git and the persist root are required to process any push at all; a
    // missing notifier only breaks the final step.
    let any_critical = !checks.git.ok || !checks.persist.ok;

    if all_ok {
        HealthStatus::Ok
    } else if any_critical {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    }
}

// ---------------------------------------------------------------------------
// Axum handler
// ---------------------------------------------------------------------------

/// `GET /healthz` handler.  Returns 200 on Ok/Degraded, 503 on Unhealthy.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (git, persist, notifier) = tokio::join!(
        check_git(),
        check_persist(&state),
        check_notifier(&state),
    );

    let checks = HealthChecks {
        git,
        persist,
        notifier,
    };
    let status = aggregate_status(&checks);
    let body = HealthResponse { status, checks };

    let http_status = match status {
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(git: bool, persist: bool, notifier: bool) -> HealthChecks {
        let mk = |ok| {
            if ok {
                CheckResult::healthy()
            } else {
                CheckResult::unhealthy("nope")
            }
        };
        HealthChecks {
            git: mk(git),
            persist: mk(persist),
            notifier: mk(notifier),
        }
    }

    #[test]
    fn all_ok_is_ok() {
        assert_eq!(aggregate_status(&checks(true, true, true)), HealthStatus::Ok);
    }

    #[test]
    fn missing_notifier_is_degraded() {
        assert_eq!(
            aggregate_status(&checks(true, true, false)),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn missing_git_is_unhealthy() {
        assert_eq!(
            aggregate_status(&checks(false, true, true)),
            HealthStatus::Unhealthy
        );
    }
}

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::authz::loader;
use crate::authz::rulebase::{Rulebase, SharedRulebase};
use crate::authz::types::{
    CheckRequest, CheckResponse, DecideRequest, DecideResponse, ReloadResponse, Verb,
};
use crate::errors::AppError;
use crate::settings::Settings;

/// Serving state: the live rulebase plus the configuration file it was built from.
#[derive(Debug)]
pub struct AuthzService {
    pub rulebase: SharedRulebase,
    pub config_path: String,
}

pub fn router(state: Arc<AuthzService>) -> Router {
    Router::new()
        .route("/v1/decide", post(handle_decide))
        .route("/v1/check", post(handle_check))
        .route("/v1/reload", post(handle_reload))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn handle_decide(
    State(state): State<Arc<AuthzService>>,
    Json(req): Json<DecideRequest>,
) -> impl IntoResponse {
    let permissions = state.rulebase.current().decide(&req.subject, &req.resource);
    Json(DecideResponse::from(permissions))
}

async fn handle_check(
    State(state): State<Arc<AuthzService>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    match req.verb.parse::<Verb>() {
        Ok(verb) => {
            let allowed = state
                .rulebase
                .current()
                .is_allowed(&req.subject, &req.resource, verb);
            Json(CheckResponse { allowed }).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Re-read the configuration, rebuild from the policies directory and swap the
/// new generation in. Changes to `[access]` and `[policies]` take effect here;
/// `[server]` changes need a restart. On failure the current generation keeps
/// serving.
async fn handle_reload(State(state): State<Arc<AuthzService>>) -> impl IntoResponse {
    let config_path = state.config_path.clone();

    let loaded = tokio::task::spawn_blocking(move || rebuild(&config_path))
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))
        .and_then(|r| r);

    match loaded {
        Ok(rulebase) => {
            let body = ReloadResponse {
                rules: rulebase.rule_count(),
                groups: rulebase.groups().group_count(),
            };
            state.rulebase.replace(rulebase);
            tracing::info!(rules = body.rules, groups = body.groups, "Reloaded rulebase");
            Json(body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Reload failed, keeping current rulebase");
            e.into_response()
        }
    }
}

fn rebuild(config_path: &str) -> Result<Rulebase, AppError> {
    let settings = Settings::load(config_path)?;
    let default_access = settings.access.default_permissions()?;
    let rulebase =
        loader::load_policies(&settings.policies.dir, default_access, settings.access.mode)?;
    Ok(rulebase)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

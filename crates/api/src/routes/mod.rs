mod auth;
pub(crate) mod chat;
mod matching;
mod profile;
mod service;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use serde::Serialize;

use skillswap_domain::identity::ActorIdentity;

use crate::error::{ApiError, map_domain_error};
use crate::middleware as app_middleware;
use crate::middleware::AuthContext;
use crate::observability;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/profile/me", get(profile::me))
        .route("/api/profile/update", put(profile::update))
        .route("/api/profile/upload", post(profile::upload))
        .route("/api/match/find-matches", get(matching::find_matches))
        .route(
            "/api/match/find-by-skill/:skill",
            get(matching::find_by_skill),
        )
        .route("/api/service/create", post(service::create))
        .route("/api/service/all", get(service::list_open))
        .route("/api/service/update/:request_id", put(service::update_status))
        .route("/api/service/:request_id", get(service::get_one))
        .route(
            "/api/service/:request_id/agreements",
            post(service::propose_agreement).get(service::list_agreements),
        )
        .route(
            "/api/agreement/:agreement_id",
            get(service::get_agreement).put(service::update_agreement),
        )
        .route(
            "/api/chat/:request_id/messages",
            get(chat::history).post(chat::send),
        )
        .route("/api/chat/:request_id/ws", get(chat::stream))
        .route_layer(middleware::from_fn(app_middleware::require_auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(app_middleware::cors_layer(&state.config));

    if !state.config.app_env.eq_ignore_ascii_case("test") {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    data_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'static str>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.config.data_backend == "surreal" {
        let db_config = skillswap_infra::db::DbConfig::from_app_config(&state.config);
        match skillswap_infra::db::health_check(&db_config).await {
            Ok(()) => Some("ok"),
            Err(err) => {
                tracing::warn!(error = %err, "database health probe failed");
                Some("unreachable")
            }
        }
    } else {
        None
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
        data_backend: state.config.data_backend.clone(),
        database,
    })
}

async fn metrics() -> axum::response::Response {
    match observability::render_metrics() {
        Some(body) => body.into_response(),
        None => ApiError::Internal.into_response(),
    }
}

/// Protected routes sit behind `require_auth_middleware`, so a missing id
/// here means a wiring bug rather than a client error.
pub(crate) fn actor_user_id(auth: &AuthContext) -> Result<String, ApiError> {
    auth.user_id
        .as_ref()
        .filter(|user_id| !user_id.trim().is_empty())
        .cloned()
        .ok_or(ApiError::Unauthorized)
}

pub(crate) async fn actor_identity(
    state: &AppState,
    auth: &AuthContext,
) -> Result<ActorIdentity, ApiError> {
    let user_id = actor_user_id(auth)?;
    let user = state
        .profile_service()
        .get(&user_id)
        .await
        .map_err(map_domain_error)?;
    Ok(ActorIdentity {
        user_id: user.user_id,
        name: user.name,
    })
}

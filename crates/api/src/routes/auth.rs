use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use skillswap_domain::auth::RegisterInput;
use skillswap_domain::users::UserPublic;
use skillswap_infra::auth::TokenError;

use crate::error::{ApiError, map_domain_error};
use crate::observability;
use crate::state::AppState;
use crate::validation;

#[derive(Serialize)]
pub struct RegisterResponse {
    msg: &'static str,
    user: UserPublic,
    /// Present only when the mail relay could not deliver the code.
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let outcome = state
        .auth_service()
        .register(payload)
        .await
        .map_err(map_domain_error)?;
    let delivered = outcome.otp_fallback.is_none();
    observability::register_otp_delivery(if delivered { "sent" } else { "fallback" });
    Ok(Json(RegisterResponse {
        msg: if delivered {
            "registered; check your email for the verification code"
        } else {
            "registered; mail delivery failed, use the included code"
        },
        user: outcome.user,
        otp: outcome.otp_fallback,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 3, max = 254))]
    email: String,
    #[validate(length(min = 6, max = 6))]
    code: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    msg: &'static str,
    user: UserPublic,
}

pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    validation::validate(&payload)?;
    let user = state
        .auth_service()
        .verify_otp(&payload.email, &payload.code)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(VerifyResponse {
        msg: "account verified",
        user,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 254))]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    user: UserPublic,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    validation::validate(&payload)?;
    let user = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await
        .map_err(map_domain_error)?;
    let token = state.tokens.issue(&user.user_id).map_err(|err| match err {
        TokenError::MissingSecret => ApiError::Misconfigured,
        err => {
            tracing::error!(error = %err, "token issuance failed");
            ApiError::Internal
        }
    })?;
    Ok(Json(LoginResponse { token, user }))
}

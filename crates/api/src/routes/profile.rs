use axum::Json;
use axum::extract::{Extension, Multipart, State};
use serde::Serialize;

use skillswap_domain::users::{ProfileUpdate, UserPublic};

use crate::error::{ApiError, map_domain_error};
use crate::middleware::AuthContext;
use crate::routes::actor_user_id;
use crate::state::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserPublic>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let user = state
        .profile_service()
        .get(&user_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserPublic>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let user = state
        .profile_service()
        .update(&user_id, payload)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(user))
}

#[derive(Serialize)]
pub struct UploadResponse {
    msg: &'static str,
    url: String,
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let user_id = actor_user_id(&auth)?;

    let mut stored: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("portfolio") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::Validation(format!("failed to read upload: {err}")))?;
        if bytes.is_empty() {
            return Err(ApiError::Validation("uploaded file is empty".to_string()));
        }
        let url = state
            .blobs
            .store(&filename, bytes.to_vec())
            .await
            .map_err(map_domain_error)?;
        stored = Some(url);
        break;
    }

    let url = stored.ok_or_else(|| ApiError::Validation("no file provided".to_string()))?;
    state
        .profile_service()
        .add_portfolio(&user_id, url.clone())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(UploadResponse {
        msg: "upload stored",
        url,
    }))
}

use axum::Json;
use axum::extract::{Extension, Path, State};
use serde::Serialize;

use skillswap_domain::users::UserPublic;

use crate::error::{ApiError, map_domain_error};
use crate::middleware::AuthContext;
use crate::routes::actor_user_id;
use crate::state::AppState;

#[derive(Serialize)]
pub struct MatchesResponse {
    matches: Vec<UserPublic>,
}

pub async fn find_matches(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MatchesResponse>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let matches = state
        .match_service()
        .find_matches(&user_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(MatchesResponse { matches }))
}

#[derive(Serialize)]
pub struct SkillSearchResponse {
    users: Vec<UserPublic>,
}

pub async fn find_by_skill(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(skill): Path<String>,
) -> Result<Json<SkillSearchResponse>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let users = state
        .match_service()
        .find_by_skill(&user_id, &skill)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(SkillSearchResponse { users }))
}

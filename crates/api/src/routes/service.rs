use axum::Json;
use axum::extract::{Extension, Path, State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use skillswap_domain::agreements::{Agreement, AgreementStatus};
use skillswap_domain::requests::{
    CreateRequestInput, RequestStatus, RequestWithOwner, ServiceRequest,
};

use crate::error::{ApiError, map_domain_error};
use crate::middleware::AuthContext;
use crate::routes::actor_user_id;
use crate::state::AppState;
use crate::validation;

#[derive(Serialize)]
pub struct CreateResponse {
    msg: &'static str,
    service_request: ServiceRequest,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateRequestInput>,
) -> Result<Json<CreateResponse>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let request = state
        .request_service()
        .create(&user_id, payload)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(CreateResponse {
        msg: "service request created",
        service_request: request,
    }))
}

pub async fn list_open(
    State(state): State<AppState>,
) -> Result<Json<Vec<RequestWithOwner>>, ApiError> {
    let board = state
        .request_service()
        .list_open()
        .await
        .map_err(map_domain_error)?;
    Ok(Json(board))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestWithOwner>, ApiError> {
    let request = state
        .request_service()
        .get(&request_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    status: RequestStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ServiceRequest>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let request = state
        .request_service()
        .update_status(&user_id, &request_id, payload.status)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProposeAgreementRequest {
    #[validate(length(min = 1, max = 4000))]
    terms: String,
}

pub async fn propose_agreement(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<String>,
    Json(payload): Json<ProposeAgreementRequest>,
) -> Result<Json<Agreement>, ApiError> {
    validation::validate(&payload)?;
    let user_id = actor_user_id(&auth)?;
    let agreement = state
        .agreement_service()
        .propose(&user_id, &request_id, &payload.terms)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(agreement))
}

pub async fn list_agreements(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<String>,
) -> Result<Json<Vec<Agreement>>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let agreements = state
        .agreement_service()
        .list_for_request(&user_id, &request_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(agreements))
}

pub async fn get_agreement(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(agreement_id): Path<String>,
) -> Result<Json<Agreement>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let agreement = state
        .agreement_service()
        .get(&user_id, &agreement_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(agreement))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgreementRequest {
    status: AgreementStatus,
}

pub async fn update_agreement(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(agreement_id): Path<String>,
    Json(payload): Json<UpdateAgreementRequest>,
) -> Result<Json<Agreement>, ApiError> {
    let user_id = actor_user_id(&auth)?;
    let agreement = state
        .agreement_service()
        .update_status(&user_id, &agreement_id, payload.status)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(agreement))
}

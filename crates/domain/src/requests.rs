use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::requests::RequestRepository;
use crate::ports::users::UserRepository;
use crate::users::ExpertiseLevel;
use crate::util::{now_ms, uuid_v7_without_dashes};

pub const MAX_TITLE_LENGTH: usize = 140;
pub const MAX_DESCRIPTION_LENGTH: usize = 4000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn can_transition(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Open, InProgress) | (Open, Cancelled) | (InProgress, Completed) | (InProgress, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Open => "Open",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::Completed => "Completed",
            RequestStatus::Cancelled => "Cancelled",
        }
    }
}

/// Audit entry appended when the request moves out of its open state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NegotiationNote {
    pub actor_id: String,
    pub note: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub request_id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub skills_needed: Vec<String>,
    pub status: RequestStatus,
    #[serde(default)]
    pub negotiation_notes: Vec<NegotiationNote>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RequestOwner {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub expertise_level: ExpertiseLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct RequestWithOwner {
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub owner: RequestOwner,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateRequestInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub skills_needed: Vec<String>,
}

#[derive(Clone)]
pub struct RequestService {
    requests: Arc<dyn RequestRepository>,
    users: Arc<dyn UserRepository>,
}

impl RequestService {
    pub fn new(requests: Arc<dyn RequestRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { requests, users }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        input: CreateRequestInput,
    ) -> DomainResult<ServiceRequest> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("title must not be empty".into()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(DomainError::Validation(format!(
                "title exceeds {MAX_TITLE_LENGTH} characters"
            )));
        }
        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(DomainError::Validation(
                "description must not be empty".into(),
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(DomainError::Validation(format!(
                "description exceeds {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }
        let skills_needed = if input.skills_needed.is_empty() {
            vec![]
        } else {
            crate::users::validate_skills(&input.skills_needed)?
        };

        self.users
            .get(owner_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let now = now_ms();
        let request = ServiceRequest {
            request_id: uuid_v7_without_dashes(),
            owner_id: owner_id.to_string(),
            title,
            description,
            skills_needed,
            status: RequestStatus::Open,
            negotiation_notes: vec![],
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.requests.create(&request).await
    }

    /// Open board: newest first, each entry carrying the owner snapshot.
    pub async fn list_open(&self) -> DomainResult<Vec<RequestWithOwner>> {
        let requests = self.requests.list_by_status(RequestStatus::Open).await?;
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            // Requests whose owner vanished are skipped rather than failing
            // the whole listing.
            let Some(owner) = self.users.get(&request.owner_id).await? else {
                tracing::warn!(request_id = %request.request_id, "request owner missing; hiding from board");
                continue;
            };
            out.push(RequestWithOwner {
                request,
                owner: RequestOwner {
                    user_id: owner.user_id,
                    name: owner.name,
                    email: owner.email,
                    expertise_level: owner.expertise_level,
                },
            });
        }
        Ok(out)
    }

    pub async fn get(&self, request_id: &str) -> DomainResult<RequestWithOwner> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let owner = self
            .users
            .get(&request.owner_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        Ok(RequestWithOwner {
            request,
            owner: RequestOwner {
                user_id: owner.user_id,
                name: owner.name,
                email: owner.email,
                expertise_level: owner.expertise_level,
            },
        })
    }

    pub async fn update_status(
        &self,
        actor_id: &str,
        request_id: &str,
        next: RequestStatus,
    ) -> DomainResult<ServiceRequest> {
        let mut request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if request.owner_id != actor_id {
            return Err(DomainError::Forbidden(
                "only the request owner may change its status".into(),
            ));
        }
        if !request.status.can_transition(next) {
            return Err(DomainError::Validation(format!(
                "cannot move request from {} to {}",
                request.status.as_str(),
                next.as_str()
            )));
        }
        request.status = next;
        request.updated_at_ms = now_ms();
        self.requests.update(&request).await
    }

    /// First contact on an open request flips it to in-progress and records
    /// who opened the negotiation. A no-op for any other status.
    pub async fn begin_negotiation(
        &self,
        actor_id: &str,
        request_id: &str,
    ) -> DomainResult<ServiceRequest> {
        let mut request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if request.status != RequestStatus::Open {
            return Ok(request);
        }
        request.status = RequestStatus::InProgress;
        request.negotiation_notes.push(NegotiationNote {
            actor_id: actor_id.to_string(),
            note: "negotiation opened".to_string(),
            created_at_ms: now_ms(),
        });
        request.updated_at_ms = now_ms();
        self.requests.update(&request).await
    }
}

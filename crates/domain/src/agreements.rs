use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::agreements::AgreementRepository;
use crate::ports::requests::RequestRepository;
use crate::requests::RequestStatus;
use crate::util::{now_ms, uuid_v7_without_dashes};

pub const MAX_TERMS_LENGTH: usize = 4000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl AgreementStatus {
    pub fn can_transition(self, next: AgreementStatus) -> bool {
        use AgreementStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted) | (Pending, Rejected) | (Accepted, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgreementStatus::Pending => "Pending",
            AgreementStatus::Accepted => "Accepted",
            AgreementStatus::Rejected => "Rejected",
            AgreementStatus::Completed => "Completed",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agreement {
    pub agreement_id: String,
    pub request_id: String,
    /// Proposer first, request owner second.
    pub parties: [String; 2],
    pub terms: String,
    pub status: AgreementStatus,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Agreement {
    pub fn involves(&self, user_id: &str) -> bool {
        self.parties.iter().any(|party| party == user_id)
    }
}

#[derive(Clone)]
pub struct AgreementService {
    agreements: Arc<dyn AgreementRepository>,
    requests: Arc<dyn RequestRepository>,
}

impl AgreementService {
    pub fn new(
        agreements: Arc<dyn AgreementRepository>,
        requests: Arc<dyn RequestRepository>,
    ) -> Self {
        Self {
            agreements,
            requests,
        }
    }

    pub async fn propose(
        &self,
        proposer_id: &str,
        request_id: &str,
        terms: &str,
    ) -> DomainResult<Agreement> {
        let terms = terms.trim();
        if terms.is_empty() {
            return Err(DomainError::Validation("terms must not be empty".into()));
        }
        if terms.chars().count() > MAX_TERMS_LENGTH {
            return Err(DomainError::Validation(format!(
                "terms exceed {MAX_TERMS_LENGTH} characters"
            )));
        }

        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if request.owner_id == proposer_id {
            return Err(DomainError::Validation(
                "cannot propose an agreement on your own request".into(),
            ));
        }
        if !matches!(
            request.status,
            RequestStatus::Open | RequestStatus::InProgress
        ) {
            return Err(DomainError::Validation(format!(
                "request is {}; agreements can only be proposed while it is active",
                request.status.as_str()
            )));
        }

        let now = now_ms();
        let agreement = Agreement {
            agreement_id: uuid_v7_without_dashes(),
            request_id: request_id.to_string(),
            parties: [proposer_id.to_string(), request.owner_id],
            terms: terms.to_string(),
            status: AgreementStatus::Pending,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.agreements.create(&agreement).await
    }

    pub async fn update_status(
        &self,
        actor_id: &str,
        agreement_id: &str,
        next: AgreementStatus,
    ) -> DomainResult<Agreement> {
        let mut agreement = self
            .agreements
            .get(agreement_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !agreement.involves(actor_id) {
            return Err(DomainError::Forbidden(
                "only a listed party may update the agreement".into(),
            ));
        }
        if !agreement.status.can_transition(next) {
            return Err(DomainError::Validation(format!(
                "cannot move agreement from {} to {}",
                agreement.status.as_str(),
                next.as_str()
            )));
        }
        agreement.status = next;
        agreement.updated_at_ms = now_ms();
        self.agreements.update(&agreement).await
    }

    pub async fn get(&self, actor_id: &str, agreement_id: &str) -> DomainResult<Agreement> {
        let agreement = self
            .agreements
            .get(agreement_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !agreement.involves(actor_id) {
            return Err(DomainError::Forbidden(
                "only a listed party may view the agreement".into(),
            ));
        }
        Ok(agreement)
    }

    pub async fn list_for_request(
        &self,
        actor_id: &str,
        request_id: &str,
    ) -> DomainResult<Vec<Agreement>> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let all = self.agreements.list_by_request(request_id).await?;
        if request.owner_id == actor_id {
            return Ok(all);
        }
        Ok(all
            .into_iter()
            .filter(|agreement| agreement.involves(actor_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::agreements::tests::MockAgreementRepo;
    use crate::ports::requests::tests::MockRequestRepo;
    use crate::requests::ServiceRequest;

    fn open_request(id: &str, owner: &str) -> ServiceRequest {
        ServiceRequest {
            request_id: id.to_string(),
            owner_id: owner.to_string(),
            title: "Logo design".to_string(),
            description: "need a hand".to_string(),
            skills_needed: vec![],
            status: RequestStatus::Open,
            negotiation_notes: vec![],
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    async fn fixture() -> (AgreementService, Arc<MockRequestRepo>) {
        let requests = Arc::new(MockRequestRepo::default());
        requests.seed(open_request("r1", "owner")).await;
        let agreements = Arc::new(MockAgreementRepo::default());
        (AgreementService::new(agreements, requests.clone()), requests)
    }

    #[tokio::test]
    async fn propose_records_both_parties() {
        let (svc, _) = fixture().await;
        let agreement = svc
            .propose("helper", "r1", "two logo drafts for one code review")
            .await
            .expect("propose");
        assert_eq!(agreement.status, AgreementStatus::Pending);
        assert_eq!(agreement.parties, ["helper".to_string(), "owner".to_string()]);
    }

    #[tokio::test]
    async fn owner_cannot_propose_on_own_request() {
        let (svc, _) = fixture().await;
        let err = svc.propose("owner", "r1", "terms").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn propose_rejected_on_completed_request() {
        let (svc, requests) = fixture().await;
        let mut request = requests.snapshot("r1").await.expect("seeded");
        request.status = RequestStatus::Completed;
        requests.seed(request).await;

        let err = svc.propose("helper", "r1", "terms").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn only_parties_may_respond() {
        let (svc, _) = fixture().await;
        let agreement = svc.propose("helper", "r1", "terms").await.expect("propose");
        let err = svc
            .update_status("stranger", &agreement.agreement_id, AgreementStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn pending_accept_complete_path() {
        let (svc, requests) = fixture().await;
        let agreement = svc.propose("helper", "r1", "terms").await.expect("propose");

        let accepted = svc
            .update_status("owner", &agreement.agreement_id, AgreementStatus::Accepted)
            .await
            .expect("accept");
        assert_eq!(accepted.status, AgreementStatus::Accepted);

        // Accepting the agreement does not touch the request status.
        assert_eq!(
            requests.snapshot("r1").await.expect("request").status,
            RequestStatus::Open
        );

        let completed = svc
            .update_status("helper", &agreement.agreement_id, AgreementStatus::Completed)
            .await
            .expect("complete");
        assert_eq!(completed.status, AgreementStatus::Completed);

        let err = svc
            .update_status("owner", &agreement.agreement_id, AgreementStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn rejected_is_terminal() {
        let (svc, _) = fixture().await;
        let agreement = svc.propose("helper", "r1", "terms").await.expect("propose");
        svc.update_status("owner", &agreement.agreement_id, AgreementStatus::Rejected)
            .await
            .expect("reject");
        let err = svc
            .update_status("owner", &agreement.agreement_id, AgreementStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn listing_filters_to_own_agreements_for_non_owner() {
        let (svc, _) = fixture().await;
        svc.propose("helper", "r1", "terms a").await.expect("propose");
        svc.propose("rival", "r1", "terms b").await.expect("propose");

        let owner_view = svc.list_for_request("owner", "r1").await.expect("list");
        assert_eq!(owner_view.len(), 2);

        let helper_view = svc.list_for_request("helper", "r1").await.expect("list");
        assert_eq!(helper_view.len(), 1);
        assert_eq!(helper_view[0].parties[0], "helper");
    }
}

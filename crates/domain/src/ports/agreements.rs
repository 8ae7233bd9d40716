use crate::DomainResult;
use crate::agreements::Agreement;

pub trait AgreementRepository: Send + Sync {
    fn create(
        &self,
        agreement: &Agreement,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Agreement>>;

    fn get(
        &self,
        agreement_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Option<Agreement>>>;

    fn update(
        &self,
        agreement: &Agreement,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Agreement>>;

    fn list_by_request(
        &self,
        request_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<Agreement>>>;
}

#[cfg(test)]
pub mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use tokio::sync::RwLock;

    use super::*;
    use crate::error::DomainError;
    use crate::ports::BoxFuture;

    #[derive(Default)]
    pub struct MockAgreementRepo {
        agreements: Arc<RwLock<HashMap<String, Agreement>>>,
    }

    impl AgreementRepository for MockAgreementRepo {
        fn create(&self, agreement: &Agreement) -> BoxFuture<'_, DomainResult<Agreement>> {
            let agreement = agreement.clone();
            let agreements = self.agreements.clone();
            Box::pin(async move {
                let mut agreements = agreements.write().await;
                if agreements.contains_key(&agreement.agreement_id) {
                    return Err(DomainError::Conflict);
                }
                agreements.insert(agreement.agreement_id.clone(), agreement.clone());
                Ok(agreement)
            })
        }

        fn get(&self, agreement_id: &str) -> BoxFuture<'_, DomainResult<Option<Agreement>>> {
            let agreement_id = agreement_id.to_string();
            let agreements = self.agreements.clone();
            Box::pin(async move { Ok(agreements.read().await.get(&agreement_id).cloned()) })
        }

        fn update(&self, agreement: &Agreement) -> BoxFuture<'_, DomainResult<Agreement>> {
            let agreement = agreement.clone();
            let agreements = self.agreements.clone();
            Box::pin(async move {
                let mut agreements = agreements.write().await;
                if !agreements.contains_key(&agreement.agreement_id) {
                    return Err(DomainError::NotFound);
                }
                agreements.insert(agreement.agreement_id.clone(), agreement.clone());
                Ok(agreement)
            })
        }

        fn list_by_request(
            &self,
            request_id: &str,
        ) -> BoxFuture<'_, DomainResult<Vec<Agreement>>> {
            let request_id = request_id.to_string();
            let agreements = self.agreements.clone();
            Box::pin(async move {
                let mut matching: Vec<_> = agreements
                    .read()
                    .await
                    .values()
                    .filter(|agreement| agreement.request_id == request_id)
                    .cloned()
                    .collect();
                matching.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
                Ok(matching)
            })
        }
    }
}

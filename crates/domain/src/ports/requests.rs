use crate::DomainResult;
use crate::requests::{RequestStatus, ServiceRequest};

pub trait RequestRepository: Send + Sync {
    fn create(
        &self,
        request: &ServiceRequest,
    ) -> crate::ports::BoxFuture<'_, DomainResult<ServiceRequest>>;

    fn get(
        &self,
        request_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Option<ServiceRequest>>>;

    fn update(
        &self,
        request: &ServiceRequest,
    ) -> crate::ports::BoxFuture<'_, DomainResult<ServiceRequest>>;

    /// Requests in the given status, newest first.
    fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<ServiceRequest>>>;
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
    pub struct MockRequestRepo {
        requests: Arc<RwLock<HashMap<String, ServiceRequest>>>,
    }

    impl MockRequestRepo {
        pub async fn seed(&self, request: ServiceRequest) {
            self.requests
                .write()
                .await
                .insert(request.request_id.clone(), request);
        }

        pub async fn snapshot(&self, request_id: &str) -> Option<ServiceRequest> {
            self.requests.read().await.get(request_id).cloned()
        }
    }

    impl RequestRepository for MockRequestRepo {
        fn create(&self, request: &ServiceRequest) -> BoxFuture<'_, DomainResult<ServiceRequest>> {
            let request = request.clone();
            let requests = self.requests.clone();
            Box::pin(async move {
                let mut requests = requests.write().await;
                if requests.contains_key(&request.request_id) {
                    return Err(DomainError::Conflict);
                }
                requests.insert(request.request_id.clone(), request.clone());
                Ok(request)
            })
        }

        fn get(&self, request_id: &str) -> BoxFuture<'_, DomainResult<Option<ServiceRequest>>> {
            let request_id = request_id.to_string();
            let requests = self.requests.clone();
            Box::pin(async move { Ok(requests.read().await.get(&request_id).cloned()) })
        }

        fn update(&self, request: &ServiceRequest) -> BoxFuture<'_, DomainResult<ServiceRequest>> {
            let request = request.clone();
            let requests = self.requests.clone();
            Box::pin(async move {
                let mut requests = requests.write().await;
                if !requests.contains_key(&request.request_id) {
                    return Err(DomainError::NotFound);
                }
                requests.insert(request.request_id.clone(), request.clone());
                Ok(request)
            })
        }

        fn list_by_status(
            &self,
            status: RequestStatus,
        ) -> BoxFuture<'_, DomainResult<Vec<ServiceRequest>>> {
            let requests = self.requests.clone();
            Box::pin(async move {
                let mut open: Vec<_> = requests
                    .read()
                    .await
                    .values()
                    .filter(|request| request.status == status)
                    .cloned()
                    .collect();
                open.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
                Ok(open)
            })
        }
    }
}

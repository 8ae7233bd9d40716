use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use skillswap_domain::DomainResult;
use skillswap_domain::agreements::Agreement;
use skillswap_domain::chat::{ChatMessage, MessageWindow};
use skillswap_domain::error::DomainError;
use skillswap_domain::ports::BoxFuture;
use skillswap_domain::ports::agreements::AgreementRepository;
use skillswap_domain::ports::chat::ChatMessageRepository;
use skillswap_domain::ports::requests::RequestRepository;
use skillswap_domain::ports::users::UserRepository;
use skillswap_domain::requests::{RequestStatus, ServiceRequest};
use skillswap_domain::users::User;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let users = self.users.clone();
        Box::pin(async move {
            let mut users = users.write().await;
            if users.values().any(|existing| existing.email == user.email) {
                return Err(DomainError::Conflict);
            }
            users.insert(user.user_id.clone(), user.clone());
            Ok(user)
        })
    }

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let user_id = user_id.to_string();
        let users = self.users.clone();
        Box::pin(async move { Ok(users.read().await.get(&user_id).cloned()) })
    }

    fn get_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let email = email.to_string();
        let users = self.users.clone();
        Box::pin(async move {
            Ok(users
                .read()
                .await
                .values()
                .find(|user| user.email == email)
                .cloned())
        })
    }

    fn update(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let users = self.users.clone();
        Box::pin(async move {
            let mut users = users.write().await;
            if !users.contains_key(&user.user_id) {
                return Err(DomainError::NotFound);
            }
            users.insert(user.user_id.clone(), user.clone());
            Ok(user)
        })
    }

    fn list_with_any_skill(
        &self,
        skills: &[String],
        exclude_user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<User>>> {
        let skills: Vec<String> = skills.to_vec();
        let exclude = exclude_user_id.to_string();
        let users = self.users.clone();
        Box::pin(async move {
            let users = users.read().await;
            let mut found: Vec<User> = users
                .values()
                .filter(|user| user.user_id != exclude)
                .filter(|user| user.skills.iter().any(|tag| skills.contains(tag)))
                .cloned()
                .collect();
            found.sort_by(|a, b| a.user_id.cmp(&b.user_id));
            Ok(found)
        })
    }

    fn list_with_skill(
        &self,
        skill: &str,
        exclude_user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<User>>> {
        let skill = skill.to_string();
        let exclude = exclude_user_id.to_string();
        let users = self.users.clone();
        Box::pin(async move {
            let users = users.read().await;
            let mut found: Vec<User> = users
                .values()
                .filter(|user| user.user_id != exclude)
                .filter(|user| user.skills.iter().any(|tag| *tag == skill))
                .cloned()
                .collect();
            found.sort_by(|a, b| a.user_id.cmp(&b.user_id));
            Ok(found)
        })
    }
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: Arc<RwLock<HashMap<String, ServiceRequest>>>,
}

impl RequestRepository for InMemoryRequestRepository {
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
            let requests = requests.read().await;
            let mut found: Vec<ServiceRequest> = requests
                .values()
                .filter(|request| request.status == status)
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
            Ok(found)
        })
    }
}

#[derive(Default)]
pub struct InMemoryAgreementRepository {
    agreements: Arc<RwLock<HashMap<String, Agreement>>>,
}

impl AgreementRepository for InMemoryAgreementRepository {
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

    fn list_by_request(&self, request_id: &str) -> BoxFuture<'_, DomainResult<Vec<Agreement>>> {
        let request_id = request_id.to_string();
        let agreements = self.agreements.clone();
        Box::pin(async move {
            let agreements = agreements.read().await;
            let mut found: Vec<Agreement> = agreements
                .values()
                .filter(|agreement| agreement.request_id == request_id)
                .cloned()
                .collect();
            found.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
            Ok(found)
        })
    }
}

#[derive(Default)]
pub struct InMemoryChatMessageRepository {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
}

impl ChatMessageRepository for InMemoryChatMessageRepository {
    fn append(&self, message: &ChatMessage) -> BoxFuture<'_, DomainResult<ChatMessage>> {
        let message = message.clone();
        let messages = self.messages.clone();
        Box::pin(async move {
            messages.write().await.push(message.clone());
            Ok(message)
        })
    }

    fn list_by_request(
        &self,
        request_id: &str,
        window: &MessageWindow,
    ) -> BoxFuture<'_, DomainResult<Vec<ChatMessage>>> {
        let request_id = request_id.to_string();
        let window = *window;
        let messages = self.messages.clone();
        Box::pin(async move {
            let messages = messages.read().await;
            let mut found: Vec<ChatMessage> = messages
                .iter()
                .filter(|message| message.request_id == request_id)
                .filter(|message| {
                    window
                        .since_ms
                        .is_none_or(|since| message.created_at_ms > since)
                })
                .cloned()
                .collect();
            found.sort_by(|a, b| {
                (a.created_at_ms, &a.message_id).cmp(&(b.created_at_ms, &b.message_id))
            });
            found.truncate(window.limit);
            Ok(found)
        })
    }
}

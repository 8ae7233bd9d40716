use std::sync::Arc;

use skillswap_domain::agreements::AgreementService;
use skillswap_domain::auth::AuthService;
use skillswap_domain::chat::ChatService;
use skillswap_domain::matching::MatchService;
use skillswap_domain::ports::agreements::AgreementRepository;
use skillswap_domain::ports::auth::{MailSink, PasswordHasher};
use skillswap_domain::ports::blob::BlobStore;
use skillswap_domain::ports::chat::ChatMessageRepository;
use skillswap_domain::ports::requests::RequestRepository;
use skillswap_domain::ports::users::UserRepository;
use skillswap_domain::requests::RequestService;
use skillswap_domain::users::ProfileService;
use skillswap_infra::auth::{Argon2PasswordHasher, TokenService};
use skillswap_infra::blob::FsBlobStore;
use skillswap_infra::config::AppConfig;
use skillswap_infra::db::{self, DbConfig};
use skillswap_infra::mailer::HttpMailSink;
use skillswap_infra::repositories::{
    InMemoryAgreementRepository, InMemoryChatMessageRepository, InMemoryRequestRepository,
    InMemoryUserRepository, SurrealAgreementRepository, SurrealChatMessageRepository,
    SurrealRequestRepository, SurrealUserRepository,
};

use crate::realtime::ChatRealtime;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub users: Arc<dyn UserRepository>,
    pub requests: Arc<dyn RequestRepository>,
    pub agreements: Arc<dyn AgreementRepository>,
    pub messages: Arc<dyn ChatMessageRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub mail: Arc<dyn MailSink>,
    pub blobs: Arc<dyn BlobStore>,
    pub tokens: TokenService,
    pub realtime: Arc<ChatRealtime>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let (users, requests, agreements, messages): (
            Arc<dyn UserRepository>,
            Arc<dyn RequestRepository>,
            Arc<dyn AgreementRepository>,
            Arc<dyn ChatMessageRepository>,
        ) = match config.data_backend.as_str() {
            "surreal" => {
                let client = db::connect(&DbConfig::from_app_config(&config)).await?;
                (
                    Arc::new(SurrealUserRepository::with_client(client.clone())),
                    Arc::new(SurrealRequestRepository::with_client(client.clone())),
                    Arc::new(SurrealAgreementRepository::with_client(client.clone())),
                    Arc::new(SurrealChatMessageRepository::with_client(client)),
                )
            }
            backend => {
                if backend != "memory" {
                    tracing::warn!(backend, "unknown data backend; falling back to memory");
                }
                (
                    Arc::new(InMemoryUserRepository::default()),
                    Arc::new(InMemoryRequestRepository::default()),
                    Arc::new(InMemoryAgreementRepository::default()),
                    Arc::new(InMemoryChatMessageRepository::default()),
                )
            }
        };

        Ok(Self {
            tokens: TokenService::from_app_config(&config),
            hasher: Arc::new(Argon2PasswordHasher),
            mail: Arc::new(HttpMailSink::from_config(&config)),
            blobs: Arc::new(FsBlobStore::from_config(&config)),
            realtime: Arc::new(ChatRealtime::default()),
            users,
            requests,
            agreements,
            messages,
            config,
        })
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.users.clone(), self.hasher.clone(), self.mail.clone())
    }

    pub fn profile_service(&self) -> ProfileService {
        ProfileService::new(self.users.clone())
    }

    pub fn match_service(&self) -> MatchService {
        MatchService::new(self.users.clone())
    }

    pub fn request_service(&self) -> RequestService {
        RequestService::new(self.requests.clone(), self.users.clone())
    }

    pub fn agreement_service(&self) -> AgreementService {
        AgreementService::new(self.agreements.clone(), self.requests.clone())
    }

    pub fn chat_service(&self) -> ChatService {
        ChatService::new(self.messages.clone(), self.request_service())
    }
}

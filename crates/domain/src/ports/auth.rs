use thiserror::Error;

use crate::DomainResult;

/// Opaque, salted, irreversible password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;

    fn verify(&self, password: &str, password_hash: &str) -> DomainResult<bool>;
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail sink unavailable: {0}")]
    Unavailable(String),
    #[error("mail sink rejected message: {0}")]
    Rejected(String),
}

/// Outbound notification sink. Delivery is best-effort: callers downgrade a
/// failure to a warning and surface the code through a fallback channel.
pub trait MailSink: Send + Sync {
    fn send_otp(
        &self,
        to: &str,
        name: &str,
        code: &str,
    ) -> crate::ports::BoxFuture<'_, Result<(), MailError>>;
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use tokio::sync::RwLock;

    use super::*;
    use crate::error::DomainError;
    use crate::ports::BoxFuture;

    /// Reversible "hash" for tests; real hashing lives in the infra crate.
    pub struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> DomainResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify(&self, password: &str, password_hash: &str) -> DomainResult<bool> {
            Ok(password_hash == format!("hashed:{password}"))
        }
    }

    pub struct FailingHasher;

    impl PasswordHasher for FailingHasher {
        fn hash(&self, _password: &str) -> DomainResult<String> {
            Err(DomainError::Upstream("hasher broken".into()))
        }

        fn verify(&self, _password: &str, _password_hash: &str) -> DomainResult<bool> {
            Err(DomainError::Upstream("hasher broken".into()))
        }
    }

    #[derive(Default)]
    pub struct RecordingMailSink {
        pub sent: Arc<RwLock<Vec<(String, String)>>>,
        pub fail: bool,
    }

    impl RecordingMailSink {
        pub fn failing() -> Self {
            Self {
                sent: Arc::default(),
                fail: true,
            }
        }
    }

    impl MailSink for RecordingMailSink {
        fn send_otp(
            &self,
            to: &str,
            _name: &str,
            code: &str,
        ) -> BoxFuture<'_, Result<(), MailError>> {
            let to = to.to_string();
            let code = code.to_string();
            let sent = self.sent.clone();
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    return Err(MailError::Unavailable("relay down".into()));
                }
                sent.write().await.push((to, code));
                Ok(())
            })
        }
    }
}

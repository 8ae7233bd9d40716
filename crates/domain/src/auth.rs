use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::auth::{MailSink, PasswordHasher};
use crate::ports::users::UserRepository;
use crate::users::{ExpertiseLevel, OtpCode, User, UserPublic, validate_name, validate_skills};
use crate::util::{now_ms, uuid_v7_without_dashes};

pub const OTP_TTL_MS: i64 = 10 * 60 * 1000;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Clone, Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub skills: Vec<String>,
    pub expertise_level: ExpertiseLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterOutcome {
    pub user: UserPublic,
    /// Populated when the notification sink could not deliver the code, so
    /// the caller still has a channel to complete verification.
    pub otp_fallback: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    mail: Arc<dyn MailSink>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        mail: Arc<dyn MailSink>,
    ) -> Self {
        Self {
            users,
            hasher,
            mail,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> DomainResult<RegisterOutcome> {
        let name = validate_name(&input.name)?;
        let email = normalize_email(&input.email)?;
        if input.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        let skills = validate_skills(&input.skills)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict);
        }

        let password_hash = self.hasher.hash(&input.password)?;
        let code = generate_otp();
        let now = now_ms();
        let user = User {
            user_id: uuid_v7_without_dashes(),
            name,
            email: email.clone(),
            password_hash,
            skills,
            expertise_level: input.expertise_level,
            is_verified: false,
            otp: Some(OtpCode {
                code: code.clone(),
                expires_at_ms: now + OTP_TTL_MS,
            }),
            portfolio: vec![],
            created_at_ms: now,
        };
        let user = self.users.create(&user).await?;

        // Delivery failure never fails registration; the code falls back to
        // the response and the log.
        let otp_fallback = match self.mail.send_otp(&email, &user.name, &code).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(error = %err, email = %email, "otp delivery failed; returning code in-band");
                Some(code)
            }
        };

        Ok(RegisterOutcome {
            user: user.into(),
            otp_fallback,
        })
    }

    pub async fn verify_otp(&self, email: &str, code: &str) -> DomainResult<UserPublic> {
        let email = normalize_email(email)?;
        let mut user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(DomainError::NotFound)?;

        let valid = user
            .otp
            .as_ref()
            .is_some_and(|otp| otp.matches(code.trim(), now_ms()));
        if !valid {
            return Err(DomainError::InvalidOtp);
        }

        user.is_verified = true;
        user.otp = None;
        let user = self.users.update(&user).await?;
        Ok(user.into())
    }

    pub async fn login(&self, email: &str, password: &str) -> DomainResult<UserPublic> {
        let email = normalize_email(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(DomainError::NotFound)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(DomainError::InvalidCredentials);
        }
        if !user.is_verified {
            return Err(DomainError::NotVerified);
        }
        Ok(user.into())
    }
}

fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    if !email_is_valid(&email) {
        return Err(DomainError::Validation("invalid email format".into()));
    }
    Ok(email)
}

fn email_is_valid(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::auth::tests::{FailingHasher, PlainHasher, RecordingMailSink};
    use crate::ports::users::tests::MockUserRepo;

    fn service(repo: Arc<MockUserRepo>, mail: RecordingMailSink) -> AuthService {
        AuthService::new(repo, Arc::new(PlainHasher), Arc::new(mail))
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Alice".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
            skills: vec!["React".to_string()],
            expertise_level: ExpertiseLevel::Beginner,
        }
    }

    #[tokio::test]
    async fn register_aborts_when_hashing_fails() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = AuthService::new(
            repo.clone(),
            Arc::new(FailingHasher),
            Arc::new(RecordingMailSink::default()),
        );

        let err = auth
            .register(register_input("alice@example.com"))
            .await
            .expect_err("hash failure must abort registration");
        assert!(matches!(err, DomainError::Upstream(_)));
        let lookup = repo.get_by_email("alice@example.com").await.expect("lookup");
        assert!(lookup.is_none());
    }

    #[tokio::test]
    async fn register_persists_unverified_user_with_otp() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        let outcome = auth
            .register(register_input("Alice@Example.com"))
            .await
            .expect("register");
        assert!(outcome.otp_fallback.is_none());
        assert!(!outcome.user.is_verified);
        assert_eq!(outcome.user.email, "alice@example.com");

        let stored = repo.snapshot(&outcome.user.user_id).await.expect("stored");
        let otp = stored.otp.expect("otp set");
        assert_eq!(otp.code.len(), 6);
        assert!(otp.code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict_and_creates_nothing() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        auth.register(register_input("alice@example.com"))
            .await
            .expect("first register");
        let err = auth
            .register(register_input("alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn malformed_email_rejected_without_persisting() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        let err = auth.register(register_input("not-an-email")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn mail_failure_surfaces_otp_in_band() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::failing());

        let outcome = auth
            .register(register_input("alice@example.com"))
            .await
            .expect("register succeeds despite sink failure");
        let fallback = outcome.otp_fallback.expect("fallback code");
        let stored = repo.snapshot(&outcome.user.user_id).await.expect("stored");
        assert_eq!(stored.otp.expect("otp").code, fallback);
    }

    #[tokio::test]
    async fn register_verify_login_round_trip() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        let outcome = auth
            .register(register_input("alice@example.com"))
            .await
            .expect("register");
        let code = repo
            .snapshot(&outcome.user.user_id)
            .await
            .and_then(|user| user.otp)
            .expect("otp")
            .code;

        let verified = auth
            .verify_otp("alice@example.com", &code)
            .await
            .expect("verify");
        assert!(verified.is_verified);

        let logged_in = auth
            .login("alice@example.com", "hunter22")
            .await
            .expect("login");
        assert_eq!(logged_in.user_id, outcome.user.user_id);

        // The code is single-use: it is cleared on success.
        let err = auth.verify_otp("alice@example.com", &code).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidOtp));
    }

    #[tokio::test]
    async fn wrong_otp_rejected() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        auth.register(register_input("alice@example.com"))
            .await
            .expect("register");
        let err = auth
            .verify_otp("alice@example.com", "000000")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidOtp));
    }

    #[tokio::test]
    async fn expired_otp_rejected() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        let outcome = auth
            .register(register_input("alice@example.com"))
            .await
            .expect("register");
        let mut stored = repo.snapshot(&outcome.user.user_id).await.expect("stored");
        let code = stored.otp.as_ref().expect("otp").code.clone();
        stored.otp = Some(OtpCode {
            code: code.clone(),
            expires_at_ms: now_ms() - 1,
        });
        repo.seed(stored).await;

        let err = auth
            .verify_otp("alice@example.com", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidOtp));
    }

    #[tokio::test]
    async fn unverified_user_cannot_login_even_with_correct_password() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        auth.register(register_input("alice@example.com"))
            .await
            .expect("register");
        let err = auth
            .login("alice@example.com", "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotVerified));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo.clone(), RecordingMailSink::default());

        let outcome = auth
            .register(register_input("alice@example.com"))
            .await
            .expect("register");
        let code = repo
            .snapshot(&outcome.user.user_id)
            .await
            .and_then(|user| user.otp)
            .expect("otp")
            .code;
        auth.verify_otp("alice@example.com", &code)
            .await
            .expect("verify");

        let err = auth.login("alice@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unknown_email_login_is_not_found() {
        let repo = Arc::new(MockUserRepo::default());
        let auth = service(repo, RecordingMailSink::default());
        let err = auth.login("ghost@example.com", "pass42").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn email_shapes() {
        assert!(email_is_valid("a@b.co"));
        assert!(email_is_valid("first.last@sub.example.com"));
        assert!(!email_is_valid("not-an-email"));
        assert!(!email_is_valid("a@b"));
        assert!(!email_is_valid("@b.co"));
        assert!(!email_is_valid("a@.co"));
        assert!(!email_is_valid("a b@c.co"));
    }
}

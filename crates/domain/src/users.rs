use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::users::UserRepository;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_SKILL_LENGTH: usize = 64;
pub const MAX_SKILLS: usize = 50;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExpertiseLevel {
    Beginner,
    Intermediate,
    Expert,
}

/// A pending email verification code. Compared with exact string equality
/// and an expiry check; the stored code is cleared on successful match.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OtpCode {
    pub code: String,
    pub expires_at_ms: i64,
}

impl OtpCode {
    pub fn matches(&self, candidate: &str, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms && self.code == candidate
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub skills: Vec<String>,
    pub expertise_level: ExpertiseLevel,
    pub is_verified: bool,
    pub otp: Option<OtpCode>,
    pub portfolio: Vec<String>,
    pub created_at_ms: i64,
}

/// Password-free projection. Every read path returns this, never `User`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserPublic {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub expertise_level: ExpertiseLevel,
    pub is_verified: bool,
    pub portfolio: Vec<String>,
    pub created_at_ms: i64,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            skills: user.skills,
            expertise_level: user.expertise_level,
            is_verified: user.is_verified,
            portfolio: user.portfolio,
            created_at_ms: user.created_at_ms,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub expertise_level: Option<ExpertiseLevel>,
}

pub fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::Validation(format!(
            "name exceeds max length of {MAX_NAME_LENGTH}"
        )));
    }
    Ok(name.to_string())
}

/// Skill tags are exact, case-sensitive strings; trimming is the only
/// normalization applied. Duplicates are the caller's concern.
pub fn validate_skills(skills: &[String]) -> DomainResult<Vec<String>> {
    if skills.is_empty() {
        return Err(DomainError::Validation(
            "at least one skill is required".into(),
        ));
    }
    if skills.len() > MAX_SKILLS {
        return Err(DomainError::Validation(format!(
            "skills exceed max of {MAX_SKILLS}"
        )));
    }
    let mut cleaned = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim();
        if skill.is_empty() {
            return Err(DomainError::Validation("skill tags must be non-empty".into()));
        }
        if skill.chars().count() > MAX_SKILL_LENGTH {
            return Err(DomainError::Validation(format!(
                "skill tag exceeds max length of {MAX_SKILL_LENGTH}"
            )));
        }
        cleaned.push(skill.to_string());
    }
    Ok(cleaned)
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn get(&self, user_id: &str) -> DomainResult<UserPublic> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        Ok(user.into())
    }

    pub async fn update(&self, user_id: &str, update: ProfileUpdate) -> DomainResult<UserPublic> {
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        if let Some(name) = update.name {
            user.name = validate_name(&name)?;
        }
        if let Some(skills) = update.skills {
            user.skills = validate_skills(&skills)?;
        }
        if let Some(level) = update.expertise_level {
            user.expertise_level = level;
        }

        let user = self.users.update(&user).await?;
        Ok(user.into())
    }

    pub async fn add_portfolio(&self, user_id: &str, url: String) -> DomainResult<UserPublic> {
        if url.trim().is_empty() {
            return Err(DomainError::Validation("portfolio url is required".into()));
        }
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        user.portfolio.push(url);
        let user = self.users.update(&user).await?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::users::tests::MockUserRepo;

    fn sample_user(user_id: &str, email: &str) -> User {
        User {
            user_id: user_id.to_string(),
            name: "Alice".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            skills: vec!["React".to_string()],
            expertise_level: ExpertiseLevel::Intermediate,
            is_verified: true,
            otp: None,
            portfolio: vec![],
            created_at_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn update_touches_only_provided_fields() {
        let repo = Arc::new(MockUserRepo::default());
        repo.seed(sample_user("u-1", "alice@example.com")).await;
        let service = ProfileService::new(repo);

        let updated = service
            .update(
                "u-1",
                ProfileUpdate {
                    name: None,
                    skills: Some(vec!["React".to_string(), "Node.js".to_string()]),
                    expertise_level: None,
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.skills, vec!["React", "Node.js"]);
        assert_eq!(updated.expertise_level, ExpertiseLevel::Intermediate);
    }

    #[tokio::test]
    async fn update_rejects_empty_skill_tag() {
        let repo = Arc::new(MockUserRepo::default());
        repo.seed(sample_user("u-1", "alice@example.com")).await;
        let service = ProfileService::new(repo);

        let err = service
            .update(
                "u-1",
                ProfileUpdate {
                    skills: Some(vec!["  ".to_string()]),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn add_portfolio_appends_url() {
        let repo = Arc::new(MockUserRepo::default());
        repo.seed(sample_user("u-1", "alice@example.com")).await;
        let service = ProfileService::new(repo);

        let updated = service
            .add_portfolio("u-1", "https://files.example/x.pdf".to_string())
            .await
            .expect("portfolio");
        assert_eq!(updated.portfolio, vec!["https://files.example/x.pdf"]);
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let repo = Arc::new(MockUserRepo::default());
        let service = ProfileService::new(repo);
        let err = service.get("missing").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn otp_requires_exact_match_and_freshness() {
        let otp = OtpCode {
            code: "123456".to_string(),
            expires_at_ms: 10_000,
        };
        assert!(otp.matches("123456", 9_999));
        assert!(!otp.matches("123456", 10_000));
        assert!(!otp.matches("123457", 9_999));
        // No numeric coercion: a differently formatted code never matches.
        assert!(!otp.matches("0123456", 9_999));
    }
}

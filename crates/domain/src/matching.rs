use std::sync::Arc;

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::users::UserRepository;
use crate::users::UserPublic;

#[derive(Clone)]
pub struct MatchService {
    users: Arc<dyn UserRepository>,
}

impl MatchService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Everyone sharing at least one skill with the caller, caller excluded.
    pub async fn find_matches(&self, user_id: &str) -> DomainResult<Vec<UserPublic>> {
        let user = self.users.get(user_id).await?.ok_or(DomainError::NotFound)?;
        if user.skills.is_empty() {
            return Ok(vec![]);
        }
        let matches = self
            .users
            .list_with_any_skill(&user.skills, user_id)
            .await?;
        Ok(matches.into_iter().map(UserPublic::from).collect())
    }

    /// Directory lookup by a single skill tag. An empty result is an error so
    /// callers can distinguish "nobody offers this" from an empty board.
    pub async fn find_by_skill(
        &self,
        caller_id: &str,
        skill: &str,
    ) -> DomainResult<Vec<UserPublic>> {
        let skill = skill.trim();
        if skill.is_empty() {
            return Err(DomainError::Validation("skill must not be empty".into()));
        }
        let found = self.users.list_with_skill(skill, caller_id).await?;
        if found.is_empty() {
            return Err(DomainError::NotFound);
        }
        Ok(found.into_iter().map(UserPublic::from).collect())
    }
}

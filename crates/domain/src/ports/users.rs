use crate::DomainResult;
use crate::users::User;

/// Identity store. `create` must reject a duplicate email with
/// [`DomainError::Conflict`](crate::error::DomainError::Conflict).
pub trait UserRepository: Send + Sync {
    fn create(&self, user: &User) -> crate::ports::BoxFuture<'_, DomainResult<User>>;

    fn get(&self, user_id: &str) -> crate::ports::BoxFuture<'_, DomainResult<Option<User>>>;

    fn get_by_email(&self, email: &str)
    -> crate::ports::BoxFuture<'_, DomainResult<Option<User>>>;

    fn update(&self, user: &User) -> crate::ports::BoxFuture<'_, DomainResult<User>>;

    /// All users other than `exclude_user_id` whose skill list intersects
    /// `skills` (exact tag match).
    fn list_with_any_skill(
        &self,
        skills: &[String],
        exclude_user_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<User>>>;

    /// All users other than `exclude_user_id` possessing the exact tag.
    fn list_with_skill(
        &self,
        skill: &str,
        exclude_user_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<User>>>;
}

#[cfg(test)]
pub mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use tokio::sync::RwLock;

    use super::*;
    use crate::error::DomainError;
    use crate::ports::BoxFuture;

    /// In-memory mock shared by the domain test modules.
    #[derive(Default)]
    pub struct MockUserRepo {
        users: Arc<RwLock<HashMap<String, User>>>,
    }

    impl MockUserRepo {
        pub async fn seed(&self, user: User) {
            self.users.write().await.insert(user.user_id.clone(), user);
        }

        pub async fn snapshot(&self, user_id: &str) -> Option<User> {
            self.users.read().await.get(user_id).cloned()
        }

        pub async fn count(&self) -> usize {
            self.users.read().await.len()
        }
    }

    impl UserRepository for MockUserRepo {
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
                Ok(users
                    .values()
                    .filter(|user| user.user_id != exclude)
                    .filter(|user| user.skills.iter().any(|tag| skills.contains(tag)))
                    .cloned()
                    .collect())
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
                Ok(users
                    .values()
                    .filter(|user| user.user_id != exclude)
                    .filter(|user| user.skills.iter().any(|tag| tag == &skill))
                    .cloned()
                    .collect())
            })
        }
    }
}

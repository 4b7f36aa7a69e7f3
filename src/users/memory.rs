use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    model::{NewUser, Role, User, UserFilter, UserPatch, UserStatus, Visibility},
    repo::UserRepository,
};
use crate::error::{AppError, AppResult};

/// In-memory [`UserRepository`] used by the test suite. Mirrors the unique
/// indexes of the `users` table.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record, hash included, regardless of deletion state.
    pub async fn raw(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    /// Flip `status` directly; there is no service operation for it.
    pub async fn block(&self, id: Uuid) {
        if let Some(u) = self.users.write().await.get_mut(&id) {
            u.status = UserStatus::Blocked;
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, new: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new.email) {
            return Err(AppError::Conflict("Duplicate value for: email".into()));
        }
        if let Some(display_id) = &new.display_id {
            if users
                .values()
                .any(|u| u.display_id.as_ref() == Some(display_id))
            {
                return Err(AppError::Conflict("Duplicate value for: id".into()));
            }
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            display_id: new.display_id,
            name: new.name,
            email: new.email,
            role: new.role,
            password_hash: new.password_hash,
            profile: new.profile,
            status: new.status,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid, visibility: Visibility) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| visibility.admits(u)).cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
        visibility: Visibility,
    ) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email == email && visibility.admits(u))
            .cloned())
    }

    async fn find_for_login(
        &self,
        email: &str,
        role: Role,
        visibility: Visibility,
    ) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email == email && u.role == role && visibility.admits(u))
            .cloned())
    }

    async fn list(&self, filter: &UserFilter, visibility: Visibility) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        let mut out: Vec<User> = users
            .values()
            .filter(|u| visibility.admits(u) && filter.matches(u))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn count(&self, filter: &UserFilter, visibility: Visibility) -> AppResult<i64> {
        let users = self.users.read().await;
        let n = users
            .values()
            .filter(|u| visibility.admits(u) && filter.matches(u))
            .count();
        Ok(n as i64)
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        if let Some(email) = &patch.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::Conflict("Duplicate value for: email".into()));
            }
        }
        let Some(existing) = users.get_mut(&id).filter(|u| !u.is_deleted) else {
            return Ok(None);
        };
        patch.apply(existing);
        existing.updated_at = OffsetDateTime::now_utc();
        Ok(Some(existing.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(existing) = users.get_mut(&id).filter(|u| !u.is_deleted) else {
            return Ok(None);
        };
        existing.password_hash = hash.to_string();
        existing.updated_at = OffsetDateTime::now_utc();
        Ok(Some(existing.clone()))
    }

    async fn mark_deleted(&self, id: Uuid) -> AppResult<()> {
        if let Some(u) = self
            .users
            .write()
            .await
            .get_mut(&id)
            .filter(|u| !u.is_deleted)
        {
            u.is_deleted = true;
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::model::Profile;

    async fn seeded() -> (InMemoryUserRepository, User) {
        let repo = InMemoryUserRepository::new();
        let user = repo
            .insert(NewUser {
                display_id: None,
                name: "A".into(),
                email: "a@x.com".into(),
                role: Role::Student,
                password_hash: "h".into(),
                profile: Profile::default(),
                status: UserStatus::Active,
            })
            .await
            .unwrap();
        (repo, user)
    }

    #[tokio::test]
    async fn mark_deleted_touches_updated_at_once() {
        let (repo, user) = seeded().await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        repo.mark_deleted(user.id).await.unwrap();
        let deleted = repo.raw(user.id).await.unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.updated_at > user.updated_at);

        repo.mark_deleted(user.id).await.unwrap();
        assert_eq!(repo.raw(user.id).await.unwrap().updated_at, deleted.updated_at);
    }

    #[tokio::test]
    async fn update_keeps_unsupplied_columns() {
        let (repo, user) = seeded().await;
        repo.set_password_hash(user.id, "h2").await.unwrap();
        let updated = repo
            .update(
                user.id,
                &UserPatch {
                    department: Some("Math".into()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.password_hash, "h2");
        assert_eq!(updated.profile.department.as_deref(), Some("Math"));
    }
}

use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::db::repository::UserRepository;
use crate::models::{Page, User};
use crate::models::user::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::services::optional_text;
use crate::{AppError, Result};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;

/// Profile management; identity itself lives in the external auth service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Creates the profile for the authenticated caller.
    pub async fn create_user(&self, user_id: Uuid, request: CreateUserRequest) -> Result<UserResponse> {
        let username = validate_username(&request.username)?;
        let email = validate_email(&request.email)?;

        if self.user_repo.get_user_by_id(user_id).await?.is_some() {
            return Err(AppError::Conflict("Profile already exists".to_string()));
        }
        if self.user_repo.get_user_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict(format!("Username '{}' is taken", username)));
        }

        let now = Utc::now();
        let user = User {
            id: user_id,
            username,
            email,
            full_name: optional_text(request.full_name),
            bio: optional_text(request.bio),
            avatar_url: optional_text(request.avatar_url),
            location: optional_text(request.location),
            website: optional_text(request.website),
            user_type: request.user_type.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            follower_count: 0,
            following_count: 0,
        };

        let created = self.user_repo.create_user(&user).await?;
        tracing::info!("👤 USERS: Created profile '{}' ({})", created.username, created.id);
        Ok(created.into())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse> {
        self.find_user(user_id).await.map(UserResponse::from)
    }

    pub async fn list_users(&self, page: Page) -> Result<Vec<UserResponse>> {
        let users = self.user_repo.list_users(page).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn update_user(&self, caller: Uuid, user_id: Uuid, request: UpdateUserRequest) -> Result<UserResponse> {
        ensure_self(caller, user_id)?;
        let mut user = self.find_user(user_id).await?;

        if let Some(username) = request.username {
            let username = validate_username(&username)?;
            if !username.eq_ignore_ascii_case(&user.username) {
                if let Some(existing) = self.user_repo.get_user_by_username(&username).await? {
                    if existing.id != user.id {
                        return Err(AppError::Conflict(format!("Username '{}' is taken", username)));
                    }
                }
            }
            user.username = username;
        }
        if let Some(email) = request.email {
            user.email = validate_email(&email)?;
        }
        if request.full_name.is_some() {
            user.full_name = optional_text(request.full_name);
        }
        if request.bio.is_some() {
            user.bio = optional_text(request.bio);
        }
        if request.avatar_url.is_some() {
            user.avatar_url = optional_text(request.avatar_url);
        }
        if request.location.is_some() {
            user.location = optional_text(request.location);
        }
        if request.website.is_some() {
            user.website = optional_text(request.website);
        }
        if let Some(user_type) = request.user_type {
            user.user_type = user_type;
        }
        user.updated_at = Utc::now();

        let updated = self.user_repo.update_user(&user).await?;
        Ok(updated.into())
    }

    pub async fn delete_user(&self, caller: Uuid, user_id: Uuid) -> Result<()> {
        ensure_self(caller, user_id)?;
        self.find_user(user_id).await?;
        self.user_repo.delete_user(user_id).await?;
        tracing::info!("🗑️ USERS: Deleted profile {}", user_id);
        Ok(())
    }

    /// Fails with `NotFound` when no profile exists for `user_id`.
    pub async fn ensure_exists(&self, user_id: Uuid) -> Result<()> {
        self.find_user(user_id).await.map(|_| ())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repo
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

fn ensure_self(caller: Uuid, user_id: Uuid) -> Result<()> {
    if caller != user_id {
        return Err(AppError::Forbidden("You can only modify your own profile".to_string()));
    }
    Ok(())
}

fn validate_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::ValidationError(
            "username may only contain letters, digits and underscores".to_string(),
        ));
    }
    Ok(username.to_string())
}

fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if !email.contains('@') {
        return Err(AppError::ValidationError("email must contain '@'".to_string()));
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::InMemoryRepository;
    use crate::models::UserType;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryRepository::new()))
    }

    fn request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: Some("  ".to_string()),
            bio: None,
            avatar_url: None,
            location: None,
            website: None,
            user_type: None,
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ada_99").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
        assert!(validate_username("ada lovelace").is_err());
        assert!(validate_username("ada-l").is_err());
    }

    #[tokio::test]
    async fn test_create_user_defaults() {
        let service = service();
        let id = Uuid::new_v4();
        let user = service.create_user(id, request("ada")).await.unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.user_type, UserType::Individual);
        assert_eq!(user.full_name, "");
        assert_eq!(user.follower_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let service = service();
        service.create_user(Uuid::new_v4(), request("ada")).await.unwrap();

        let result = service.create_user(Uuid::new_v4(), request("ADA")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_second_profile_for_same_caller_conflicts() {
        let service = service();
        let id = Uuid::new_v4();
        service.create_user(id, request("ada")).await.unwrap();

        let result = service.create_user(id, request("grace")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_self_only() {
        let service = service();
        let id = Uuid::new_v4();
        service.create_user(id, request("ada")).await.unwrap();

        let other = Uuid::new_v4();
        let update = UpdateUserRequest { bio: Some("hi".to_string()), ..Default::default() };
        assert!(matches!(service.update_user(other, id, update).await, Err(AppError::Forbidden(_))));
        assert!(matches!(service.delete_user(other, id).await, Err(AppError::Forbidden(_))));

        let update = UpdateUserRequest {
            bio: Some("Analyst".to_string()),
            user_type: Some(UserType::Mentor),
            ..Default::default()
        };
        let updated = service.update_user(id, id, update).await.unwrap();
        assert_eq!(updated.bio, "Analyst");
        assert_eq!(updated.user_type, UserType::Mentor);

        service.delete_user(id, id).await.unwrap();
        assert!(matches!(service.get_user(id).await, Err(AppError::NotFound(_))));
    }
}

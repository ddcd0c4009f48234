//! User profile operations

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::repository::UserRepository;
use super::user::{PreferencesUpdate, ProfileUpdate, User, validate_username};
use crate::error::{Error, Result};
use crate::media::{ImageStore, ImageUpload, MAX_PROFILE_PICTURE_BYTES, ensure_valid};

/// Orchestrates user accounts and their profile pictures
#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
    images: Arc<dyn ImageStore>,
}

impl UserService {
    pub fn new(repo: UserRepository, images: Arc<dyn ImageStore>) -> Self {
        Self { repo, images }
    }

    pub fn repository(&self) -> &UserRepository {
        &self.repo
    }

    /// Register a new user
    pub async fn create(&self, username: &str) -> Result<User> {
        let username = username.trim();
        let errors = validate_username(username);
        if !errors.is_empty() {
            return Err(Error::ValidationFailed(errors));
        }
        if self.repo.username_exists(username).await? {
            return Err(Error::UserExists(username.to_string()));
        }

        let user = User::new(username);
        self.repo.save(&user).await?;

        info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get(&self, user_id: Uuid) -> Result<User> {
        self.repo
            .get(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    /// Get a user by username
    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.repo
            .get_by_username(username)
            .await?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))
    }

    /// Change username and/or replace preferences
    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<User> {
        let mut user = self.get(user_id).await?;

        if let Some(username) = update.username {
            let username = username.trim().to_string();
            if username != user.username {
                let errors = validate_username(&username);
                if !errors.is_empty() {
                    return Err(Error::ValidationFailed(errors));
                }
                if self.repo.username_exists(&username).await? {
                    return Err(Error::UserExists(username));
                }
                user.username = username;
            }
        }
        if let Some(preferences) = update.preferences {
            user.preferences = preferences;
        }

        user.touch();
        self.repo.update(&user).await?;
        Ok(user)
    }

    /// Merge individual preference fields
    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> Result<User> {
        let mut user = self.get(user_id).await?;
        update.apply_to(&mut user.preferences);
        user.touch();
        self.repo.update(&user).await?;
        Ok(user)
    }

    /// Replace the profile picture; the old file is removed best-effort
    pub async fn upload_profile_picture(&self, user_id: Uuid, image: ImageUpload) -> Result<User> {
        if image.is_empty() {
            return Err(Error::ValidationFailed(vec![
                "Profile picture file is required".to_string(),
            ]));
        }
        ensure_valid(&image, MAX_PROFILE_PICTURE_BYTES)?;

        let mut user = self.get(user_id).await?;

        if let Some(old_file_id) = user.profile_picture_file_id.take()
            && let Err(e) = self.images.delete(&old_file_id).await
        {
            warn!(file_id = %old_file_id, error = %e, "Failed to delete old profile picture");
        }

        let file_name = format!("profile_{}_{}", user.id, Utc::now().timestamp_millis());
        let stored = self.images.upload(&image.bytes, &file_name).await?;

        user.profile_picture = Some(stored.url);
        user.profile_picture_file_id = Some(stored.file_id);
        user.touch();
        self.repo.update(&user).await?;

        info!(user_id = %user.id, "Profile picture updated");
        Ok(user)
    }

    /// Remove the profile picture
    pub async fn delete_profile_picture(&self, user_id: Uuid) -> Result<User> {
        let mut user = self.get(user_id).await?;

        if let Some(file_id) = user.profile_picture_file_id.take()
            && let Err(e) = self.images.delete(&file_id).await
        {
            warn!(file_id = %file_id, error = %e, "Failed to delete profile picture");
        }

        user.profile_picture = None;
        user.touch();
        self.repo.update(&user).await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::Vibe;
    use crate::domain::post::Category;
    use crate::domain::user::{Preferences, Theme};
    use crate::media::StoredImage;
    use crate::storage::Database;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        uploads: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
        fail_delete: bool,
    }

    #[async_trait]
    impl ImageStore for RecordingStore {
        async fn upload(&self, _bytes: &[u8], file_name: &str) -> Result<StoredImage> {
            self.uploads.lock().unwrap().push(file_name.to_string());
            Ok(StoredImage {
                url: format!("https://cdn.test/{}", file_name),
                file_id: format!("file-{}", file_name),
            })
        }

        async fn delete(&self, file_id: &str) -> Result<()> {
            self.deletes.lock().unwrap().push(file_id.to_string());
            if self.fail_delete {
                Err(Error::ImageStoreFailed("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    async fn setup(store: Arc<RecordingStore>) -> (Database, UserService) {
        let db = Database::in_memory().await.expect("Failed to create database");
        let service = UserService::new(UserRepository::new(db.pool().clone()), store);
        (db, service)
    }

    fn png() -> ImageUpload {
        ImageUpload::from_bytes(crate::media::test_fixtures::PNG_BYTES.to_vec())
    }

    #[tokio::test]
    async fn test_create_validates_and_rejects_duplicates() {
        let (_db, service) = setup(Arc::default()).await;

        let user = service.create("  alice ").await.unwrap();
        assert_eq!(user.username, "alice");

        assert!(matches!(
            service.create("alice").await,
            Err(Error::UserExists(_))
        ));
        assert!(matches!(
            service.create("a!").await,
            Err(Error::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let (_db, service) = setup(Arc::default()).await;
        let err = service.get(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_update_profile_username_taken() {
        let (_db, service) = setup(Arc::default()).await;
        let alice = service.create("alice").await.unwrap();
        service.create("bob").await.unwrap();

        let result = service
            .update_profile(
                alice.id,
                ProfileUpdate {
                    username: Some("bob".to_string()),
                    preferences: None,
                },
            )
            .await;
        assert!(matches!(result, Err(Error::UserExists(_))));

        let updated = service
            .update_profile(
                alice.id,
                ProfileUpdate {
                    username: Some("alice".to_string()),
                    preferences: Some(Preferences {
                        theme: Theme::Dark,
                        favorite_styles: vec![Vibe::Wholesome],
                        default_category: Category::Creative,
                    }),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.preferences.theme, Theme::Dark);
        assert_eq!(updated.preferences.default_category, Category::Creative);
    }

    #[tokio::test]
    async fn test_update_preferences_is_partial() {
        let (_db, service) = setup(Arc::default()).await;
        let user = service.create("alice").await.unwrap();

        service
            .update_preferences(
                user.id,
                PreferencesUpdate {
                    theme: Some(Theme::Light),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let user = service
            .update_preferences(
                user.id,
                PreferencesUpdate {
                    default_category: Some(Category::Business),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(user.preferences.theme, Theme::Light);
        assert_eq!(user.preferences.default_category, Category::Business);
    }

    #[tokio::test]
    async fn test_profile_picture_replaces_old_file() {
        let store = Arc::new(RecordingStore::default());
        let (_db, service) = setup(store.clone()).await;
        let user = service.create("alice").await.unwrap();

        let first = service.upload_profile_picture(user.id, png()).await.unwrap();
        let first_id = first.profile_picture_file_id.clone().unwrap();

        let second = service.upload_profile_picture(user.id, png()).await.unwrap();
        assert!(second.profile_picture.unwrap().starts_with("https://cdn.test/profile_"));
        assert_eq!(store.deletes.lock().unwrap().as_slice(), &[first_id]);
        assert_eq!(store.uploads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_profile_picture_survives_delete_failure() {
        let store = Arc::new(RecordingStore {
            fail_delete: true,
            ..Default::default()
        });
        let (_db, service) = setup(store.clone()).await;
        let user = service.create("alice").await.unwrap();

        service.upload_profile_picture(user.id, png()).await.unwrap();
        let user = service.delete_profile_picture(user.id).await.unwrap();

        assert!(user.profile_picture.is_none());
        assert!(user.profile_picture_file_id.is_none());
        assert_eq!(store.deletes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_picture_size_limit() {
        let store = Arc::new(RecordingStore::default());
        let (_db, service) = setup(store.clone()).await;
        let user = service.create("alice").await.unwrap();

        let big = ImageUpload::new(vec![0u8; MAX_PROFILE_PICTURE_BYTES + 1], "image/png");
        let result = service.upload_profile_picture(user.id, big).await;
        assert!(matches!(result, Err(Error::ValidationFailed(_))));
        assert!(store.uploads.lock().unwrap().is_empty());

        let empty = ImageUpload::new(Vec::new(), "image/png");
        assert!(service.upload_profile_picture(user.id, empty).await.is_err());
    }
}

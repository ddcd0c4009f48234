//! Post lifecycle: create (caption + upload), list, edit, delete, stats

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::post::{BulkUpdate, Category, Post, PostUpdate};
use super::query::{Pagination, PostPage, PostQuery};
use super::repository::PostRepository;
use super::stats::UserPostStats;
use crate::ai::{CaptionGenerator, CaptionOptions};
use crate::caption::{Language, Vibe};
use crate::domain::user::{User, UserRepository};
use crate::error::{Error, Result};
use crate::media::{ImageStore, ImageUpload, MAX_POST_IMAGE_BYTES};

/// Maximum characters of user context accepted with an upload
pub const EXTRA_PROMPT_INPUT_MAX_CHARS: usize = 500;

/// Shortest caption accepted from the model
const MIN_CAPTION_CHARS: usize = 5;

const FILE_NAME_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const FILE_NAME_SUFFIX_LEN: usize = 9;

/// Input for a new post
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub image: Option<ImageUpload>,
    /// Raw vibe name as entered; validated against the known vibes
    pub vibe: Option<String>,
    /// Language code; unknown codes fall back to English
    pub language: Option<String>,
    pub extra_prompt: Option<String>,
    pub category: Category,
    pub tags: Vec<String>,
    pub is_public: bool,
}

/// A public post together with its author's name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPost {
    pub post: Post,
    pub author: String,
}

/// Orchestrates posts across the database, caption model and image store
#[derive(Clone)]
pub struct PostService {
    posts: PostRepository,
    users: UserRepository,
    captions: Arc<dyn CaptionGenerator>,
    images: Arc<dyn ImageStore>,
}

impl PostService {
    pub fn new(
        posts: PostRepository,
        users: UserRepository,
        captions: Arc<dyn CaptionGenerator>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            posts,
            users,
            captions,
            images,
        }
    }

    pub fn repository(&self) -> &PostRepository {
        &self.posts
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    async fn require_owned(&self, user_id: Uuid, post_id: Uuid) -> Result<Post> {
        let post = self
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| Error::PostNotFound(post_id.to_string()))?;

        if !post.is_owned_by(user_id) {
            return Err(Error::Forbidden(format!(
                "post {} belongs to another user",
                post_id
            )));
        }
        Ok(post)
    }

    /// Caption and upload the image concurrently, then persist the post
    ///
    /// Nothing is stored if either the caption or the upload fails.
    pub async fn create_post(&self, user_id: Uuid, new_post: NewPost) -> Result<Post> {
        let (image, vibe) = validate_new_post(&new_post)?;
        self.require_user(user_id).await?;

        let opts = CaptionOptions {
            vibe: vibe.unwrap_or_default(),
            language: new_post
                .language
                .as_deref()
                .map(Language::parse_or_default)
                .unwrap_or_default(),
            extra_prompt: new_post
                .extra_prompt
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };
        let file_name = unique_file_name();

        debug!(%user_id, file_name = %file_name, vibe = %opts.vibe, "Creating post");

        let (caption, stored) = tokio::try_join!(
            self.captions.generate_caption(image, &opts),
            self.images.upload(&image.bytes, &file_name),
        )?;

        let caption = caption.trim().to_string();
        if caption.chars().count() < MIN_CAPTION_CHARS {
            if let Err(e) = self.images.delete(&stored.file_id).await {
                warn!(file_id = %stored.file_id, error = %e, "Failed to remove orphaned upload");
            }
            return Err(Error::CaptionFailed(
                "Failed to generate valid caption".to_string(),
            ));
        }

        let mut post = Post::new(user_id, stored.url, stored.file_id, caption);
        post.category = new_post.category;
        post.tags = new_post.tags;
        post.vibe_style = vibe;
        post.is_public = new_post.is_public;

        self.posts.save(&post).await?;
        self.users.adjust_post_count(user_id, 1).await?;

        info!(post_id = %post.id, %user_id, "Post created");
        Ok(post)
    }

    /// One page of the user's feed
    pub async fn list_posts(&self, user_id: Uuid, query: PostQuery) -> Result<PostPage> {
        let query = query.normalized();
        let (posts, total) = self.posts.query(user_id, &query).await?;

        Ok(PostPage {
            posts,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    /// Edit one of the user's posts
    pub async fn update_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        update: PostUpdate,
    ) -> Result<Post> {
        let mut post = self.require_owned(user_id, post_id).await?;
        update.apply_to(&mut post);
        self.posts.update(&post).await?;
        Ok(post)
    }

    /// Apply one edit to many posts; ids not owned by the user are skipped
    pub async fn bulk_update(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
        updates: BulkUpdate,
    ) -> Result<u64> {
        if post_ids.is_empty() {
            return Err(Error::InvalidInput("Post IDs are required".to_string()));
        }

        let modified = self.posts.bulk_update(user_id, post_ids, &updates).await?;
        info!(%user_id, requested = post_ids.len(), modified, "Bulk updated posts");
        Ok(modified)
    }

    /// Delete one post; a failed image removal is logged and ignored
    pub async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let post = self.require_owned(user_id, post_id).await?;

        if let Err(e) = self.images.delete(&post.image_file_id).await {
            warn!(file_id = %post.image_file_id, error = %e, "Image deletion failed (continuing)");
        }

        self.posts.delete(post_id).await?;
        self.users.adjust_post_count(user_id, -1).await?;

        info!(%post_id, %user_id, "Post deleted");
        Ok(())
    }

    /// Delete every post of the user; returns how many were removed
    pub async fn delete_all_posts(&self, user_id: Uuid) -> Result<u64> {
        let posts = self.posts.list_for_user(user_id).await?;
        if posts.is_empty() {
            return Ok(0);
        }

        let deletions = posts
            .iter()
            .filter(|p| !p.image_file_id.is_empty())
            .map(|p| async move {
                if let Err(e) = self.images.delete(&p.image_file_id).await {
                    warn!(file_id = %p.image_file_id, error = %e, "Failed to delete image");
                }
            });
        join_all(deletions).await;

        let deleted = self.posts.delete_all_for_user(user_id).await?;
        self.users.reset_post_count(user_id).await?;

        info!(%user_id, deleted, "All posts deleted");
        Ok(deleted)
    }

    /// Category, style and monthly breakdowns for the user
    pub async fn user_stats(&self, user_id: Uuid) -> Result<UserPostStats> {
        let user = self.require_user(user_id).await?;
        let posts = self.posts.list_for_user(user_id).await?;
        Ok(UserPostStats::compute(user.stats, user.preferences, &posts))
    }

    /// Look up a post for a share page; private posts are reported as missing
    pub async fn shared_post(&self, post_id: Uuid) -> Result<SharedPost> {
        let post = self
            .posts
            .get_public(post_id)
            .await?
            .ok_or_else(|| Error::PostNotFound(post_id.to_string()))?;
        let author = self.require_user(post.user_id).await?.username;
        Ok(SharedPost { post, author })
    }
}

/// Check the upload, vibe and extra prompt, collecting every problem
fn validate_new_post(new_post: &NewPost) -> Result<(&ImageUpload, Option<Vibe>)> {
    let mut errors = Vec::new();

    match &new_post.image {
        Some(image) if !image.is_empty() => errors.extend(image.validate(MAX_POST_IMAGE_BYTES)),
        _ => errors.push("Image file is required".to_string()),
    }

    let vibe = match new_post.vibe.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = Vibe::parse(raw);
            if parsed.is_none() {
                errors.push("Invalid vibe selection".to_string());
            }
            parsed
        }
    };

    if let Some(extra) = &new_post.extra_prompt
        && extra.chars().count() > EXTRA_PROMPT_INPUT_MAX_CHARS
    {
        errors.push(format!(
            "Additional prompt must be less than {} characters",
            EXTRA_PROMPT_INPUT_MAX_CHARS
        ));
    }

    match (&new_post.image, errors.is_empty()) {
        (Some(image), true) => Ok((image, vibe)),
        _ => Err(Error::ValidationFailed(errors)),
    }
}

/// `{unix millis}-{9 random base36 chars}`
fn unique_file_name() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..FILE_NAME_SUFFIX_LEN)
        .map(|_| FILE_NAME_ALPHABET[rng.gen_range(0..FILE_NAME_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::test_fixtures::PNG_BYTES;

    fn new_post() -> NewPost {
        NewPost {
            image: Some(ImageUpload::from_bytes(PNG_BYTES.to_vec())),
            ..Default::default()
        }
    }

    #[test]
    fn test_unique_file_name_shape() {
        let name = unique_file_name();
        let (millis, suffix) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), FILE_NAME_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| FILE_NAME_ALPHABET.contains(&b)));
        assert_ne!(unique_file_name(), unique_file_name());
    }

    #[test]
    fn test_validate_accepts_minimal_input() {
        let input = new_post();
        let (_, vibe) = validate_new_post(&input).unwrap();
        assert_eq!(vibe, None);
    }

    #[test]
    fn test_validate_parses_vibe() {
        let input = NewPost {
            vibe: Some("Dramatic".to_string()),
            ..new_post()
        };
        let (_, vibe) = validate_new_post(&input).unwrap();
        assert_eq!(vibe, Some(Vibe::Dramatic));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let input = NewPost {
            image: None,
            vibe: Some("Sarcastic".to_string()),
            extra_prompt: Some("x".repeat(501)),
            ..Default::default()
        };
        match validate_new_post(&input) {
            Err(Error::ValidationFailed(errors)) => {
                assert_eq!(
                    errors,
                    vec![
                        "Image file is required".to_string(),
                        "Invalid vibe selection".to_string(),
                        "Additional prompt must be less than 500 characters".to_string(),
                    ]
                );
            }
            other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_validate_rejects_bad_image() {
        let input = NewPost {
            image: Some(ImageUpload::new(vec![0u8; 10], "image/gif")),
            ..Default::default()
        };
        assert!(matches!(
            validate_new_post(&input),
            Err(Error::ValidationFailed(_))
        ));
    }
}

//! Post entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::caption::Vibe;

/// Post category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    Personal,
    Business,
    Creative,
    Social,
    Marketing,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Personal,
        Self::Business,
        Self::Creative,
        Self::Social,
        Self::Marketing,
        Self::Other,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Business => "Business",
            Self::Creative => "Creative",
            Self::Social => "Social",
            Self::Marketing => "Marketing",
            Self::Other => "Other",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image post with its generated caption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    pub image_file_id: String,
    pub caption: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub vibe_style: Option<Vibe>,
    pub is_public: bool,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        user_id: Uuid,
        image_url: impl Into<String>,
        image_file_id: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            image_url: image_url.into(),
            image_file_id: image_file_id.into(),
            caption: caption.into(),
            category: Category::default(),
            tags: Vec::new(),
            vibe_style: None,
            is_public: false,
            likes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Single-post edit; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpdate {
    pub caption: Option<String>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl PostUpdate {
    pub fn apply_to(self, post: &mut Post) {
        if let Some(caption) = self.caption {
            post.caption = caption;
        }
        if let Some(category) = self.category {
            post.category = category;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(is_public) = self.is_public {
            post.is_public = is_public;
        }
        post.updated_at = Utc::now();
    }
}

/// Edit applied to many posts at once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkUpdate {
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl BulkUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.tags.is_none() && self.is_public.is_none()
    }
}

/// Split a comma-separated tag list, trimming each entry and dropping blanks
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("marketing"), Some(Category::Marketing));
        assert_eq!(Category::parse(" Other "), Some(Category::Other));
        assert_eq!(Category::parse("all"), None);
        assert_eq!(Category::default(), Category::Personal);
    }

    #[test]
    fn test_new_post_defaults() {
        let user = Uuid::new_v4();
        let post = Post::new(user, "https://cdn/x.jpg", "f1", "A caption #a #b #c");
        assert_eq!(post.category, Category::Personal);
        assert!(!post.is_public);
        assert_eq!(post.likes, 0);
        assert!(post.is_owned_by(user));
        assert!(!post.is_owned_by(Uuid::new_v4()));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" beach, sunset ,,travel "), vec!["beach", "sunset", "travel"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_post_update_apply() {
        let mut post = Post::new(Uuid::new_v4(), "u", "f", "old");
        let before = post.updated_at;
        PostUpdate {
            caption: Some("new".to_string()),
            is_public: Some(true),
            ..Default::default()
        }
        .apply_to(&mut post);

        assert_eq!(post.caption, "new");
        assert!(post.is_public);
        assert_eq!(post.category, Category::Personal);
        assert!(post.updated_at >= before);
    }

    #[test]
    fn test_post_serializes_camel_case() {
        let post = Post::new(Uuid::new_v4(), "u", "f", "c");
        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("isPublic").is_some());
        assert_eq!(json["category"], "Personal");
    }
}

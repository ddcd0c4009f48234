//! User entity, preferences and stats

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::caption::Vibe;
use crate::domain::post::Category;

/// Username length bounds (inclusive)
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;

/// UI theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub favorite_styles: Vec<Vibe>,
    pub default_category: Category,
}

/// Partial preference change; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub favorite_styles: Option<Vec<Vibe>>,
    pub default_category: Option<Category>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none() && self.favorite_styles.is_none() && self.default_category.is_none()
    }

    pub fn apply_to(self, prefs: &mut Preferences) {
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
        if let Some(styles) = self.favorite_styles {
            prefs.favorite_styles = styles;
        }
        if let Some(category) = self.default_category {
            prefs.default_category = category;
        }
    }
}

/// Profile change; preferences are replaced wholesale when present
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_posts: i64,
    pub total_likes: i64,
    pub joined_at: DateTime<Utc>,
}

/// An account owning posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub profile_picture: Option<String>,
    pub profile_picture_file_id: Option<String>,
    pub preferences: Preferences,
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with default preferences
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            profile_picture: None,
            profile_picture_file_id: None,
            preferences: Preferences::default(),
            stats: UserStats {
                total_posts: 0,
                total_likes: 0,
                joined_at: now,
            },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Collect every problem with a proposed username
pub fn validate_username(username: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = username.chars().count();

    if username.is_empty() {
        errors.push("Username is required".to_string());
    } else if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        errors.push(format!(
            "Username must be {}-{} characters long",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        ));
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push("Username can only contain letters, numbers, and underscores".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("alice");
        assert_eq!(user.preferences.theme, Theme::System);
        assert_eq!(user.preferences.default_category, Category::Personal);
        assert!(user.preferences.favorite_styles.is_empty());
        assert_eq!(user.stats.total_posts, 0);
        assert!(user.profile_picture.is_none());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_01").is_empty());
        assert_eq!(validate_username(""), vec!["Username is required"]);
        assert_eq!(
            validate_username("ab"),
            vec!["Username must be 3-20 characters long"]
        );
        assert_eq!(validate_username(&"a".repeat(21)).len(), 1);
        assert_eq!(
            validate_username("bad name"),
            vec!["Username can only contain letters, numbers, and underscores"]
        );
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("Dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("sepia"), None);
    }

    #[test]
    fn test_preferences_update_merges() {
        let mut prefs = Preferences::default();
        PreferencesUpdate {
            theme: Some(Theme::Light),
            favorite_styles: Some(vec![Vibe::Minimal]),
            default_category: None,
        }
        .apply_to(&mut prefs);

        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.favorite_styles, vec![Vibe::Minimal]);
        assert_eq!(prefs.default_category, Category::Personal);
        assert!(PreferencesUpdate::default().is_empty());
    }

    #[test]
    fn test_preferences_serialize_camel_case() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["theme"], "system");
        assert_eq!(json["defaultCategory"], "Personal");
        assert!(json["favoriteStyles"].as_array().unwrap().is_empty());
    }
}

//! Error types for Vibecap

use thiserror::Error;

/// Result type alias using Vibecap's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Vibecap error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Post '{0}' not found. Run `vibecap post list` to see your posts.")]
    PostNotFound(String),

    #[error("User '{0}' not found. Create one with `vibecap user create <username>`.")]
    UserNotFound(String),

    #[error("User '{0}' already exists")]
    UserExists(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Caption generation failed: {0}. Check your key with `vibecap config get ai.api_key`.")]
    CaptionFailed(String),

    #[error("Image storage error: {0}")]
    ImageStoreFailed(String),

    #[error("Missing API key: set the {0} environment variable")]
    ApiKeyMissing(&'static str),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Parse error: {0}")]
    Parse(String),

    // Session errors (E1000-E1099)
    #[error("Session settings storage failed: {0}")]
    SettingsStorage(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::PostNotFound(_) => "E001",
            Self::UserNotFound(_) => "E002",
            Self::UserExists(_) => "E003",
            Self::Forbidden(_) => "E004",
            Self::NetworkError(_) => "E100",
            Self::CaptionFailed(_) => "E101",
            Self::ImageStoreFailed(_) => "E102",
            Self::ApiKeyMissing(_) => "E103",
            Self::DatabaseError(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::ValidationFailed(_) => "E801",
            Self::Parse(_) => "E802",
            Self::SettingsStorage(_) => "E1000",
            Self::Other(_) | Self::Json(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::PostNotFound(_) => Some("vibecap post list".to_string()),
            Self::UserNotFound(_) => Some("vibecap user create <username>".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::CaptionFailed(_) => Some("vibecap config get ai.api_key".to_string()),
            Self::ApiKeyMissing(var) => Some(format!("export {}=...", var)),
            _ => None,
        }
    }

    /// HTTP-style status this error maps to at an API boundary
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PostNotFound(_) | Self::UserNotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::UserExists(_) => 409,
            Self::InvalidInput(_) | Self::ValidationFailed(_) => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_not_found_error() {
        let error = Error::PostNotFound("abc".to_string());
        assert_eq!(error.code(), "E001");
        assert_eq!(error.suggestion(), Some("vibecap post list".to_string()));
        assert_eq!(error.status_code(), 404);
        assert!(error.to_string().contains("abc"));
    }

    #[test]
    fn test_forbidden_error() {
        let error = Error::Forbidden("not your post".to_string());
        assert_eq!(error.code(), "E004");
        assert_eq!(error.status_code(), 403);
        assert_eq!(error.suggestion(), None);
    }

    #[test]
    fn test_validation_failed_joins_messages() {
        let error = Error::ValidationFailed(vec![
            "Image file is required".to_string(),
            "Invalid vibe selection".to_string(),
        ]);
        assert_eq!(error.code(), "E801");
        assert_eq!(error.status_code(), 400);
        assert_eq!(
            error.to_string(),
            "Validation failed: Image file is required; Invalid vibe selection"
        );
    }

    #[test]
    fn test_api_key_missing_suggestion() {
        let error = Error::ApiKeyMissing("GEMINI_API_KEY");
        assert_eq!(error.code(), "E103");
        assert_eq!(
            error.suggestion(),
            Some("export GEMINI_API_KEY=...".to_string())
        );
    }

    #[test]
    fn test_io_error() {
        let error = Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert_eq!(error.code(), "E9999");
        assert_eq!(error.status_code(), 500);
    }
}

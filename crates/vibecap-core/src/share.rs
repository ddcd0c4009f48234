//! Public share links for posts

use reqwest::Url;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::error::{Error, Result};

/// Supported social networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Twitter,
    Facebook,
    Linkedin,
    Whatsapp,
    Telegram,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 5] = [
        Self::Twitter,
        Self::Facebook,
        Self::Linkedin,
        Self::Whatsapp,
        Self::Telegram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::Linkedin => "linkedin",
            Self::Whatsapp => "whatsapp",
            Self::Telegram => "telegram",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Intent URL sharing `link` with `caption` as the message text
    pub fn intent_url(&self, caption: &str, link: &str) -> Result<Url> {
        let (endpoint, params): (&str, Vec<(&str, String)>) = match self {
            Self::Twitter => (
                "https://twitter.com/intent/tweet",
                vec![("text", caption.to_string()), ("url", link.to_string())],
            ),
            Self::Facebook => (
                "https://facebook.com/sharer/sharer.php",
                vec![("u", link.to_string())],
            ),
            Self::Linkedin => (
                "https://linkedin.com/sharing/share-offsite/",
                vec![("url", link.to_string())],
            ),
            Self::Whatsapp => (
                "https://api.whatsapp.com/send",
                vec![("text", format!("{} {}", caption, link))],
            ),
            Self::Telegram => (
                "https://t.me/share/url",
                vec![("url", link.to_string()), ("text", caption.to_string())],
            ),
        };

        Url::parse_with_params(endpoint, &params)
            .map_err(|e| Error::InvalidInput(format!("Invalid share URL: {}", e)))
    }
}

impl fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Public page for a post: `{base}/shared/{id}`
pub fn share_url(base_url: &str, post_id: Uuid) -> Result<Url> {
    let base = base_url.trim_end_matches('/');
    Url::parse(&format!("{}/shared/{}", base, post_id))
        .map_err(|e| Error::InvalidInput(format!("Invalid base URL '{}': {}", base_url, e)))
}

/// One intent link per platform
#[derive(Debug, Clone, Serialize)]
pub struct SocialLink {
    pub platform: SocialPlatform,
    pub url: String,
}

/// Share page plus every platform intent link for a post
pub fn social_links(base_url: &str, post: &Post) -> Result<Vec<SocialLink>> {
    let link = share_url(base_url, post.id)?;

    SocialPlatform::ALL
        .into_iter()
        .map(|platform| {
            Ok(SocialLink {
                platform,
                url: platform.intent_url(&post.caption, link.as_str())?.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_share_url() {
        let id = Uuid::nil();
        let url = share_url("https://vibecap.app/", id).unwrap();
        assert_eq!(
            url.as_str(),
            "https://vibecap.app/shared/00000000-0000-0000-0000-000000000000"
        );
        assert!(share_url("not a url", id).is_err());
    }

    #[test]
    fn test_twitter_encodes_caption() {
        let url = SocialPlatform::Twitter
            .intent_url("Sun & sea #beach", "https://vibecap.app/shared/1")
            .unwrap();
        assert!(url.as_str().starts_with("https://twitter.com/intent/tweet?"));
        assert!(!url.as_str().contains('#'));
        assert_eq!(query_value(&url, "text").as_deref(), Some("Sun & sea #beach"));
        assert_eq!(
            query_value(&url, "url").as_deref(),
            Some("https://vibecap.app/shared/1")
        );
    }

    #[test]
    fn test_whatsapp_joins_caption_and_link() {
        let url = SocialPlatform::Whatsapp
            .intent_url("Hello", "https://x.test/shared/1")
            .unwrap();
        assert_eq!(
            query_value(&url, "text").as_deref(),
            Some("Hello https://x.test/shared/1")
        );
    }

    #[test]
    fn test_social_links_cover_all_platforms() {
        let post = Post::new(Uuid::new_v4(), "u", "f", "Golden hour #sunset #sky #glow");
        let links = social_links("https://vibecap.app", &post).unwrap();
        assert_eq!(links.len(), 5);
        assert!(links[1].url.starts_with("https://facebook.com/sharer/sharer.php?u="));
        assert!(links.iter().all(|l| l.url.contains(&post.id.to_string())));
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(SocialPlatform::parse("LinkedIn"), Some(SocialPlatform::Linkedin));
        assert_eq!(SocialPlatform::parse("myspace"), None);
    }
}

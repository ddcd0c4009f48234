//! Per-user post statistics

use std::collections::BTreeMap;

use serde::Serialize;

use super::post::Post;
use crate::domain::user::{Preferences, UserStats};

/// Breakdown of a user's posts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPostStats {
    pub user_stats: UserStats,
    pub preferences: Preferences,
    pub category_breakdown: BTreeMap<String, u64>,
    pub style_breakdown: BTreeMap<String, u64>,
    /// Keyed by `YYYY-MM`
    pub monthly_activity: BTreeMap<String, u64>,
    pub total_categories: usize,
    pub total_styles: usize,
    /// Rounded to one decimal
    pub avg_posts_per_month: f64,
}

impl UserPostStats {
    pub fn compute(user_stats: UserStats, preferences: Preferences, posts: &[Post]) -> Self {
        let mut category_breakdown = BTreeMap::new();
        let mut style_breakdown = BTreeMap::new();
        let mut monthly_activity = BTreeMap::new();

        for post in posts {
            *category_breakdown
                .entry(post.category.as_str().to_string())
                .or_insert(0) += 1;
            if let Some(vibe) = post.vibe_style {
                *style_breakdown.entry(vibe.as_str().to_string()).or_insert(0) += 1;
            }
            *monthly_activity
                .entry(post.created_at.format("%Y-%m").to_string())
                .or_insert(0) += 1;
        }

        let avg_posts_per_month = if posts.is_empty() {
            0.0
        } else {
            let months = monthly_activity.len().max(1) as f64;
            (posts.len() as f64 / months * 10.0).round() / 10.0
        };

        Self {
            user_stats,
            preferences,
            total_categories: category_breakdown.len(),
            total_styles: style_breakdown.len(),
            category_breakdown,
            style_breakdown,
            monthly_activity,
            avg_posts_per_month,
        }
    }
}

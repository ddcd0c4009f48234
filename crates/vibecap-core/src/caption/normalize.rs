//! Caption post-processing
//!
//! Turns raw model output into a publishable caption: a body followed by
//! 3 or 4 unique hashtags, within the vibe's character limit.

use std::collections::HashSet;

use super::style::Vibe;

/// Longest hashtag kept, `#` included
pub const MAX_HASHTAG_LEN: usize = 20;

/// Padding used, in order, when the body yields too few hashtags
pub const FALLBACK_HASHTAGS: [&str; 4] = ["#photo", "#photooftheday", "#snapshot", "#moments"];

const MIN_HASHTAGS: usize = 3;
const MAX_HASHTAGS: usize = 4;

/// Characters kept free for hashtags when the body is first shortened
const HASHTAG_RESERVE: usize = 10;

/// A word boundary must lie past this index to be used as the cut point
const MIN_BOUNDARY: usize = 30;

const STOPWORDS: [&str; 24] = [
    "the", "and", "for", "with", "this", "that", "over", "under", "into", "from", "your", "been",
    "are", "was", "were", "a", "an", "on", "of", "in", "to", "it", "its", "is",
];

/// Normalize raw model text into a caption for the given vibe
///
/// Total: every input, including the empty string, yields a caption with
/// 3 or 4 case-insensitively unique hashtags matching `#[A-Za-z0-9_]{1,19}`.
pub fn normalize(raw: &str, vibe: Vibe) -> String {
    let caption = strip_quotes(raw.trim());

    let tokens: Vec<&str> = caption.split_whitespace().collect();
    let (body, candidates): (String, Vec<&str>) =
        match tokens.iter().position(|t| t.starts_with('#')) {
            Some(idx) => (
                tokens[..idx].join(" "),
                tokens[idx..].iter().copied().filter(|t| is_hashtag(t)).collect(),
            ),
            None => (caption.trim().to_string(), Vec::new()),
        };

    let mut hashtags = dedupe(&candidates);
    hashtags.truncate(MAX_HASHTAGS);

    if hashtags.len() < MIN_HASHTAGS {
        let needed = MIN_HASHTAGS - hashtags.len();
        let extra = pick_additional_hashtags(&body, &hashtags, needed);
        hashtags.extend(extra);
    }

    while hashtags.len() < MIN_HASHTAGS {
        let fallback = FALLBACK_HASHTAGS
            .iter()
            .find(|f| !contains_tag(&hashtags, f))
            .copied()
            .unwrap_or(FALLBACK_HASHTAGS[0]);
        hashtags.push(fallback.to_string());
    }

    if hashtags.len() == MIN_HASHTAGS
        && let Some(extra) = pick_additional_hashtags(&body, &hashtags, 1).into_iter().next()
    {
        hashtags.push(extra);
    }
    hashtags.truncate(MAX_HASHTAGS);

    let limit = vibe.char_limit();
    let mut body = body;
    let reserve_limit = limit - HASHTAG_RESERVE;
    if char_len(&body) > reserve_limit {
        body = truncate_body(&body, reserve_limit);
    }

    // Stray '#' left in the body would read as broken hashtags
    let body = body.replace('#', "");
    let mut body = body.split_whitespace().collect::<Vec<_>>().join(" ");

    let tag_block = hashtags.join(" ");
    let budget = limit.saturating_sub(char_len(&tag_block) + 1);
    if char_len(&body) > budget {
        body = truncate_body(&body, budget.saturating_sub(1));
    }

    if body.is_empty() {
        tag_block
    } else {
        format!("{} {}", body, tag_block).trim().to_string()
    }
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '\'' | '"' | '`'))
}

fn is_hashtag(token: &str) -> bool {
    token.strip_prefix('#').is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

fn contains_tag(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn dedupe(candidates: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|tag| seen.insert(tag.to_lowercase()) && tag.len() <= MAX_HASHTAG_LEN)
        .map(|tag| tag.to_string())
        .collect()
}

/// Derive hashtags from body words that are not stopwords or already used
fn pick_additional_hashtags(body: &str, existing: &[String], needed: usize) -> Vec<String> {
    let cleaned: String = body
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|w| w.len() >= 3 && w.len() < MAX_HASHTAG_LEN && !STOPWORDS.contains(w))
        .filter(|w| seen.insert(*w))
        .map(|w| format!("#{}", w))
        .filter(|tag| !contains_tag(existing, tag))
        .take(needed)
        .collect()
}

/// Cut the body to at most `max` characters, preferring a word boundary,
/// and close it with a period unless it already ends a sentence
fn truncate_body(body: &str, max: usize) -> String {
    let chars: Vec<char> = body.chars().collect();
    if chars.len() <= max {
        return body.to_string();
    }

    let boundary = chars[..=max].iter().rposition(|c| *c == ' ');
    let cut = match boundary {
        Some(idx) if idx > MIN_BOUNDARY => idx,
        _ => max,
    };

    let mut truncated: String = chars[..cut].iter().collect();
    truncated.truncate(truncated.trim_end().len());

    if !truncated.is_empty() && !truncated.ends_with(['.', '!', '?']) {
        truncated.push('.');
    }
    truncated
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

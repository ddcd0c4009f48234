//! Feed listing: filters, sorting and pagination

use serde::Serialize;
use std::fmt;

use super::post::{Category, Post};

/// Default page size
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sortable post column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Caption,
    Category,
    Likes,
}

impl SortField {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Caption => "caption",
            Self::Category => "category",
            Self::Likes => "likes",
        }
    }

    /// Accepts both `createdAt` and `created_at` spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "").as_str() {
            "createdat" => Some(Self::CreatedAt),
            "updatedat" => Some(Self::UpdatedAt),
            "caption" => Some(Self::Caption),
            "category" => Some(Self::Category),
            "likes" => Some(Self::Likes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword().to_lowercase())
    }
}

/// Filters and paging for a user's feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    /// Case-insensitive substring of caption or tags
    pub search: Option<String>,
    pub category: Option<Category>,
    /// Matches posts carrying any of these tags
    pub tags: Vec<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
    /// 1-based
    pub page: u32,
    pub limit: u32,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            tags: Vec::new(),
            sort_by: SortField::default(),
            order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PostQuery {
    /// Category filter from user input; "all" (or blank) means no filter
    pub fn parse_category(s: &str) -> Option<Category> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            None
        } else {
            Category::parse(s)
        }
    }

    /// Clamp page to >= 1 and limit to 1..=MAX_PAGE_SIZE
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub(crate) fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_posts: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        Self {
            current_page: page,
            total_pages: total.div_ceil(limit as u64) as u32,
            total_posts: total,
            has_next: (page as u64) * (limit as u64) < total,
            has_prev: page > 1,
        }
    }
}

/// One page of posts
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

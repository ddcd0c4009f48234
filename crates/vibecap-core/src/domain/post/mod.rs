//! Post domain module
//!
//! # Architecture
//!
//! - **Entity**: `Post`, `Category`
//! - **Query**: `PostQuery` filters/sorting and the paged `PostPage` result
//! - **Repository**: `PostRepository` for database operations
//! - **Service**: `PostService` for the create/list/edit/delete workflow
//!
//! # Example
//!
//! ```ignore
//! use vibecap_core::domain::post::{NewPost, PostQuery, PostService};
//!
//! let post = service.create_post(user.id, NewPost {
//!     image: Some(ImageUpload::from_path("beach.jpg").await?),
//!     vibe: Some("Adventurous".into()),
//!     ..Default::default()
//! }).await?;
//!
//! let page = service.list_posts(user.id, PostQuery::default()).await?;
//! ```

pub mod post;
pub mod query;
pub mod repository;
pub mod service;
pub mod stats;

pub use post::{BulkUpdate, Category, Post, PostUpdate, parse_tags};
pub use query::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Pagination, PostPage, PostQuery, SortField, SortOrder,
};
pub use repository::PostRepository;
pub use service::{EXTRA_PROMPT_INPUT_MAX_CHARS, NewPost, PostService, SharedPost};
pub use stats::UserPostStats;

//! Vibecap Core Library
//!
//! This crate provides the core functionality for Vibecap, including:
//! - Caption normalization and style prompts
//! - Gemini caption generation
//! - ImageKit image storage
//! - Users and posts (SQLite)
//! - Share links
//! - Client-side session timer and token expiry watcher

pub mod ai;
pub mod caption;
pub mod config;
pub mod domain;
pub mod error;
pub mod media;
pub mod session;
pub mod share;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::caption::{Language, Vibe, normalize};
    pub use crate::config::Config;
    pub use crate::domain::post::{Category, Post, PostService};
    pub use crate::domain::user::{User, UserService};
    pub use crate::error::{Error, Result};
    pub use crate::session::SessionTimer;
}

//! User domain module
//!
//! - **Entity**: `User` with `Preferences` and `UserStats`
//! - **Repository**: `UserRepository` for database operations
//! - **Service**: `UserService` for profile and profile-picture management

pub mod repository;
pub mod service;
pub mod user;

pub use repository::UserRepository;
pub use service::UserService;
pub use user::{
    Preferences, PreferencesUpdate, ProfileUpdate, Theme, USERNAME_MAX_LEN, USERNAME_MIN_LEN,
    User, UserStats, validate_username,
};

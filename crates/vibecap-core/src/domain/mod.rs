//! Domain layer
//!
//! Contains the post and user models and the services operating on them.

pub mod post;
pub mod user;

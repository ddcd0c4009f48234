//! Caption styles, prompting and post-processing
//!
//! This module provides:
//! - `Vibe` and `Language` selections that steer caption wording
//! - The system instruction sent to the generative model
//! - `normalize`, the deterministic clean-up applied to every raw model reply

mod normalize;
mod style;

pub use normalize::{FALLBACK_HASHTAGS, MAX_HASHTAG_LEN, normalize};
pub use style::{
    EXTRA_PROMPT_MAX_CHARS, Language, Vibe, build_system_instruction, sanitize_extra_prompt,
};

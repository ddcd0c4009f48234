//! Caption vibes, languages and the model system instruction

use serde::{Deserialize, Serialize};

/// Maximum characters of user-provided context forwarded to the model
pub const EXTRA_PROMPT_MAX_CHARS: usize = 180;

/// Tone tag steering caption wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Vibe {
    /// Playful, upbeat
    #[default]
    Fun,
    /// Concise, neutral
    Professional,
    /// Cinematic, high-impact
    Dramatic,
    /// Ultra concise, tighter length budget
    Minimal,
    /// Energetic, outdoorsy
    Adventurous,
    /// Warm, positive
    Wholesome,
}

impl Vibe {
    /// Every selectable vibe, in display order
    pub const ALL: [Vibe; 6] = [
        Self::Fun,
        Self::Professional,
        Self::Dramatic,
        Self::Minimal,
        Self::Adventurous,
        Self::Wholesome,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fun => "Fun",
            Self::Professional => "Professional",
            Self::Dramatic => "Dramatic",
            Self::Minimal => "Minimal",
            Self::Adventurous => "Adventurous",
            Self::Wholesome => "Wholesome",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|vibe| vibe.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Parse from string, falling back to `Fun` for anything unknown
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Style guidance given to the model for this vibe
    pub fn descriptor(&self) -> &'static str {
        match self {
            Self::Fun => "Playful, upbeat, light tone. Include 1–2 fitting emojis.",
            Self::Professional => {
                "Concise, neutral, authoritative tone. Avoid slang. 0–1 tasteful emoji allowed."
            }
            Self::Dramatic => {
                "Cinematic, evocative, high-impact tone. 1–2 powerful emojis if fitting."
            }
            Self::Minimal => {
                "Ultra concise (max 8 words) and clean. Prefer NO emojis unless essential."
            }
            Self::Adventurous => {
                "Energetic, explorative, outdoorsy tone with subtle excitement. 1–2 emojis."
            }
            Self::Wholesome => "Warm, positive, heartwarming tone. 1–2 gentle emojis.",
        }
    }

    /// Maximum caption length in characters, hashtags included
    pub fn char_limit(&self) -> usize {
        match self {
            Self::Minimal => 100,
            _ => 140,
        }
    }
}

impl std::fmt::Display for Vibe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output language for generated captions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
    Ru,
    Ja,
    Ko,
    Zh,
    Ar,
    Hi,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Self::En,
        Self::Es,
        Self::Fr,
        Self::De,
        Self::It,
        Self::Pt,
        Self::Ru,
        Self::Ja,
        Self::Ko,
        Self::Zh,
        Self::Ar,
        Self::Hi,
    ];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::It => "it",
            Self::Pt => "pt",
            Self::Ru => "ru",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Zh => "zh",
            Self::Ar => "ar",
            Self::Hi => "hi",
        }
    }

    /// English name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Spanish",
            Self::Fr => "French",
            Self::De => "German",
            Self::It => "Italian",
            Self::Pt => "Portuguese",
            Self::Ru => "Russian",
            Self::Ja => "Japanese",
            Self::Ko => "Korean",
            Self::Zh => "Chinese",
            Self::Ar => "Arabic",
            Self::Hi => "Hindi",
        }
    }

    /// Language line of the system instruction
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::En => "Generate the caption in English.",
            Self::Es => "Generate the caption in Spanish (Español).",
            Self::Fr => "Generate the caption in French (Français).",
            Self::De => "Generate the caption in German (Deutsch).",
            Self::It => "Generate the caption in Italian (Italiano).",
            Self::Pt => "Generate the caption in Portuguese (Português).",
            Self::Ru => "Generate the caption in Russian (Русский).",
            Self::Ja => "Generate the caption in Japanese (日本語).",
            Self::Ko => "Generate the caption in Korean (한국어).",
            Self::Zh => "Generate the caption in Chinese (中文).",
            Self::Ar => {
                "Generate the caption in Arabic (العربية). Use appropriate RTL text formatting."
            }
            Self::Hi => "Generate the caption in Hindi (हिन्दी).",
        }
    }

    /// Parse from a language code (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(s.trim()))
    }

    /// Parse from a language code, falling back to English
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Build the system instruction sent alongside the image
pub fn build_system_instruction(vibe: Vibe, language: Language) -> String {
    format!(
        "You craft a SINGLE social-media-ready caption for an image.
Style Guidance: {style}
Language: {language}
Hard Rules:
  - Output ONLY the caption text (no preface, no quotes, no numbering).
  - Base caption body BEFORE hashtags must be relevant and natural language.
  - Append 3 to 4 highly relevant, diverse hashtags at the END separated by single spaces.
  - Hashtags: short (<=18 chars), no repetition, no generic spam (#photo, #insta, #love) unless truly necessary.
  - For non-English languages, hashtags can be in English or the target language as appropriate.
  - Max 140 characters overall (unless Minimal vibe: max 100 characters to accommodate required hashtags).
  - Never invent personal or private details (names, locations) unless explicitly provided in extra context.
  - Avoid repeating words unless for deliberate stylistic effect.
  - No offensive, unsafe, or disallowed content.
  - Respect cultural context and appropriateness for the target language.
Formatting:
  - No surrounding quotation marks.
  - No trailing spaces.
  - Emojis (if any) should feel organic, not forced.
  - Ensure hashtags come last with a space before the first hashtag.
  - For RTL languages like Arabic, maintain proper text direction.",
        style = vibe.descriptor(),
        language = language.instruction(),
    )
}

/// Collapse whitespace in user context and cap it at `EXTRA_PROMPT_MAX_CHARS`
pub fn sanitize_extra_prompt(extra: &str) -> String {
    let collapsed = extra.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > EXTRA_PROMPT_MAX_CHARS {
        let mut capped: String = collapsed.chars().take(EXTRA_PROMPT_MAX_CHARS).collect();
        capped.push('…');
        capped
    } else {
        collapsed
    }
}

//! Generation task types.
//!
//! K_i: The language universe is exactly {English, Korean}; the secondary
//! language of a direction is always the complement of the primary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two languages in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    English,
    Korean,
}

impl Language {
    /// Both languages, in enumeration order.
    pub const ALL: [Language; 2] = [Language::English, Language::Korean];

    /// The other language of the fixed two-language universe.
    pub fn complement(self) -> Self {
        match self {
            Self::English => Self::Korean,
            Self::Korean => Self::English,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Korean => "Korean",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "korean" | "ko" => Ok(Self::Korean),
            other => Err(format!("unknown language '{other}' (expected English or Korean)")),
        }
    }
}

/// Granularity at which the two languages are mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsLevel {
    Word,
    Phrase,
    Sentence,
}

impl CsLevel {
    /// All levels, in enumeration order.
    pub const ALL: [CsLevel; 3] = [CsLevel::Word, CsLevel::Phrase, CsLevel::Sentence];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Phrase => "phrase",
            Self::Sentence => "sentence",
        }
    }
}

impl fmt::Display for CsLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CsLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" => Ok(Self::Word),
            "phrase" => Ok(Self::Phrase),
            "sentence" => Ok(Self::Sentence),
            other => Err(format!(
                "unknown code-switch level '{other}' (expected word, phrase or sentence)"
            )),
        }
    }
}

/// Ordered language pair: primary first, code-switched-from second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageDirection {
    pub main: Language,
    pub secondary: Language,
}

impl LanguageDirection {
    /// Both directions, in enumeration order.
    pub const ALL: [LanguageDirection; 2] = [
        LanguageDirection {
            main: Language::English,
            secondary: Language::Korean,
        },
        LanguageDirection {
            main: Language::Korean,
            secondary: Language::English,
        },
    ];

    /// Direction with the given primary language.
    pub fn from_primary(main: Language) -> Self {
        Self {
            main,
            secondary: main.complement(),
        }
    }
}

impl fmt::Display for LanguageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.main, self.secondary)
    }
}

/// One unit of script generation work.
///
/// Built only by the parameter enumerator; fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationTask {
    topic: String,
    cs_level: CsLevel,
    direction: LanguageDirection,
    model: String,
}

impl GenerationTask {
    pub(crate) fn new(
        topic: impl Into<String>,
        cs_level: CsLevel,
        direction: LanguageDirection,
        model: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            cs_level,
            direction,
            model: model.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn cs_level(&self) -> CsLevel {
        self.cs_level
    }

    pub fn direction(&self) -> LanguageDirection {
        self.direction
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// One unit of dialogue generation work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DialogueTask {
    topic: String,
    pair: LanguageDirection,
    model: String,
}

impl DialogueTask {
    pub(crate) fn new(
        topic: impl Into<String>,
        pair: LanguageDirection,
        model: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            pair,
            model: model.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn pair(&self) -> LanguageDirection {
        self.pair
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// A complete instruction string plus the task it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt<T> {
    pub text: String,
    pub task: T,
}

/// Outcome of one remote call for a task.
#[derive(Debug, Clone)]
pub enum GenerationResult<T> {
    Generated { task: T, text: String },
    Failed { task: T, error: String },
}

impl<T> GenerationResult<T> {
    pub fn task(&self) -> &T {
        match self {
            Self::Generated { task, .. } | Self::Failed { task, .. } => task,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }

    /// Generated text, if the call succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Generated { text, .. } => Some(text),
            Self::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_is_involution() {
        for lang in Language::ALL {
            assert_ne!(lang.complement(), lang);
            assert_eq!(lang.complement().complement(), lang);
        }
    }

    #[test]
    fn test_direction_from_primary() {
        let d = LanguageDirection::from_primary(Language::Korean);
        assert_eq!(d.main, Language::Korean);
        assert_eq!(d.secondary, Language::English);
        assert_eq!(LanguageDirection::ALL[1], d);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert_eq!("Korean".parse::<Language>().unwrap(), Language::Korean);
        assert!("Japanese".parse::<Language>().is_err());
        assert_eq!("Phrase".parse::<CsLevel>().unwrap(), CsLevel::Phrase);
        assert!("paragraph".parse::<CsLevel>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&CsLevel::Word).unwrap(), r#""word""#);
        assert_eq!(
            serde_json::to_string(&Language::Korean).unwrap(),
            r#""Korean""#
        );
        let pair = serde_json::to_value(LanguageDirection::ALL[0]).unwrap();
        assert_eq!(pair["main"], "English");
        assert_eq!(pair["secondary"], "Korean");
    }
}

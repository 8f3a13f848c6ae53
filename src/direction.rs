//! Translation direction and the Hangul-ratio language detector.
//!
//! A name is treated as Korean when more than 20% of its characters fall in
//! the Hangul syllable block (U+AC00..=U+D7A3). Everything else is English.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Share of Hangul syllables above which a name counts as Korean
pub const KOREAN_RATIO_THRESHOLD: f64 = 0.2;

/// Source language of a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Korean,
    English,
}

/// Which notation is being decided for a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Korean name, English notation
    #[serde(rename = "KO-EN")]
    KoEn,
    /// English name, Korean (Hangul) notation
    #[serde(rename = "EN-KO")]
    EnKo,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::KoEn, Direction::EnKo];

    pub fn code(&self) -> &'static str {
        match self {
            Direction::KoEn => "KO-EN",
            Direction::EnKo => "EN-KO",
        }
    }

    /// File-name friendly prefix (e.g. `ko_en`)
    pub fn slug(&self) -> &'static str {
        match self {
            Direction::KoEn => "ko_en",
            Direction::EnKo => "en_ko",
        }
    }

    pub fn source_language(&self) -> &'static str {
        match self {
            Direction::KoEn => "Korean",
            Direction::EnKo => "English",
        }
    }

    pub fn target_language(&self) -> &'static str {
        match self {
            Direction::KoEn => "English",
            Direction::EnKo => "Korean",
        }
    }

    /// JSON key the model is asked to put the notation under
    pub fn notation_field(&self) -> &'static str {
        match self {
            Direction::KoEn => "english_notation",
            Direction::EnKo => "korean_notation",
        }
    }

    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Korean => Direction::KoEn,
            Language::English => Direction::EnKo,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('_', "-").as_str() {
            "KO-EN" | "KOEN" => Ok(Direction::KoEn),
            "EN-KO" | "ENKO" => Ok(Direction::EnKo),
            _ => Err(format!("Unknown direction: {}. Use KO-EN or EN-KO", s)),
        }
    }
}

pub fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Detect whether a name is primarily Korean or English.
///
/// Empty input has no characters to count and is reported as English.
pub fn detect_language(name: &str) -> Language {
    let total = name.chars().count();
    if total == 0 {
        return Language::English;
    }

    let korean = name.chars().filter(|c| is_hangul_syllable(*c)).count();
    if korean as f64 / total as f64 > KOREAN_RATIO_THRESHOLD {
        Language::Korean
    } else {
        Language::English
    }
}

pub fn detect_direction(name: &str) -> Direction {
    Direction::for_language(detect_language(name))
}

/// Split names into (KO-EN, EN-KO) lists, keeping input order within each.
pub fn partition_by_direction<S: AsRef<str>>(names: &[S]) -> (Vec<String>, Vec<String>) {
    names
        .iter()
        .map(|n| n.as_ref().to_string())
        .partition(|n| detect_direction(n) == Direction::KoEn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ==================== Detection ====================

    #[test]
    fn test_korean_name_detected() {
        assert_eq!(detect_language("김지원"), Language::Korean);
        assert_eq!(detect_direction("김지원"), Direction::KoEn);
    }

    #[test]
    fn test_english_name_detected() {
        assert_eq!(detect_language("John Smith"), Language::English);
        assert_eq!(detect_direction("John Smith"), Direction::EnKo);
    }

    #[test]
    fn test_empty_name_defaults_to_english() {
        assert_eq!(detect_language(""), Language::English);
        assert_eq!(detect_direction(""), Direction::EnKo);
    }

    #[test]
    fn test_mixed_script_uses_threshold() {
        // 3 Hangul out of 19 chars -> English
        assert_eq!(detect_language("김지원 (Kim Jiwon Kim)"), Language::English);
        // 3 Hangul out of 12 chars -> Korean
        assert_eq!(detect_language("김지원 (Ji-won)"), Language::Korean);
    }

    #[test]
    fn test_hangul_jamo_is_not_a_syllable() {
        // Compatibility jamo are outside the syllable block
        assert!(!is_hangul_syllable('ㄱ'));
        assert!(is_hangul_syllable('가'));
        assert!(is_hangul_syllable('힣'));
    }

    #[test]
    fn test_partition_keeps_order() {
        let names = vec!["John Smith", "김지원", "Emma Watson", "박서준"];
        let (ko, en) = partition_by_direction(&names);
        assert_eq!(ko, vec!["김지원", "박서준"]);
        assert_eq!(en, vec!["John Smith", "Emma Watson"]);
    }

    // ==================== Direction parsing ====================

    #[test]
    fn test_direction_from_str() {
        assert_eq!("KO-EN".parse::<Direction>().unwrap(), Direction::KoEn);
        assert_eq!("en-ko".parse::<Direction>().unwrap(), Direction::EnKo);
        assert_eq!("ko_en".parse::<Direction>().unwrap(), Direction::KoEn);
        assert!("FR-EN".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_serde_uses_codes() {
        let json = serde_json::to_string(&Direction::KoEn).unwrap();
        assert_eq!(json, "\"KO-EN\"");
        let parsed: Direction = serde_json::from_str("\"EN-KO\"").unwrap();
        assert_eq!(parsed, Direction::EnKo);
    }

    #[test]
    fn test_direction_display_and_languages() {
        assert_eq!(Direction::EnKo.to_string(), "EN-KO");
        assert_eq!(Direction::KoEn.source_language(), "Korean");
        assert_eq!(Direction::KoEn.target_language(), "English");
        assert_eq!(Direction::EnKo.notation_field(), "korean_notation");
    }

    // ==================== Properties ====================

    proptest! {
        #[test]
        fn prop_all_hangul_is_korean(name in "[가-힣]{1,12}") {
            prop_assert_eq!(detect_language(&name), Language::Korean);
        }

        #[test]
        fn prop_all_ascii_letters_is_english(name in "[A-Za-z ]{0,40}") {
            prop_assert_eq!(detect_language(&name), Language::English);
        }

        #[test]
        fn prop_never_panics(name in ".*") {
            let _ = detect_direction(&name);
        }
    }
}

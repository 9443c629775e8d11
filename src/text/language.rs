//! Dominant-language detection for fragments.
//!
//! Only two languages are supported: Russian (the primary language, detected
//! by its alphabet) and English (everything else).

use crate::defaults::CYRILLIC_RATIO_THRESHOLD;
use std::fmt;

/// Language a fragment is spoken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Primary language, selected when Cyrillic letters dominate.
    Russian,
    /// Secondary language, the fallback for everything else.
    English,
}

impl Language {
    /// Short language code, also embedded in cache file names.
    pub fn code(self) -> &'static str {
        match self {
            Language::Russian => "ru",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Classify `text` by the share of Cyrillic letters among all characters.
///
/// Empty text is English.
pub fn detect_language(text: &str) -> Language {
    let total = text.chars().count();
    if total == 0 {
        return Language::English;
    }

    let cyrillic = text.chars().filter(|&c| is_cyrillic_letter(c)).count();
    if cyrillic as f64 / total as f64 > CYRILLIC_RATIO_THRESHOLD {
        Language::Russian
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_text_is_english() {
        assert_eq!(detect_language("Hello world."), Language::English);
    }

    #[test]
    fn cyrillic_text_is_russian() {
        assert_eq!(detect_language("Привет, мир!"), Language::Russian);
    }

    #[test]
    fn mixed_text_above_threshold_is_russian() {
        // 9 Cyrillic letters out of 23 characters
        assert_eq!(
            detect_language("This is ru: Привет мир."),
            Language::Russian
        );
    }

    #[test]
    fn mixed_text_below_threshold_is_english() {
        // 3 Cyrillic letters out of 25 characters
        assert_eq!(
            detect_language("The word мир means peace."),
            Language::English
        );
    }

    #[test]
    fn uppercase_and_yo_count_as_cyrillic() {
        assert_eq!(detect_language("ЁЖИК"), Language::Russian);
        assert_eq!(detect_language("ёлка"), Language::Russian);
    }

    #[test]
    fn empty_text_is_english() {
        assert_eq!(detect_language(""), Language::English);
    }

    #[test]
    fn detection_is_deterministic() {
        let text = "Смешанный text с English словами";
        let first = detect_language(text);
        for _ in 0..10 {
            assert_eq!(detect_language(text), first);
        }
    }

    #[test]
    fn language_codes() {
        assert_eq!(Language::Russian.code(), "ru");
        assert_eq!(Language::English.to_string(), "en");
    }
}

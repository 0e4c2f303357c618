/// Marker used by callers for a word that was not spoken.
pub const WORD_NOT_FOUND: &str = "-";

/// Lowercase and trim, the normalization every comparison starts from.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Splits text into lowercase word tokens.
///
/// Leading and trailing ASCII punctuation is trimmed from each token, so
/// "Seashells." and "seashells" compare equal; inner apostrophes survive
/// ("don't"). Tokens left empty are dropped.
pub fn tokenize_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn is_punctuation_only(word: &str) -> bool {
    word.chars().all(|c| c.is_ascii_punctuation())
}

pub fn is_placeholder(word: Option<&str>) -> bool {
    match word {
        None => true,
        Some(w) => w.is_empty() || w == WORD_NOT_FOUND,
    }
}

/// ARPAbet symbol with its stress digit removed ("AE1" -> "AE").
pub fn base_phoneme(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .to_ascii_uppercase()
}

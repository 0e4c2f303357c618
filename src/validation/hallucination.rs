use std::collections::HashMap;

use crate::config::HallucinationConfig;
use crate::types::HallucinationKind;

/// Flags transcriptions that look like recognizer garbage rather than speech.
///
/// Checks run in order and the first hit is returned. Lengths count chars.
pub fn detect_hallucination(text: &str, config: &HallucinationConfig) -> Option<HallucinationKind> {
    let len = text.chars().count();
    if len < config.min_length {
        return None;
    }

    let non_ascii = text.chars().filter(|c| !c.is_ascii()).count();
    if non_ascii as f64 / len as f64 > config.max_non_ascii_ratio {
        return Some(HallucinationKind::NonAscii);
    }

    if longest_char_run(text) >= config.repeated_char_run {
        return Some(HallucinationKind::RepeatedCharacter);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > config.repetition_min_words {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &w in &words {
            *counts.entry(w).or_default() += 1;
        }
        let dominant = counts.values().copied().max().unwrap_or(0);
        if dominant as f64 / words.len() as f64 > config.max_dominant_word_ratio {
            return Some(HallucinationKind::RepeatedWord);
        }
    }

    if len > config.max_unbroken_length && !text.contains(' ') {
        return Some(HallucinationKind::MissingWordBreaks);
    }

    None
}

fn longest_char_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut prev = None;
    for c in text.chars() {
        run = if Some(c) == prev { run + 1 } else { 1 };
        longest = longest.max(run);
        prev = Some(c);
    }
    longest
}

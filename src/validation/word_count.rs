use std::collections::HashSet;

use serde::Serialize;
use similar::DiffTag;

use crate::alignment::edit_distance::str_edit_distance;
use crate::alignment::sequence_matcher::SequenceMatcher;

pub const COUNT_MATCH_MESSAGE: &str = "Word count matches. Proceeding to phoneme analysis.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCountAlignment {
    pub position: usize,
    pub reference: String,
    pub user: Option<String>,
    pub user_position: Option<usize>,
    pub is_match: bool,
    pub edit_distance: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordValidationResult {
    pub is_valid: bool,
    pub total_expected: usize,
    pub total_spoken: usize,
    pub missing_words: Vec<String>,
    pub extra_words: Vec<String>,
    pub word_alignment: Vec<WordCountAlignment>,
    pub message: String,
}

/// Word-count check ahead of phoneme analysis: equal counts pass, otherwise
/// the missing or extra words are named.
pub fn validate_word_count(user: &[String], reference: &[String]) -> WordValidationResult {
    let user: Vec<String> = user.iter().map(|w| w.trim().to_lowercase()).collect();
    let reference: Vec<String> = reference.iter().map(|w| w.trim().to_lowercase()).collect();

    let mut result = WordValidationResult {
        is_valid: false,
        total_expected: reference.len(),
        total_spoken: user.len(),
        missing_words: Vec::new(),
        extra_words: Vec::new(),
        word_alignment: Vec::new(),
        message: String::new(),
    };

    if user.len() == reference.len() {
        result.is_valid = true;
        result.word_alignment = align_positional(&user, &reference);
        result.message = COUNT_MATCH_MESSAGE.to_string();
    } else if user.len() < reference.len() {
        result.missing_words = find_missing_words(&user, &reference);
        result.word_alignment = align_greedy(&user, &reference);
        result.message = match result.missing_words.as_slice() {
            [word] => format!("You missed the word '{word}'."),
            words => format!("You missed {} words: '{}'.", words.len(), words.join("', '")),
        };
    } else {
        result.extra_words = find_extra_words(&user, &reference);
        result.word_alignment = align_greedy(&user, &reference);
        result.message = match result.extra_words.as_slice() {
            [word] => {
                format!("You added an extra word '{word}'. Please say only the sentence shown.")
            }
            words => format!(
                "You added {} extra words: '{}'.",
                words.len(),
                words.join("', '")
            ),
        };
    }

    tracing::debug!(
        spoken = result.total_spoken,
        expected = result.total_expected,
        valid = result.is_valid,
        "word count validation"
    );
    result
}

fn align_positional(user: &[String], reference: &[String]) -> Vec<WordCountAlignment> {
    user.iter()
        .zip(reference)
        .enumerate()
        .map(|(i, (heard, want))| WordCountAlignment {
            position: i,
            reference: want.clone(),
            user: Some(heard.clone()),
            user_position: Some(i),
            is_match: heard == want,
            edit_distance: str_edit_distance(heard, want),
        })
        .collect()
}

/// Each reference word claims the closest unused user word when it is within
/// `len / 2 + 1` edits.
fn align_greedy(user: &[String], reference: &[String]) -> Vec<WordCountAlignment> {
    let mut used = vec![false; user.len()];
    let mut alignment = Vec::with_capacity(reference.len());

    for (r, want) in reference.iter().enumerate() {
        let best = user
            .iter()
            .enumerate()
            .filter(|(u, _)| !used[*u])
            .map(|(u, heard)| (u, str_edit_distance(heard, want)))
            .fold(None, |best: Option<(usize, usize)>, (u, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((u, d)),
            });

        let want_len = want.chars().count();
        match best {
            Some((u, dist)) if dist <= want_len / 2 + 1 => {
                used[u] = true;
                alignment.push(WordCountAlignment {
                    position: r,
                    reference: want.clone(),
                    user: Some(user[u].clone()),
                    user_position: Some(u),
                    is_match: user[u] == *want,
                    edit_distance: dist,
                });
            }
            _ => alignment.push(WordCountAlignment {
                position: r,
                reference: want.clone(),
                user: None,
                user_position: None,
                is_match: false,
                edit_distance: want_len,
            }),
        }
    }
    alignment
}

fn is_close(heard: &str, want: &str) -> bool {
    str_edit_distance(heard, want) <= want.chars().count() / 2
}

fn find_missing_words(user: &[String], reference: &[String]) -> Vec<String> {
    let mut missing = Vec::new();
    for op in SequenceMatcher::new(user, reference).ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Insert => missing.extend(reference[new_range].iter().cloned()),
            DiffTag::Replace => {
                for want in &reference[new_range] {
                    if !user[old_range.clone()].iter().any(|h| is_close(h, want)) {
                        missing.push(want.clone());
                    }
                }
            }
            DiffTag::Equal | DiffTag::Delete => {}
        }
    }

    if missing.is_empty() {
        let spoken: HashSet<&str> = user.iter().map(String::as_str).collect();
        missing = reference
            .iter()
            .filter(|want| !spoken.contains(want.as_str()))
            .filter(|want| !user.iter().any(|h| shares_shape(h, want)))
            .cloned()
            .collect();
    }
    missing
}

/// Similar length and the same two-letter prefix.
fn shares_shape(heard: &str, want: &str) -> bool {
    heard.chars().count().abs_diff(want.chars().count()) <= 2
        && heard.chars().take(2).eq(want.chars().take(2))
}

fn find_extra_words(user: &[String], reference: &[String]) -> Vec<String> {
    let expected: HashSet<&str> = reference.iter().map(String::as_str).collect();
    user.iter()
        .filter(|heard| !expected.contains(heard.as_str()))
        .filter(|heard| !reference.iter().any(|want| is_close(heard, want)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn equal_counts_align_positionally() {
        let result = validate_word_count(&words("The cat sad"), &words("the cat sat"));
        assert!(result.is_valid);
        assert_eq!(result.message, COUNT_MATCH_MESSAGE);
        assert_eq!(result.word_alignment.len(), 3);
        assert!(result.word_alignment[0].is_match);
        assert!(!result.word_alignment[2].is_match);
        assert_eq!(result.word_alignment[2].edit_distance, 1);
    }

    #[test]
    fn single_missing_word() {
        let result = validate_word_count(&words("the sat"), &words("the cat sat"));
        assert!(!result.is_valid);
        assert_eq!(result.missing_words, vec!["cat"]);
        assert_eq!(result.message, "You missed the word 'cat'.");
    }

    #[test]
    fn several_missing_words() {
        let result = validate_word_count(&words("she"), &words("she sells seashells"));
        assert_eq!(result.missing_words, vec!["sells", "seashells"]);
        assert_eq!(result.message, "You missed 2 words: 'sells', 'seashells'.");
        assert_eq!(result.word_alignment[1].user, None);
    }

    #[test]
    fn missing_words_follow_the_longest_matching_block() {
        let result = validate_word_count(&words("a b c a b"), &words("c a b a b c"));
        assert_eq!(result.missing_words, vec!["c", "a", "b"]);
    }

    #[test]
    fn extra_words_are_named() {
        let result = validate_word_count(&words("the big cat"), &words("the cat"));
        assert_eq!(result.extra_words, vec!["big"]);
        assert_eq!(
            result.message,
            "You added an extra word 'big'. Please say only the sentence shown."
        );

        let result = validate_word_count(&words("oh the big cat yes"), &words("the cat"));
        assert_eq!(result.extra_words, vec!["oh", "big", "yes"]);
        assert_eq!(result.message, "You added 3 extra words: 'oh', 'big', 'yes'.");
    }

    #[test]
    fn near_miss_extra_word_is_not_reported() {
        let result = validate_word_count(&words("the cat cats"), &words("the cat"));
        assert!(result.extra_words.is_empty());
    }
}

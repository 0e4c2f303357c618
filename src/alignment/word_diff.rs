use similar::DiffTag;

use super::sequence_matcher::SequenceMatcher;
use crate::types::{DiffKind, WordDiffEntry, WordIssue};

/// Character-level `2 * matched / (|a| + |b|)` over Ratcliff/Obershelp
/// matching blocks. Two empty strings have ratio 1.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    SequenceMatcher::new(&a, &b).ratio()
}

/// Classifies how `heard` falls short of `expected`. Checks run in a fixed
/// order and the first hit wins.
pub fn detect_word_issue(heard: Option<&str>, expected: &str) -> WordIssue {
    let Some(heard) = heard.filter(|w| !w.is_empty()) else {
        return WordIssue::WordSkipped;
    };
    let heard = heard.to_lowercase();
    let expected = expected.to_lowercase();

    if let Some(suffix) = expected.strip_prefix(heard.as_str()) {
        if !suffix.is_empty() {
            return WordIssue::MissingEnding(suffix.to_string());
        }
    }
    if let Some(prefix) = expected.strip_suffix(heard.as_str()) {
        if !prefix.is_empty() {
            return WordIssue::MissingBeginning(prefix.to_string());
        }
    }

    if heard.chars().count() == expected.chars().count() {
        let mut diffs = heard
            .chars()
            .zip(expected.chars())
            .filter(|(h, e)| h != e);
        if let (Some((h, e)), None) = (diffs.next(), diffs.next()) {
            return WordIssue::Substituted {
                expected: e,
                actual: h,
            };
        }
    }

    if expected.contains("th") && (heard.contains('d') || heard.contains('t')) {
        return WordIssue::ThSubstitution;
    }
    WordIssue::Mispronounced
}

/// Word-level diff of the transcription (old side) against the expected words
/// (new side), sorted by position.
///
/// A replaced span reports each expected word as wrong, paired with the heard
/// word at the same offset. Heard words past the end of the expected side are
/// not reported.
pub fn word_diff(transcribed: &[String], expected: &[String]) -> Vec<WordDiffEntry> {
    let mut entries = Vec::with_capacity(expected.len() + transcribed.len());
    for op in SequenceMatcher::new(transcribed, expected).ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                for j in new_range {
                    entries.push(entry(&expected[j], DiffKind::Correct, j));
                }
            }
            DiffTag::Replace => {
                for (k, j) in new_range.enumerate() {
                    let i = old_range.start + k;
                    let heard = (i < old_range.end).then(|| transcribed[i].as_str());
                    let want = &expected[j];
                    entries.push(WordDiffEntry {
                        user_said: heard.map(str::to_string),
                        suggestion: Some(want.clone()),
                        issue: Some(detect_word_issue(heard, want)),
                        ..entry(want, DiffKind::Wrong, j)
                    });
                }
            }
            DiffTag::Delete => {
                for i in old_range {
                    entries.push(extra(&transcribed[i], i));
                }
            }
            DiffTag::Insert => {
                for j in new_range {
                    let want = &expected[j];
                    entries.push(WordDiffEntry {
                        suggestion: Some(format!("You missed saying '{want}'")),
                        ..entry(want, DiffKind::Missing, j)
                    });
                }
            }
        }
    }

    entries.sort_by_key(|e| e.position);
    entries
}

fn entry(word: &str, kind: DiffKind, position: usize) -> WordDiffEntry {
    WordDiffEntry {
        word: word.to_string(),
        kind,
        position,
        user_said: None,
        suggestion: None,
        issue: None,
    }
}

fn extra(word: &str, position: usize) -> WordDiffEntry {
    WordDiffEntry {
        user_said: Some(word.to_string()),
        ..entry(word, DiffKind::Extra, position)
    }
}

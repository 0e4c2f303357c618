use crate::alignment::edit_distance::{edit_operations, EditKind};
use crate::alignment::tokenization::{is_placeholder, is_punctuation_only};
use crate::types::{HighlightedWord, LetterErrorType, LetterStatus, SentenceHighlight};

/// One-to-one lowercase so indices into the folded word stay valid for the original.
fn fold(word: &str) -> Vec<char> {
    word.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn deleted(letter: char) -> LetterStatus {
    LetterStatus {
        letter,
        is_correct: false,
        error_type: Some(LetterErrorType::Deletion),
        expected: letter,
        actual: None,
    }
}

/// Per-letter verdict for `expected` given what was heard.
///
/// A missing word (`None` or the `-` placeholder) marks every letter deleted.
/// Otherwise the case-folded edit script is walked and each letter takes the
/// verdict of the operation that consumed it. Letters keep their original case.
pub fn highlight_letter_errors(expected: &str, actual: Option<&str>) -> Vec<LetterStatus> {
    let original: Vec<char> = expected.chars().collect();
    if original.is_empty() {
        return Vec::new();
    }
    let actual = match actual {
        Some(word) if !is_placeholder(Some(word)) => word,
        _ => return original.into_iter().map(deleted).collect(),
    };

    let mut statuses = Vec::with_capacity(original.len());
    let mut next = 0usize;
    for op in edit_operations(&fold(expected), &fold(actual)) {
        if op.kind == EditKind::Insert {
            continue;
        }
        let Some(&letter) = original.get(next) else {
            break;
        };
        statuses.push(match op.kind {
            EditKind::Match => LetterStatus {
                letter,
                is_correct: true,
                error_type: None,
                expected: letter,
                actual: op.b,
            },
            EditKind::Substitute => LetterStatus {
                letter,
                is_correct: false,
                error_type: Some(LetterErrorType::Substitution),
                expected: letter,
                actual: op.b,
            },
            _ => deleted(letter),
        });
        next += 1;
    }
    statuses.extend(original[next..].iter().copied().map(deleted));
    statuses
}

/// `true` per correctly pronounced letter.
pub fn letter_correctness(expected: &str, actual: Option<&str>) -> Vec<bool> {
    highlight_letter_errors(expected, actual)
        .iter()
        .map(|s| s.is_correct)
        .collect()
}

/// Binary string, `1` for a correct letter and `0` otherwise ("11101").
pub fn format_letter_errors(expected: &str, actual: Option<&str>) -> String {
    letter_correctness(expected, actual)
        .into_iter()
        .map(|ok| if ok { '1' } else { '0' })
        .collect()
}

/// Zero-based indices of the letters that were wrong.
pub fn error_positions(expected: &str, actual: Option<&str>) -> Vec<usize> {
    letter_correctness(expected, actual)
        .into_iter()
        .enumerate()
        .filter_map(|(i, ok)| (!ok).then_some(i))
        .collect()
}

fn describe(statuses: &[LetterStatus]) -> Vec<String> {
    statuses
        .iter()
        .enumerate()
        .filter_map(|(i, s)| match (s.error_type, s.actual) {
            (Some(LetterErrorType::Deletion), _) => {
                Some(format!("Missing '{}' at position {}", s.letter, i + 1))
            }
            (Some(LetterErrorType::Substitution), Some(heard)) => Some(format!(
                "Position {}: said '{}' instead of '{}'",
                i + 1,
                heard,
                s.letter
            )),
            _ => None,
        })
        .collect()
}

/// Readable descriptions of every wrong letter, with 1-based positions.
pub fn describe_letter_errors(expected: &str, actual: Option<&str>) -> Vec<String> {
    describe(&highlight_letter_errors(expected, actual))
}

pub fn highlight_word(expected: &str, actual: Option<&str>) -> HighlightedWord {
    let letters = highlight_letter_errors(expected, actual);
    let correct_count = letters.iter().filter(|s| s.is_correct).count();
    let total_letters = letters.len();
    let is_perfect = total_letters > 0 && correct_count == total_letters;
    let error_descriptions = if is_perfect {
        Vec::new()
    } else {
        describe(&letters)
    };

    HighlightedWord {
        word: expected.to_string(),
        actual: actual.map(str::to_string),
        correct_count,
        total_letters,
        accuracy: if total_letters == 0 {
            0.0
        } else {
            correct_count as f64 / total_letters as f64 * 100.0
        },
        is_perfect,
        error_descriptions,
        letters,
    }
}

fn heard_at<S: AsRef<str>>(actual: &[Option<S>], i: usize) -> Option<&str> {
    actual.get(i)?.as_ref().map(|w| w.as_ref())
}

/// Highlights every expected word against the word heard in its place.
///
/// `actual` is padded with missing words when shorter than `expected`.
pub fn highlight_sentence<S: AsRef<str>>(expected: &[S], actual: &[Option<S>]) -> SentenceHighlight {
    let words: Vec<HighlightedWord> = expected
        .iter()
        .enumerate()
        .map(|(i, want)| highlight_word(want.as_ref(), heard_at(actual, i)))
        .collect();

    let total_correct_letters = words.iter().map(|w| w.correct_count).sum();
    let total_letters = words.iter().map(|w| w.total_letters).sum();
    let letter_errors_string = words
        .iter()
        .filter(|w| !is_punctuation_only(&w.word))
        .map(|w| {
            w.letters
                .iter()
                .map(|s| if s.is_correct { '1' } else { '0' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ");

    SentenceHighlight {
        total_correct_letters,
        total_letters,
        letter_accuracy: if total_letters == 0 {
            0.0
        } else {
            total_correct_letters as f64 / total_letters as f64 * 100.0
        },
        word_count: expected.len(),
        perfect_words: words.iter().filter(|w| w.is_perfect).count(),
        letter_errors_string,
        words,
    }
}

use crate::alignment::dtw;
use crate::alignment::edit_distance::str_edit_distance;
use crate::alignment::round_to;
use crate::error::AssessmentError;
use crate::types::{AlignmentEntry, WordMatchSummary, WordStatus};

fn word_distance(a: &str, b: &str) -> usize {
    str_edit_distance(&a.trim().to_lowercase(), &b.trim().to_lowercase())
}

/// Edit distances between every transcribed and reference word.
///
/// Shape is `(transcribed.len() + 1) x reference.len()`. The extra last row is
/// the blank row: the cost of leaving `reference[j]` unmatched, i.e. its length.
pub fn word_distance_matrix(transcribed: &[String], reference: &[String]) -> Vec<Vec<usize>> {
    let mut matrix: Vec<Vec<usize>> = transcribed
        .iter()
        .map(|heard| reference.iter().map(|want| word_distance(heard, want)).collect())
        .collect();
    matrix.push(reference.iter().map(|want| want.chars().count()).collect());
    matrix
}

/// Maps each transcribed word to the reference word the warping path pairs it with.
///
/// DTW runs over the transposed distance matrix (`reference x transcribed+1`).
/// A transcribed column crossed by several path cells takes the cheapest one,
/// the earliest on ties.
pub fn dtw_mapping(
    transcribed: &[String],
    reference: &[String],
) -> Result<Vec<Option<usize>>, AssessmentError> {
    if transcribed.is_empty() || reference.is_empty() {
        return Ok(vec![None; transcribed.len()]);
    }

    let matrix = word_distance_matrix(transcribed, reference);
    let cost: Vec<Vec<f64>> = (0..reference.len())
        .map(|r| matrix.iter().map(|row| row[r] as f64).collect())
        .collect();
    let path = dtw::warping_path(&cost)?;

    let mut mapping = vec![None; transcribed.len()];
    let mut best = vec![f64::INFINITY; transcribed.len()];
    for (r, c) in path {
        if c < transcribed.len() && cost[r][c] < best[c] {
            best[c] = cost[r][c];
            mapping[c] = Some(r);
        }
    }
    Ok(mapping)
}

/// Greedy alignment: every reference word in order claims the closest unused
/// transcribed word, provided it is closer than the reference word's length.
///
/// Returned in the same shape as [`dtw_mapping`], indexed by transcribed word.
pub fn greedy_mapping(transcribed: &[String], reference: &[String]) -> Vec<Option<usize>> {
    let mut mapping = vec![None; transcribed.len()];
    for (r, want) in reference.iter().enumerate() {
        let mut best: Option<(usize, usize)> = None;
        for (t, heard) in transcribed.iter().enumerate() {
            if mapping[t].is_some() {
                continue;
            }
            let dist = word_distance(heard, want);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((t, dist));
            }
        }
        if let Some((t, dist)) = best {
            if dist < want.chars().count() {
                mapping[t] = Some(r);
            }
        }
    }
    mapping
}

/// Resolves a transcribed-to-reference mapping into one entry per reference
/// word, followed by an `Extra` entry for every transcribed word left unused.
pub fn compare_word_sequences(
    reference: &[String],
    transcribed: &[String],
    mapping: &[Option<usize>],
) -> Vec<AlignmentEntry> {
    let mut used = vec![false; transcribed.len()];
    let mut entries = Vec::with_capacity(reference.len() + transcribed.len());

    for (r, want) in reference.iter().enumerate() {
        let chosen = mapping
            .iter()
            .enumerate()
            .filter(|&(t, m)| *m == Some(r) && t < transcribed.len())
            .map(|(t, _)| (t, word_distance(&transcribed[t], want)))
            .fold(None, |best: Option<(usize, usize)>, (t, dist)| match best {
                Some((_, d)) if d <= dist => best,
                _ => Some((t, dist)),
            });

        let Some((t, _)) = chosen else {
            entries.push(AlignmentEntry {
                position: Some(r),
                expected_word: want.clone(),
                actual_word: None,
                actual_index: None,
                status: WordStatus::Missing,
                similarity: 0.0,
            });
            continue;
        };

        used[t] = true;
        let heard = &transcribed[t];
        let (status, similarity) = word_status(want, heard);
        entries.push(AlignmentEntry {
            position: Some(r),
            expected_word: want.clone(),
            actual_word: Some(heard.clone()),
            actual_index: Some(t),
            status,
            similarity,
        });
    }

    for (t, heard) in transcribed.iter().enumerate() {
        if !used[t] {
            entries.push(AlignmentEntry {
                position: None,
                expected_word: String::new(),
                actual_word: Some(heard.clone()),
                actual_index: Some(t),
                status: WordStatus::Extra,
                similarity: 0.0,
            });
        }
    }

    entries
}

fn word_status(want: &str, heard: &str) -> (WordStatus, f64) {
    let want = want.trim().to_lowercase();
    let heard = heard.trim().to_lowercase();
    if want == heard {
        return (WordStatus::Correct, 1.0);
    }
    let max_len = want.chars().count().max(heard.chars().count());
    let similarity = if max_len == 0 {
        0.0
    } else {
        1.0 - str_edit_distance(&want, &heard) as f64 / max_len as f64
    };
    let status = if similarity > 0.5 {
        WordStatus::Partial
    } else {
        WordStatus::Wrong
    };
    (status, round_to(similarity, 3))
}

pub fn summarize(entries: &[AlignmentEntry]) -> WordMatchSummary {
    let count = |status: WordStatus| entries.iter().filter(|e| e.status == status).count();
    let extra = count(WordStatus::Extra);
    let total_expected = entries.len() - extra;
    let correct = count(WordStatus::Correct);
    let accuracy = if total_expected == 0 {
        0.0
    } else {
        round_to(correct as f64 / total_expected as f64 * 100.0, 1)
    };

    WordMatchSummary {
        total_expected,
        correct,
        partial: count(WordStatus::Partial),
        wrong: count(WordStatus::Wrong),
        missing: count(WordStatus::Missing),
        extra,
        accuracy,
        is_perfect: correct == total_expected && extra == 0,
    }
}

/// What was heard for each reference word, `None` where it was missed.
pub fn mapped_words(entries: &[AlignmentEntry]) -> Vec<Option<String>> {
    entries
        .iter()
        .filter(|e| e.position.is_some())
        .map(|e| e.actual_word.clone())
        .collect()
}

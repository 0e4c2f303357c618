use crate::alignment::round_to;
use crate::config::AssessmentConfig;
use crate::error::AssessmentError;
use crate::types::{PerResult, PhonemeClass, PhonemeClassification, PhonemeErrorRecord, PhonemeErrorType};

/// Buckets one phoneme similarity against the configured thresholds.
pub fn classify_phoneme(
    phoneme: &str,
    similarity: f64,
    config: &AssessmentConfig,
) -> PhonemeClassification {
    let (class, penalty) = if similarity >= config.correct_threshold {
        (PhonemeClass::Correct, 0)
    } else if similarity >= config.weak_threshold {
        (PhonemeClass::Weak, config.penalties.weak)
    } else {
        (PhonemeClass::Substitution, config.penalties.substitution)
    };
    PhonemeClassification {
        phoneme: phoneme.to_string(),
        similarity,
        class,
        penalty,
    }
}

fn check_similarity(position: usize, similarity: f64) -> Result<(), AssessmentError> {
    if similarity.is_finite() && (0.0..=1.0).contains(&similarity) {
        Ok(())
    } else {
        Err(AssessmentError::invalid_input(format!(
            "phoneme similarity at position {position} must be within [0, 1], got {similarity}"
        )))
    }
}

/// Phone error rate of a positionally aligned phoneme sequence.
///
/// `similarities[i]` scores `reference[i]`; reference positions without a
/// score are deletions and user phonemes past the end of the reference are
/// insertions. Scores beyond the reference length are ignored.
pub fn calculate_per<S: AsRef<str>>(
    reference: &[S],
    user: &[S],
    similarities: &[f64],
    config: &AssessmentConfig,
) -> Result<PerResult, AssessmentError> {
    let total = reference.len();
    if total == 0 {
        return Ok(PerResult {
            per_score: 0.0,
            adjusted_score: 100,
            total_phonemes: 0,
            correct_count: 0,
            substitutions: 0,
            deletions: 0,
            insertions: 0,
            weak_count: 0,
            errors: Vec::new(),
            summary: "No phonemes to evaluate.".to_string(),
        });
    }

    let mut correct = 0usize;
    let mut substitutions = 0usize;
    let mut deletions = 0usize;
    let mut weak = 0usize;
    let mut errors = Vec::new();

    for (i, expected) in reference.iter().map(AsRef::as_ref).enumerate() {
        let Some(&similarity) = similarities.get(i) else {
            deletions += 1;
            errors.push(PhonemeErrorRecord {
                word: None,
                position: i,
                expected_phoneme: Some(expected.to_string()),
                actual_phoneme: None,
                error_type: PhonemeErrorType::Deletion,
                similarity: 0.0,
                message: format!("Missing phoneme /{expected}/ at position {}.", i + 1),
            });
            continue;
        };
        check_similarity(i, similarity)?;
        let actual = user.get(i).map(|p| p.as_ref().to_string());

        match classify_phoneme(expected, similarity, config).class {
            PhonemeClass::Correct => correct += 1,
            PhonemeClass::Weak => {
                weak += 1;
                errors.push(PhonemeErrorRecord {
                    word: None,
                    position: i,
                    expected_phoneme: Some(expected.to_string()),
                    actual_phoneme: actual,
                    error_type: PhonemeErrorType::Weak,
                    similarity,
                    message: format!(
                        "Phoneme /{expected}/ needs improvement (score: {:.0}%).",
                        similarity * 100.0
                    ),
                });
            }
            PhonemeClass::Substitution => {
                substitutions += 1;
                let said = actual.as_deref().unwrap_or("?");
                errors.push(PhonemeErrorRecord {
                    message: format!("You said /{said}/ instead of /{expected}/."),
                    word: None,
                    position: i,
                    expected_phoneme: Some(expected.to_string()),
                    actual_phoneme: actual,
                    error_type: PhonemeErrorType::Substitution,
                    similarity,
                });
            }
        }
    }

    let insertions = user.len().saturating_sub(total);
    for (i, extra) in user.iter().enumerate().skip(total) {
        let extra = extra.as_ref();
        errors.push(PhonemeErrorRecord {
            word: None,
            position: i,
            expected_phoneme: None,
            actual_phoneme: Some(extra.to_string()),
            error_type: PhonemeErrorType::Insertion,
            similarity: 0.0,
            message: format!("Extra phoneme /{extra}/ at position {}.", i + 1),
        });
    }

    let error_total = substitutions + deletions + insertions;
    let per = error_total as f64 / total as f64;
    let penalties = config.penalties;
    let penalty = substitutions as u64 * u64::from(penalties.substitution)
        + deletions as u64 * u64::from(penalties.deletion)
        + insertions as u64 * u64::from(penalties.insertion)
        + weak as u64 * u64::from(penalties.weak);
    let adjusted_score = 100u64.saturating_sub(penalty) as u32;

    let summary = if error_total == 0 && weak == 0 {
        "Excellent! All phonemes pronounced correctly.".to_string()
    } else if error_total == 0 {
        format!("Good pronunciation! {weak} phoneme(s) need minor improvement.")
    } else if per < 0.15 {
        format!(
            "Good attempt! {} phoneme error(s) detected.",
            substitutions + deletions
        )
    } else if per < 0.30 {
        "Partial match. Please focus on the highlighted phonemes.".to_string()
    } else {
        format!("Needs practice. {error_total} phoneme errors found.")
    };

    tracing::debug!(
        total,
        substitutions,
        deletions,
        insertions,
        weak,
        per,
        "phone error rate"
    );

    Ok(PerResult {
        per_score: round_to(per, 3),
        adjusted_score,
        total_phonemes: total,
        correct_count: correct,
        substitutions,
        deletions,
        insertions,
        weak_count: weak,
        errors,
        summary,
    })
}

/// [`calculate_per`] for the phonemes of one word, with every error message
/// rewritten to name the word.
pub fn calculate_word_per<S: AsRef<str>>(
    word: &str,
    reference: &[S],
    user: &[S],
    similarities: &[f64],
    config: &AssessmentConfig,
) -> Result<PerResult, AssessmentError> {
    let mut result = calculate_per(reference, user, similarities, config)?;
    for error in &mut result.errors {
        let expected = error.expected_phoneme.as_deref().unwrap_or_default();
        let message = match error.error_type {
            PhonemeErrorType::Substitution => Some(format!("In '{word}': {}", error.message)),
            PhonemeErrorType::Deletion => {
                Some(format!("In '{word}': You missed the /{expected}/ sound."))
            }
            PhonemeErrorType::Weak => {
                Some(format!("In '{word}': The /{expected}/ sound was unclear."))
            }
            PhonemeErrorType::Insertion => None,
        };
        if let Some(message) = message {
            error.message = message;
        }
        error.word = Some(word.to_string());
    }
    Ok(result)
}

/// Learner-facing corrections: deletions first, then substitutions, then
/// weak phonemes while fewer than five messages have been collected.
pub fn per_feedback(result: &PerResult) -> Vec<String> {
    let of_type = |kind: PhonemeErrorType| {
        result
            .errors
            .iter()
            .filter(move |e| e.error_type == kind)
            .map(|e| e.message.clone())
    };

    let mut feedback: Vec<String> = of_type(PhonemeErrorType::Deletion).take(3).collect();
    feedback.extend(of_type(PhonemeErrorType::Substitution).take(3));
    if feedback.len() < 5 {
        feedback.extend(of_type(PhonemeErrorType::Weak).take(2));
    }
    feedback
}

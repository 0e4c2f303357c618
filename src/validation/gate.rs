use crate::alignment::edit_distance::str_similarity;
use crate::alignment::round_to;
use crate::alignment::tokenization::{normalize_text, tokenize_words};
use crate::alignment::word_diff::{sequence_ratio, word_diff};
use crate::alignment::word_matcher::{compare_word_sequences, summarize};
use crate::config::AssessmentConfig;
use crate::error::AssessmentError;
use crate::pipeline::traits::WordAligner;
use crate::types::{DiffKind, Transcription, ValidationResult, ValidationStatus};
use crate::validation::hallucination::detect_hallucination;

pub const UNCLEAR_AUDIO_MESSAGE: &str = "Could not transcribe audio. Please speak more clearly.";
pub const MATCH_MESSAGE: &str = "Great! You said the sentence correctly.";

/// Decides whether a transcription is close enough to the expected sentence
/// for phoneme scoring to proceed.
///
/// Unusable, mismatched and partial transcriptions are all reported through
/// the returned status. Only oversized input is an error.
pub fn validate_speech(
    transcription: &Transcription,
    expected: &str,
    config: &AssessmentConfig,
    aligner: &dyn WordAligner,
) -> Result<ValidationResult, AssessmentError> {
    let hallucination = detect_hallucination(&transcription.text, &config.hallucination);
    if let Some(kind) = hallucination {
        tracing::warn!(?kind, text = %transcription.text, "discarding hallucinated transcription");
    }

    let heard = if hallucination.is_some() {
        String::new()
    } else {
        normalize_text(&transcription.text)
    };
    let want = normalize_text(expected);
    let heard_words = tokenize_words(&heard);
    let want_words = tokenize_words(&want);
    for side in [heard_words.len(), want_words.len()] {
        if side > config.max_tokens {
            return Err(AssessmentError::too_large(side, config.max_tokens));
        }
    }

    if heard.is_empty() {
        tracing::info!(status = "error", "speech validation: empty transcription");
        return Ok(ValidationResult {
            status: ValidationStatus::Error,
            transcribed: String::new(),
            expected: expected.to_string(),
            similarity: 0.0,
            sequence_similarity: 0.0,
            levenshtein_similarity: 0.0,
            word_diff: Vec::new(),
            dtw_comparison: Vec::new(),
            dtw_summary: None,
            can_proceed: false,
            message: UNCLEAR_AUDIO_MESSAGE.to_string(),
            hallucination,
            word_timestamps: Vec::new(),
        });
    }

    let sequence_similarity = sequence_ratio(&heard, &want);
    let levenshtein_similarity = str_similarity(&heard, &want);
    let similarity = sequence_similarity.max(levenshtein_similarity);

    let word_diff = word_diff(&heard_words, &want_words);
    let mapping = aligner.align(&heard_words, &want_words)?;
    let dtw_comparison = compare_word_sequences(&want_words, &heard_words, &mapping);
    let dtw_summary = summarize(&dtw_comparison);
    tracing::debug!(
        aligner = aligner.name(),
        sequence_similarity,
        levenshtein_similarity,
        diff_entries = word_diff.len(),
        "speech comparison computed"
    );

    let clean = word_diff.iter().all(|d| d.kind == DiffKind::Correct);
    let status = if similarity >= config.match_threshold && clean {
        ValidationStatus::Match
    } else if similarity >= config.similarity_threshold {
        ValidationStatus::Partial
    } else {
        ValidationStatus::Mismatch
    };

    let message = match status {
        ValidationStatus::Mismatch => format!(
            "It sounds like you said something different. Please try saying: '{expected}'"
        ),
        ValidationStatus::Partial => {
            let to_improve = word_diff
                .iter()
                .filter(|d| matches!(d.kind, DiffKind::Missing | DiffKind::Wrong))
                .count();
            format!("Good attempt! Found {to_improve} word(s) to improve.")
        }
        _ => MATCH_MESSAGE.to_string(),
    };

    tracing::info!(
        status = status.as_str(),
        similarity,
        dtw_accuracy = dtw_summary.accuracy,
        "speech validation"
    );

    Ok(ValidationResult {
        status,
        transcribed: transcription.text.clone(),
        expected: expected.to_string(),
        similarity: round_to(similarity, 3),
        sequence_similarity: round_to(sequence_similarity, 3),
        levenshtein_similarity: round_to(levenshtein_similarity, 3),
        word_diff,
        dtw_comparison,
        dtw_summary: Some(dtw_summary),
        can_proceed: status != ValidationStatus::Mismatch,
        message,
        hallucination: None,
        word_timestamps: transcription.word_timestamps.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::defaults::{DtwWordAligner, GreedyWordAligner};
    use crate::types::{WordIssue, WordStatus};

    fn validate(text: &str, expected: &str) -> ValidationResult {
        validate_speech(
            &Transcription::from_text(text),
            expected,
            &AssessmentConfig::default(),
            &DtwWordAligner,
        )
        .unwrap()
    }

    #[test]
    fn exact_sentence_is_a_match() {
        let result = validate("She sells seashells", "she sells seashells");
        assert_eq!(result.status, ValidationStatus::Match);
        assert!(result.can_proceed);
        assert_eq!(result.similarity, 1.0);
        assert_eq!(result.message, MATCH_MESSAGE);
        assert!(result.dtw_summary.as_ref().unwrap().is_perfect);
    }

    #[test]
    fn missing_ending_is_partial() {
        let result = validate("she sell seashells", "she sells seashells");
        assert_eq!(result.status, ValidationStatus::Partial);
        assert!(result.can_proceed);
        let wrong: Vec<_> = result.wrong_words().collect();
        assert_eq!(wrong.len(), 1);
        assert_eq!(wrong[0].word, "sells");
        assert_eq!(wrong[0].issue, Some(WordIssue::MissingEnding("s".into())));
        assert_eq!(result.message, "Good attempt! Found 1 word(s) to improve.");
        assert_eq!(result.dtw_comparison[1].status, WordStatus::Partial);
    }

    #[test]
    fn empty_transcription_is_an_error() {
        let result = validate("", "she sells seashells");
        assert_eq!(result.status, ValidationStatus::Error);
        assert!(!result.can_proceed);
        assert_eq!(result.message, UNCLEAR_AUDIO_MESSAGE);
        assert!(result.dtw_summary.is_none());
    }

    #[test]
    fn hallucinated_transcription_is_treated_as_empty() {
        let result = validate(&"é".repeat(60), "she sells seashells");
        assert_eq!(result.status, ValidationStatus::Error);
        assert!(result.hallucination.is_some());
        assert!(result.transcribed.is_empty());
    }

    #[test]
    fn reordered_sentence_is_a_mismatch() {
        let result = validate("yellow lorry red lorry", "red lorry yellow lorry");
        assert_eq!(result.status, ValidationStatus::Mismatch);
        assert!(!result.can_proceed);
        assert_eq!(result.sequence_similarity, 0.545);
    }

    #[test]
    fn unrelated_sentence_is_a_mismatch() {
        let result = validate("good morning everyone", "she sells seashells");
        assert_eq!(result.status, ValidationStatus::Mismatch);
        assert!(!result.can_proceed);
        assert_eq!(
            result.message,
            "It sounds like you said something different. Please try saying: 'she sells seashells'"
        );
    }

    #[test]
    fn oversized_input_is_rejected() {
        let config = AssessmentConfig {
            max_tokens: 2,
            ..AssessmentConfig::default()
        };
        let result = validate_speech(
            &Transcription::from_text("one two"),
            "one two three",
            &config,
            &GreedyWordAligner,
        );
        assert!(matches!(
            result,
            Err(AssessmentError::InputTooLarge { tokens: 3, max: 2 })
        ));
    }

    #[test]
    fn word_timestamps_are_carried_through() {
        let transcription = Transcription {
            text: "hello world".into(),
            word_timestamps: vec![crate::types::WordTimestamp {
                word: "hello".into(),
                start: 0.0,
                end: 0.4,
            }],
        };
        let result = validate_speech(
            &transcription,
            "hello world",
            &AssessmentConfig::default(),
            &DtwWordAligner,
        )
        .unwrap();
        assert_eq!(result.word_timestamps.len(), 1);
    }
}

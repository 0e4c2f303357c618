use crate::alignment::tokenization::tokenize_words;
use crate::config::AssessmentConfig;
use crate::error::AssessmentError;
use crate::pipeline::traits::{TipGenerator, WordAligner};
use crate::scoring::mistakes::MistakeSynthesizer;
use crate::types::{Assessment, AssessmentInput, MistakeReport, Transcription, ValidationResult};
use crate::validation::gate::validate_speech;
use crate::validation::word_count::{validate_word_count, WordValidationResult};

/// Runs the whole assessment flow. Stateless between calls, so one instance
/// can be shared across threads.
pub struct Assessor {
    config: AssessmentConfig,
    word_aligner: Box<dyn WordAligner>,
    tip_generator: Option<Box<dyn TipGenerator>>,
}

pub(crate) struct AssessorParts {
    pub config: AssessmentConfig,
    pub word_aligner: Box<dyn WordAligner>,
    pub tip_generator: Option<Box<dyn TipGenerator>>,
}

impl Assessor {
    pub(crate) fn from_parts(parts: AssessorParts) -> Self {
        Self {
            config: parts.config,
            word_aligner: parts.word_aligner,
            tip_generator: parts.tip_generator,
        }
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    pub fn aligner_name(&self) -> &'static str {
        self.word_aligner.name()
    }

    pub fn validate(
        &self,
        transcription: &Transcription,
        expected: &str,
    ) -> Result<ValidationResult, AssessmentError> {
        validate_speech(transcription, expected, &self.config, self.word_aligner.as_ref())
    }

    /// Rejects either side above `max_tokens` words, like [`Self::validate`].
    pub fn validate_word_count(
        &self,
        transcription: &Transcription,
        expected: &str,
    ) -> Result<WordValidationResult, AssessmentError> {
        let user = tokenize_words(&transcription.text);
        let reference = tokenize_words(expected);
        for side in [user.len(), reference.len()] {
            if side > self.config.max_tokens {
                return Err(AssessmentError::too_large(side, self.config.max_tokens));
            }
        }
        Ok(validate_word_count(&user, &reference))
    }

    pub fn synthesize(
        &self,
        validation: &ValidationResult,
        input: &AssessmentInput,
    ) -> Result<MistakeReport, AssessmentError> {
        MistakeSynthesizer::new(&self.config, self.tip_generator.as_deref())
            .synthesize(validation, input)
    }

    /// Gate first; the mistake report is produced only when the gate lets
    /// scoring proceed.
    pub fn assess(&self, input: &AssessmentInput) -> Result<Assessment, AssessmentError> {
        let validation = self.validate(&input.transcription, &input.expected_text)?;
        if !validation.can_proceed {
            tracing::info!(
                status = validation.status.as_str(),
                "scoring skipped by speech validation"
            );
            return Ok(Assessment {
                validation,
                report: None,
            });
        }

        let report = self.synthesize(&validation, input)?;
        Ok(Assessment {
            validation,
            report: Some(report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::builder::AssessorBuilder;
    use crate::types::{PhonemeScore, ValidationStatus};

    fn assessor() -> Assessor {
        AssessorBuilder::new(AssessmentConfig::default())
            .build()
            .expect("default assessor")
    }

    fn input(text: &str, expected: &str) -> AssessmentInput {
        AssessmentInput {
            transcription: Transcription::from_text(text),
            expected_text: expected.into(),
            reference_phonemes: vec!["K".into(), "AE1".into(), "T".into()],
            phoneme_scores: vec![
                PhonemeScore {
                    phoneme: "K".into(),
                    similarity: 0.9,
                    word: "cat".into(),
                    position: "initial".into(),
                },
                PhonemeScore {
                    phoneme: "AE1".into(),
                    similarity: 0.9,
                    word: "cat".into(),
                    position: "medial".into(),
                },
            ],
        }
    }

    #[test]
    fn assessor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Assessor>();
    }

    #[test]
    fn mismatch_skips_scoring() {
        let assessment = assessor().assess(&input("good morning", "the cat")).unwrap();
        assert_eq!(assessment.validation.status, ValidationStatus::Mismatch);
        assert!(assessment.report.is_none());
    }

    #[test]
    fn empty_transcription_skips_scoring() {
        let assessment = assessor().assess(&input("  ", "cat")).unwrap();
        assert_eq!(assessment.validation.status, ValidationStatus::Error);
        assert!(assessment.report.is_none());
    }

    #[test]
    fn match_produces_report_with_reference_deletions() {
        let assessment = assessor().assess(&input("cat", "cat")).unwrap();
        assert_eq!(assessment.validation.status, ValidationStatus::Match);
        let report = assessment.report.expect("report");
        assert_eq!(report.per.total_phonemes, 3);
        assert_eq!(report.per.deletions, 1);
        assert_eq!(report.error_counts.deletions, 1);
        assert_eq!(report.per.adjusted_score, 90);
        assert_eq!(report.letter_accuracy, 100.0);
        assert_eq!(report.blended_score, 96);
    }

    #[test]
    fn word_count_validation_uses_tokens() {
        let result = assessor()
            .validate_word_count(&Transcription::from_text("the, sat"), "The cat sat.")
            .unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.missing_words, vec!["cat"]);
    }

    #[test]
    fn word_count_validation_rejects_oversized_input() {
        let assessor = AssessorBuilder::new(AssessmentConfig {
            max_tokens: 2,
            ..AssessmentConfig::default()
        })
        .build()
        .expect("small assessor");

        let long_reference =
            assessor.validate_word_count(&Transcription::from_text("the cat"), "the cat sat");
        assert!(matches!(
            long_reference,
            Err(AssessmentError::InputTooLarge { tokens: 3, max: 2 })
        ));

        let long_transcription = assessor
            .validate_word_count(&Transcription::from_text("oh the big cat"), "the cat");
        assert!(matches!(
            long_transcription,
            Err(AssessmentError::InputTooLarge { tokens: 4, max: 2 })
        ));

        assert!(assessor
            .validate_word_count(&Transcription::from_text("the"), "the cat")
            .is_ok());
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;

/// Tunables for one `Assessor`. Every field has a default, so a JSON file only
/// needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Minimum whole-string similarity for scoring to proceed.
    pub similarity_threshold: f64,
    /// Whole-string similarity at or above which a clean transcription is a match.
    pub match_threshold: f64,
    pub correct_threshold: f64,
    pub weak_threshold: f64,
    pub penalties: PenaltyWeights,
    pub blend: BlendWeights,
    /// Points removed from the blended score per word-level mistake.
    pub word_mistake_penalty: u32,
    /// Upper bound on words per side accepted by the gate.
    pub max_tokens: usize,
    pub hallucination: HallucinationConfig,
    pub severity: SeverityTiers,
}

impl AssessmentConfig {
    pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;
    pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.9;
    pub const DEFAULT_CORRECT_THRESHOLD: f64 = 0.85;
    pub const DEFAULT_WEAK_THRESHOLD: f64 = 0.60;
    pub const DEFAULT_WORD_MISTAKE_PENALTY: u32 = 5;
    pub const DEFAULT_MAX_TOKENS: usize = 200;

    pub fn load(path: &Path) -> Result<Self, AssessmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AssessmentError::io("read assessment config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| AssessmentError::json("parse assessment config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AssessmentError> {
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("match_threshold", self.match_threshold),
            ("correct_threshold", self.correct_threshold),
            ("weak_threshold", self.weak_threshold),
            ("blend.per", self.blend.per),
            ("blend.letter_accuracy", self.blend.letter_accuracy),
            ("severity.major_below", self.severity.major_below),
            ("severity.moderate_below", self.severity.moderate_below),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(AssessmentError::invalid_input(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.weak_threshold > self.correct_threshold {
            return Err(AssessmentError::invalid_input(format!(
                "weak_threshold ({}) must not exceed correct_threshold ({})",
                self.weak_threshold, self.correct_threshold
            )));
        }
        if self.similarity_threshold > self.match_threshold {
            return Err(AssessmentError::invalid_input(format!(
                "similarity_threshold ({}) must not exceed match_threshold ({})",
                self.similarity_threshold, self.match_threshold
            )));
        }
        if self.severity.major_below > self.severity.moderate_below {
            return Err(AssessmentError::invalid_input(
                "severity.major_below must not exceed severity.moderate_below",
            ));
        }
        if self.max_tokens == 0 {
            return Err(AssessmentError::invalid_input("max_tokens must be >= 1"));
        }
        self.hallucination.validate()
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: Self::DEFAULT_SIMILARITY_THRESHOLD,
            match_threshold: Self::DEFAULT_MATCH_THRESHOLD,
            correct_threshold: Self::DEFAULT_CORRECT_THRESHOLD,
            weak_threshold: Self::DEFAULT_WEAK_THRESHOLD,
            penalties: PenaltyWeights::default(),
            blend: BlendWeights::default(),
            word_mistake_penalty: Self::DEFAULT_WORD_MISTAKE_PENALTY,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            hallucination: HallucinationConfig::default(),
            severity: SeverityTiers::default(),
        }
    }
}

/// Points deducted from 100 per phoneme error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub substitution: u32,
    pub deletion: u32,
    pub insertion: u32,
    pub weak: u32,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            substitution: 5,
            deletion: 10,
            insertion: 3,
            weak: 2,
        }
    }
}

/// Weights of the final score blend. The pair is not required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    pub per: f64,
    pub letter_accuracy: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            per: 0.4,
            letter_accuracy: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HallucinationConfig {
    /// Texts shorter than this (in chars) are never flagged.
    pub min_length: usize,
    pub max_non_ascii_ratio: f64,
    /// A run of this many identical chars is flagged.
    pub repeated_char_run: usize,
    /// Word-repetition check applies only above this many words.
    pub repetition_min_words: usize,
    pub max_dominant_word_ratio: f64,
    /// Texts longer than this with no space are flagged.
    pub max_unbroken_length: usize,
}

impl HallucinationConfig {
    fn validate(&self) -> Result<(), AssessmentError> {
        if self.repeated_char_run < 2 {
            return Err(AssessmentError::invalid_input(
                "hallucination.repeated_char_run must be >= 2",
            ));
        }
        for (name, value) in [
            ("hallucination.max_non_ascii_ratio", self.max_non_ascii_ratio),
            (
                "hallucination.max_dominant_word_ratio",
                self.max_dominant_word_ratio,
            ),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(AssessmentError::invalid_input(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for HallucinationConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_non_ascii_ratio: 0.3,
            repeated_char_run: 6,
            repetition_min_words: 3,
            max_dominant_word_ratio: 0.5,
            max_unbroken_length: 50,
        }
    }
}

/// Similarity cut-offs grading a mispronounced phoneme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityTiers {
    pub major_below: f64,
    pub moderate_below: f64,
}

impl Default for SeverityTiers {
    fn default() -> Self {
        Self {
            major_below: 0.3,
            moderate_below: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_config_default() {
        let config = AssessmentConfig::default();
        assert_eq!(config.similarity_threshold, 0.6);
        assert_eq!(config.match_threshold, 0.9);
        assert_eq!(config.correct_threshold, 0.85);
        assert_eq!(config.weak_threshold, 0.60);
        assert_eq!(config.penalties.substitution, 5);
        assert_eq!(config.penalties.deletion, 10);
        assert_eq!(config.penalties.insertion, 3);
        assert_eq!(config.penalties.weak, 2);
        assert_eq!(config.blend.per, 0.4);
        assert_eq!(config.blend.letter_accuracy, 0.6);
        assert_eq!(config.word_mistake_penalty, 5);
        assert_eq!(config.max_tokens, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let json = r#"{
            "similarity_threshold": 0.7,
            "penalties": { "deletion": 12 }
        }"#;
        let config: AssessmentConfig = serde_json::from_str(json).expect("valid config json");
        assert_eq!(config.similarity_threshold, 0.7);
        assert_eq!(config.penalties.deletion, 12);
        assert_eq!(config.penalties.substitution, 5);
        assert_eq!(config.correct_threshold, 0.85);
        assert_eq!(config.hallucination.repeated_char_run, 6);
    }

    #[test]
    fn validate_rejects_inverted_phoneme_thresholds() {
        let config = AssessmentConfig {
            weak_threshold: 0.9,
            correct_threshold: 0.8,
            ..AssessmentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let config = AssessmentConfig {
            similarity_threshold: 1.5,
            ..AssessmentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_and_validates_json_file() {
        let path = std::env::temp_dir().join("pronunciation_rs_config_load.json");
        std::fs::write(&path, r#"{"max_tokens": 50}"#).expect("write config");
        let config = AssessmentConfig::load(&path).expect("load config");
        assert_eq!(config.max_tokens, 50);
        let _ = std::fs::remove_file(&path);

        let bad = std::env::temp_dir().join("pronunciation_rs_config_load_bad.json");
        std::fs::write(&bad, r#"{"max_tokens": 0}"#).expect("write config");
        assert!(AssessmentConfig::load(&bad).is_err());
        let _ = std::fs::remove_file(&bad);
    }

    #[test]
    fn load_fails_on_missing_file() {
        let result = AssessmentConfig::load(Path::new("/nonexistent/assessment.json"));
        assert!(matches!(result, Err(AssessmentError::Io { .. })));
    }
}

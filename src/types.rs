use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Output contract of the transcription collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub word_timestamps: Vec<WordTimestamp>,
}

impl Transcription {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            word_timestamps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    /// Seconds from the start of the recording.
    pub start: f64,
    pub end: f64,
}

/// One entry of the phoneme similarity collaborator, aligned to the reference
/// phoneme sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeScore {
    pub phoneme: String,
    pub similarity: f64,
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub position: String,
}

/// Everything one assessment call consumes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub transcription: Transcription,
    pub expected_text: String,
    /// Reference ARPAbet sequence. When empty, the phonemes carried by
    /// `phoneme_scores` are used as the reference.
    #[serde(default)]
    pub reference_phonemes: Vec<String>,
    #[serde(default)]
    pub phoneme_scores: Vec<PhonemeScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    Correct,
    Partial,
    Wrong,
    Missing,
    Extra,
}

/// Word-aligner output for a single reference word (or an unmatched
/// transcribed word when `status` is `Extra`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentEntry {
    /// Reference index; `None` for extra words.
    pub position: Option<usize>,
    /// Empty for extra words.
    pub expected_word: String,
    pub actual_word: Option<String>,
    pub actual_index: Option<usize>,
    pub status: WordStatus,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordMatchSummary {
    pub total_expected: usize,
    pub correct: usize,
    pub partial: usize,
    pub wrong: usize,
    pub missing: usize,
    pub extra: usize,
    pub accuracy: f64,
    pub is_perfect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Correct,
    Wrong,
    Extra,
    Missing,
}

/// Why a replaced word differs from the expected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordIssue {
    WordSkipped,
    MissingEnding(String),
    MissingBeginning(String),
    Substituted { expected: char, actual: char },
    ThSubstitution,
    Mispronounced,
}

impl fmt::Display for WordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WordSkipped => f.write_str("word_skipped"),
            Self::MissingEnding(suffix) => write!(f, "missing_ending_{suffix}"),
            Self::MissingBeginning(prefix) => write!(f, "missing_beginning_{prefix}"),
            Self::Substituted { expected, actual } => {
                write!(f, "substituted_{expected}_with_{actual}")
            }
            Self::ThSubstitution => f.write_str("th_substitution"),
            Self::Mispronounced => f.write_str("mispronounced"),
        }
    }
}

impl Serialize for WordIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordDiffEntry {
    pub word: String,
    pub kind: DiffKind,
    /// Index into the expected words, or into the transcribed words for
    /// `Extra` entries.
    pub position: usize,
    pub user_said: Option<String>,
    pub suggestion: Option<String>,
    pub issue: Option<WordIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Match,
    Partial,
    Mismatch,
    Error,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Partial => "partial",
            Self::Mismatch => "mismatch",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HallucinationKind {
    NonAscii,
    RepeatedCharacter,
    RepeatedWord,
    MissingWordBreaks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub transcribed: String,
    pub expected: String,
    pub similarity: f64,
    pub sequence_similarity: f64,
    pub levenshtein_similarity: f64,
    pub word_diff: Vec<WordDiffEntry>,
    pub dtw_comparison: Vec<AlignmentEntry>,
    pub dtw_summary: Option<WordMatchSummary>,
    pub can_proceed: bool,
    pub message: String,
    pub hallucination: Option<HallucinationKind>,
    pub word_timestamps: Vec<WordTimestamp>,
}

impl ValidationResult {
    pub fn missing_words(&self) -> impl Iterator<Item = &WordDiffEntry> {
        self.word_diff.iter().filter(|d| d.kind == DiffKind::Missing)
    }

    pub fn extra_words(&self) -> impl Iterator<Item = &WordDiffEntry> {
        self.word_diff.iter().filter(|d| d.kind == DiffKind::Extra)
    }

    pub fn wrong_words(&self) -> impl Iterator<Item = &WordDiffEntry> {
        self.word_diff.iter().filter(|d| d.kind == DiffKind::Wrong)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhonemeClass {
    Correct,
    Weak,
    Substitution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeClassification {
    pub phoneme: String,
    pub similarity: f64,
    pub class: PhonemeClass,
    pub penalty: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhonemeErrorType {
    Substitution,
    Deletion,
    Insertion,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeErrorRecord {
    pub word: Option<String>,
    pub position: usize,
    /// `None` only for insertions.
    pub expected_phoneme: Option<String>,
    pub actual_phoneme: Option<String>,
    pub error_type: PhonemeErrorType,
    pub similarity: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerResult {
    pub per_score: f64,
    pub adjusted_score: u32,
    pub total_phonemes: usize,
    pub correct_count: usize,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
    pub weak_count: usize,
    pub errors: Vec<PhonemeErrorRecord>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterErrorType {
    Substitution,
    Deletion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetterStatus {
    pub letter: char,
    pub is_correct: bool,
    pub error_type: Option<LetterErrorType>,
    pub expected: char,
    pub actual: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightedWord {
    pub word: String,
    pub actual: Option<String>,
    pub letters: Vec<LetterStatus>,
    pub correct_count: usize,
    pub total_letters: usize,
    pub accuracy: f64,
    pub is_perfect: bool,
    pub error_descriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SentenceHighlight {
    pub words: Vec<HighlightedWord>,
    pub total_correct_letters: usize,
    pub total_letters: usize,
    pub letter_accuracy: f64,
    pub word_count: usize,
    pub perfect_words: usize,
    pub letter_errors_string: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakeKind {
    MissingWord,
    WrongWord,
    MissingSound,
    WrongSound,
    ExtraWord,
    WeakPhoneme,
    Substitution,
}

impl MistakeKind {
    pub fn is_word_level(self) -> bool {
        matches!(self, Self::MissingWord | Self::WrongWord | Self::ExtraWord)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mistake {
    pub kind: MistakeKind,
    pub position: usize,
    pub expected: String,
    pub actual: String,
    pub severity: Severity,
    pub suggestion: String,
    pub phoneme: Option<String>,
    pub word: Option<String>,
    /// Phoneme similarity behind a phoneme-level mistake.
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ErrorCounts {
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
    pub weak_phonemes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Excellent,
    AlmostPerfect,
    Good,
    NeedsWork,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub status: FeedbackStatus,
    pub message: String,
    pub tips: Vec<Mistake>,
}

/// Request handed to a tip generator for one weak phoneme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipRequest {
    pub phoneme: String,
    pub word: String,
    pub similarity: f64,
}

/// PER restricted to the phonemes of a single word.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordScore {
    pub word: String,
    pub per: PerResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MistakeReport {
    pub has_mistakes: bool,
    pub mistakes: Vec<Mistake>,
    pub word_errors: usize,
    pub phoneme_errors: usize,
    pub error_counts: ErrorCounts,
    pub per: PerResult,
    pub per_feedback: Vec<String>,
    pub word_scores: Vec<WordScore>,
    pub letter_accuracy: f64,
    pub letter_highlighting: SentenceHighlight,
    pub specific_errors: Vec<String>,
    pub feedback: Feedback,
    pub summary: String,
    pub blended_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub validation: ValidationResult,
    /// `None` when the gate refused scoring.
    pub report: Option<MistakeReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_issue_renders_tagged_names() {
        assert_eq!(WordIssue::MissingEnding("s".into()).to_string(), "missing_ending_s");
        assert_eq!(
            WordIssue::MissingBeginning("b".into()).to_string(),
            "missing_beginning_b"
        );
        assert_eq!(
            WordIssue::Substituted {
                expected: 'a',
                actual: 'e'
            }
            .to_string(),
            "substituted_a_with_e"
        );
        assert_eq!(WordIssue::ThSubstitution.to_string(), "th_substitution");
    }

    #[test]
    fn word_issue_serializes_as_string() {
        let json = serde_json::to_string(&WordIssue::MissingEnding("es".into())).unwrap();
        assert_eq!(json, "\"missing_ending_es\"");
    }

    #[test]
    fn phoneme_score_deserializes_without_optional_fields() {
        let score: PhonemeScore =
            serde_json::from_str(r#"{"phoneme": "AE1", "similarity": 0.9}"#).unwrap();
        assert_eq!(score.phoneme, "AE1");
        assert!(score.word.is_empty());
    }

    #[test]
    fn severity_orders_minor_to_major() {
        assert!(Severity::Minor < Severity::Moderate);
        assert!(Severity::Moderate < Severity::Major);
    }
}

use crate::alignment::tokenization::tokenize_words;
use crate::alignment::word_matcher::mapped_words;
use crate::config::AssessmentConfig;
use crate::error::AssessmentError;
use crate::pipeline::traits::TipGenerator;
use crate::scoring::letters::highlight_sentence;
use crate::scoring::per::{calculate_per, calculate_word_per, classify_phoneme, per_feedback};
use crate::scoring::tips::resolve_tips;
use crate::types::{
    AssessmentInput, DiffKind, ErrorCounts, Feedback, FeedbackStatus, Mistake, MistakeKind,
    MistakeReport, PhonemeClass, PhonemeScore, SentenceHighlight, Severity, TipRequest,
    ValidationResult, WordDiffEntry, WordIssue, WordScore,
};

const MAX_SPECIFIC_ERRORS: usize = 5;
const MAX_WORD_SUGGESTIONS: usize = 3;
const MAX_FEEDBACK_TIPS: usize = 5;

/// Merges the gate's word diff, phoneme scores and letter highlighting into
/// one report. Holds no state between calls.
pub struct MistakeSynthesizer<'a> {
    config: &'a AssessmentConfig,
    tip_generator: Option<&'a dyn TipGenerator>,
}

impl<'a> MistakeSynthesizer<'a> {
    pub fn new(config: &'a AssessmentConfig, tip_generator: Option<&'a dyn TipGenerator>) -> Self {
        Self {
            config,
            tip_generator,
        }
    }

    pub fn synthesize(
        &self,
        validation: &ValidationResult,
        input: &AssessmentInput,
    ) -> Result<MistakeReport, AssessmentError> {
        let scores = &input.phoneme_scores;
        let scored: Vec<&str> = scores.iter().map(|s| s.phoneme.as_str()).collect();
        let similarities: Vec<f64> = scores.iter().map(|s| s.similarity).collect();
        let reference: Vec<&str> = if input.reference_phonemes.is_empty() {
            scored.clone()
        } else {
            input.reference_phonemes.iter().map(String::as_str).collect()
        };
        let per = calculate_per(&reference, &scored, &similarities, self.config)?;

        let word_mistakes = word_mistakes(&validation.word_diff);
        let (phoneme_mistakes, mut error_counts) = phoneme_mistakes(scores, self.config);
        error_counts.deletions = per.deletions;
        error_counts.insertions = per.insertions;

        let letter_highlighting = if validation.transcribed.trim().is_empty()
            || validation.expected.trim().is_empty()
        {
            SentenceHighlight::default()
        } else {
            let expected = tokenize_words(&validation.expected);
            highlight_sentence(&expected, &mapped_words(&validation.dtw_comparison))
        };
        let letter_accuracy = letter_highlighting.letter_accuracy;

        let specific_errors = specific_errors(&word_mistakes, &phoneme_mistakes, &error_counts);
        let word_errors = word_mistakes.len();
        let phoneme_errors = phoneme_mistakes.len();

        let mut mistakes = word_mistakes;
        mistakes.extend(phoneme_mistakes);
        self.apply_tips(&mut mistakes);

        let blended_score = blended_score(per.adjusted_score, letter_accuracy, word_errors, self.config);
        let word_scores = word_scores(scores, self.config)?;
        let feedback = feedback(&mistakes);
        let summary = summary_line(&mistakes);

        tracing::debug!(
            word_errors,
            phoneme_errors,
            per = per.per_score,
            letter_accuracy,
            blended_score,
            "mistake report synthesized"
        );

        Ok(MistakeReport {
            has_mistakes: !mistakes.is_empty(),
            mistakes,
            word_errors,
            phoneme_errors,
            error_counts,
            per_feedback: per_feedback(&per),
            per,
            word_scores,
            letter_accuracy,
            letter_highlighting,
            specific_errors,
            feedback,
            summary,
            blended_score,
        })
    }

    /// Replaces weak-phoneme suggestions with generated tips.
    fn apply_tips(&self, mistakes: &mut [Mistake]) {
        let weak: Vec<usize> = mistakes
            .iter()
            .enumerate()
            .filter(|(_, m)| m.kind == MistakeKind::WeakPhoneme)
            .map(|(i, _)| i)
            .collect();
        if weak.is_empty() {
            return;
        }

        let requests: Vec<TipRequest> = weak
            .iter()
            .map(|&i| {
                let m = &mistakes[i];
                TipRequest {
                    phoneme: m.phoneme.clone().unwrap_or_else(|| m.expected.clone()),
                    word: m.word.clone().unwrap_or_else(|| "unknown".to_string()),
                    similarity: m.similarity.unwrap_or_default(),
                }
            })
            .collect();
        let tips = resolve_tips(self.tip_generator, &requests);
        for (i, tip) in weak.into_iter().zip(tips) {
            mistakes[i].suggestion = tip;
        }
    }
}

fn word_mistake(
    kind: MistakeKind,
    entry: &WordDiffEntry,
    severity: Severity,
    suggestion: String,
) -> Mistake {
    Mistake {
        kind,
        position: entry.position,
        expected: entry.word.clone(),
        actual: entry.user_said.clone().unwrap_or_default(),
        severity,
        suggestion,
        phoneme: None,
        word: Some(entry.word.clone()),
        similarity: None,
    }
}

fn skipped(entry: &WordDiffEntry) -> Mistake {
    Mistake {
        actual: "(not spoken)".to_string(),
        ..word_mistake(
            MistakeKind::MissingWord,
            entry,
            Severity::Major,
            format!(
                "You skipped the word '{}'. Try saying the complete sentence.",
                entry.word
            ),
        )
    }
}

/// Word-level mistakes, one per non-correct diff entry.
pub fn word_mistakes(word_diff: &[WordDiffEntry]) -> Vec<Mistake> {
    word_diff
        .iter()
        .filter_map(|entry| {
            let want = &entry.word;
            let said = entry.user_said.as_deref().unwrap_or_default();
            let mistake = match entry.kind {
                DiffKind::Correct => return None,
                DiffKind::Missing => skipped(entry),
                DiffKind::Extra => Mistake {
                    expected: "(nothing)".to_string(),
                    word: Some(said.to_string()),
                    ..word_mistake(
                        MistakeKind::ExtraWord,
                        entry,
                        Severity::Minor,
                        format!("You added an extra word '{said}'. Try to match the exact sentence."),
                    )
                },
                DiffKind::Wrong => match entry.issue.as_ref().unwrap_or(&WordIssue::Mispronounced) {
                    WordIssue::WordSkipped => skipped(entry),
                    WordIssue::MissingEnding(missing) => word_mistake(
                        MistakeKind::MissingSound,
                        entry,
                        Severity::Moderate,
                        format!(
                            "You said '{said}' but it should be '{want}'. Don't forget the '{missing}' at the end!"
                        ),
                    ),
                    WordIssue::MissingBeginning(missing) => word_mistake(
                        MistakeKind::MissingSound,
                        entry,
                        Severity::Moderate,
                        format!("You said '{said}' but it should be '{want}'. Start with '{missing}'."),
                    ),
                    WordIssue::Substituted { expected, actual } => word_mistake(
                        MistakeKind::WrongSound,
                        entry,
                        Severity::Minor,
                        format!("In '{want}', you used '{actual}' instead of '{expected}'."),
                    ),
                    WordIssue::ThSubstitution => Mistake {
                        phoneme: Some("TH".to_string()),
                        ..word_mistake(
                            MistakeKind::WrongSound,
                            entry,
                            Severity::Moderate,
                            format!(
                                "In '{want}', the 'TH' sound was pronounced as 'D' or 'T'. Put your tongue between your teeth."
                            ),
                        )
                    },
                    WordIssue::Mispronounced => word_mistake(
                        MistakeKind::WrongWord,
                        entry,
                        Severity::Major,
                        format!("You said '{said}' instead of '{want}'. Practice this word."),
                    ),
                },
            };
            Some(mistake)
        })
        .collect()
}

fn percent(similarity: f64) -> String {
    format!("{:.0}%", similarity * 100.0)
}

/// Phoneme-level mistakes from the similarity list, with weak and
/// substitution counts.
pub fn phoneme_mistakes(
    scores: &[PhonemeScore],
    config: &AssessmentConfig,
) -> (Vec<Mistake>, ErrorCounts) {
    let mut counts = ErrorCounts::default();
    let mut mistakes = Vec::new();

    for (i, score) in scores.iter().enumerate() {
        let phoneme = &score.phoneme;
        let word = (!score.word.is_empty()).then(|| score.word.clone());
        let in_word = word.as_deref().unwrap_or_default();
        let (kind, severity, actual, suggestion) =
            match classify_phoneme(phoneme, score.similarity, config).class {
                PhonemeClass::Correct => continue,
                PhonemeClass::Weak => {
                    counts.weak_phonemes += 1;
                    (
                        MistakeKind::WeakPhoneme,
                        Severity::Minor,
                        format!("(weak: {})", percent(score.similarity)),
                        format!("The '{phoneme}' sound in '{in_word}' needs to be clearer."),
                    )
                }
                PhonemeClass::Substitution => {
                    counts.substitutions += 1;
                    (
                        MistakeKind::Substitution,
                        substitution_severity(score.similarity, config),
                        format!("(wrong: {})", percent(score.similarity)),
                        format!("In '{in_word}': The '{phoneme}' sound was incorrect."),
                    )
                }
            };
        mistakes.push(Mistake {
            kind,
            position: i,
            expected: phoneme.clone(),
            actual,
            severity,
            suggestion,
            phoneme: Some(phoneme.clone()),
            word,
            similarity: Some(score.similarity),
        });
    }

    (mistakes, counts)
}

fn substitution_severity(similarity: f64, config: &AssessmentConfig) -> Severity {
    if similarity < config.severity.major_below {
        Severity::Major
    } else if similarity < config.severity.moderate_below {
        Severity::Moderate
    } else {
        Severity::Minor
    }
}

/// `round(w_per * adjusted + w_letter * letter_accuracy)` less the per-word
/// penalty, kept within `[0, 100]`.
pub fn blended_score(
    per_adjusted: u32,
    letter_accuracy: f64,
    word_mistakes: usize,
    config: &AssessmentConfig,
) -> u32 {
    let blended = (config.blend.per * f64::from(per_adjusted)
        + config.blend.letter_accuracy * letter_accuracy)
        .round()
        .clamp(0.0, 100.0) as u64;
    let penalty = word_mistakes as u64 * u64::from(config.word_mistake_penalty);
    blended.saturating_sub(penalty) as u32
}

/// Up to five learner-facing sentences, most important first.
pub fn specific_errors(
    word_mistakes: &[Mistake],
    phoneme_mistakes: &[Mistake],
    counts: &ErrorCounts,
) -> Vec<String> {
    let mut errors = Vec::new();

    let missing: Vec<&str> = word_mistakes
        .iter()
        .filter(|m| m.kind == MistakeKind::MissingWord)
        .map(|m| m.expected.as_str())
        .collect();
    match missing.as_slice() {
        [] => {}
        [word] => errors.push(format!("You missed the word '{word}'.")),
        words => errors.push(format!(
            "You missed {} words: {}.",
            words.len(),
            words.join(", ")
        )),
    }

    errors.extend(
        word_mistakes
            .iter()
            .filter(|m| matches!(m.kind, MistakeKind::WrongWord | MistakeKind::MissingSound))
            .take(MAX_WORD_SUGGESTIONS)
            .map(|m| m.suggestion.clone()),
    );

    let first_of = |kind: MistakeKind| phoneme_mistakes.iter().find(|m| m.kind == kind);
    let label = |m: &Mistake| m.phoneme.clone().unwrap_or_else(|| m.expected.clone());

    match counts.substitutions {
        0 => {}
        1 => {
            if let Some(m) = first_of(MistakeKind::Substitution) {
                errors.push(format!(
                    "You mispronounced the '{}' sound in '{}'.",
                    label(m),
                    m.word.as_deref().unwrap_or_default()
                ));
            }
        }
        n => errors.push(format!("You mispronounced {n} phonemes.")),
    }

    if errors.len() < MAX_SPECIFIC_ERRORS {
        match counts.weak_phonemes {
            0 => {}
            1 => {
                if let Some(m) = first_of(MistakeKind::WeakPhoneme) {
                    errors.push(format!("The '{}' sound needs to be clearer.", label(m)));
                }
            }
            n => errors.push(format!("{n} phonemes need to be clearer.")),
        }
    }

    errors.truncate(MAX_SPECIFIC_ERRORS);
    errors
}

/// Overall verdict from the worst severity present, plus the top tips.
pub fn feedback(mistakes: &[Mistake]) -> Feedback {
    let count = |severity: Severity| mistakes.iter().filter(|m| m.severity == severity).count();
    let (major, moderate, minor) = (
        count(Severity::Major),
        count(Severity::Moderate),
        count(Severity::Minor),
    );

    let (status, message) = if mistakes.is_empty() {
        (
            FeedbackStatus::Excellent,
            "Great job! You pronounced everything correctly!".to_string(),
        )
    } else if major > 0 {
        (
            FeedbackStatus::NeedsWork,
            format!("Found {major} significant issue(s). Let's work on them!"),
        )
    } else if moderate > 0 {
        (
            FeedbackStatus::Good,
            format!("Good attempt! Just {moderate} thing(s) to improve."),
        )
    } else {
        (
            FeedbackStatus::AlmostPerfect,
            format!("Almost perfect! Just {minor} minor detail(s)."),
        )
    };

    let tips = [Severity::Major, Severity::Moderate, Severity::Minor]
        .into_iter()
        .flat_map(|severity| mistakes.iter().filter(move |m| m.severity == severity))
        .take(MAX_FEEDBACK_TIPS)
        .cloned()
        .collect();

    Feedback {
        status,
        message,
        tips,
    }
}

pub fn summary_line(mistakes: &[Mistake]) -> String {
    if mistakes.is_empty() {
        return "Perfect pronunciation!".to_string();
    }
    let words = mistakes.iter().filter(|m| m.kind.is_word_level()).count();
    let sounds = mistakes.len() - words;

    let mut parts = Vec::with_capacity(2);
    if words > 0 {
        parts.push(format!("{words} word(s)"));
    }
    if sounds > 0 {
        parts.push(format!("{sounds} sound(s)"));
    }
    format!("Work on: {}", parts.join(", "))
}

/// PER per word, grouping consecutive scores that carry the same word.
pub fn word_scores(
    scores: &[PhonemeScore],
    config: &AssessmentConfig,
) -> Result<Vec<WordScore>, AssessmentError> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < scores.len() {
        let word = &scores[start].word;
        let end = scores[start..]
            .iter()
            .position(|s| s.word != *word)
            .map_or(scores.len(), |offset| start + offset);
        if !word.is_empty() {
            let group = &scores[start..end];
            let phonemes: Vec<&str> = group.iter().map(|s| s.phoneme.as_str()).collect();
            let similarities: Vec<f64> = group.iter().map(|s| s.similarity).collect();
            out.push(WordScore {
                word: word.clone(),
                per: calculate_word_per(word, &phonemes, &phonemes, &similarities, config)?,
            });
        }
        start = end;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::word_diff::word_diff;
    use crate::pipeline::defaults::DtwWordAligner;
    use crate::types::Transcription;
    use crate::validation::gate::validate_speech;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn score(phoneme: &str, similarity: f64, word: &str) -> PhonemeScore {
        PhonemeScore {
            phoneme: phoneme.into(),
            similarity,
            word: word.into(),
            position: String::new(),
        }
    }

    fn input(text: &str, expected: &str, scores: Vec<PhonemeScore>) -> AssessmentInput {
        AssessmentInput {
            transcription: Transcription::from_text(text),
            expected_text: expected.into(),
            reference_phonemes: Vec::new(),
            phoneme_scores: scores,
        }
    }

    fn run(input: &AssessmentInput) -> MistakeReport {
        let config = AssessmentConfig::default();
        let validation =
            validate_speech(&input.transcription, &input.expected_text, &config, &DtwWordAligner)
                .unwrap();
        MistakeSynthesizer::new(&config, None)
            .synthesize(&validation, input)
            .unwrap()
    }

    #[test]
    fn word_mistakes_cover_each_issue() {
        let diff = word_diff(
            &words("she sell ook cat dat zzz"),
            &words("she sells book bat that hello"),
        );
        let mistakes = word_mistakes(&diff);
        let kinds: Vec<MistakeKind> = mistakes.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MistakeKind::MissingSound,
                MistakeKind::MissingSound,
                MistakeKind::WrongSound,
                MistakeKind::WrongSound,
                MistakeKind::WrongWord,
            ]
        );
        assert_eq!(
            mistakes[0].suggestion,
            "You said 'sell' but it should be 'sells'. Don't forget the 's' at the end!"
        );
        assert_eq!(mistakes[1].suggestion, "You said 'ook' but it should be 'book'. Start with 'b'.");
        assert_eq!(mistakes[2].suggestion, "In 'bat', you used 'c' instead of 'b'.");
        assert_eq!(mistakes[3].phoneme.as_deref(), Some("TH"));
        assert_eq!(mistakes[4].severity, Severity::Major);
    }

    #[test]
    fn missing_and_extra_words() {
        let missing = word_mistakes(&word_diff(&words("the sat"), &words("the cat sat")));
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].kind, MistakeKind::MissingWord);
        assert_eq!(missing[0].actual, "(not spoken)");
        assert_eq!(missing[0].severity, Severity::Major);

        let extra = word_mistakes(&word_diff(&words("the big cat"), &words("the cat")));
        assert_eq!(extra[0].kind, MistakeKind::ExtraWord);
        assert_eq!(extra[0].expected, "(nothing)");
        assert_eq!(
            extra[0].suggestion,
            "You added an extra word 'big'. Try to match the exact sentence."
        );
    }

    #[test]
    fn replaced_span_counts_each_expected_word_once() {
        let config = AssessmentConfig::default();
        let mistakes = word_mistakes(&word_diff(&words("the dog bird sat"), &words("the cat sat")));
        assert_eq!(mistakes.len(), 1);
        assert_eq!(mistakes[0].kind, MistakeKind::WrongWord);
        assert!(mistakes.iter().all(|m| m.kind != MistakeKind::ExtraWord));
        assert_eq!(blended_score(100, 100.0, mistakes.len(), &config), 95);
    }

    #[test]
    fn substitutions_are_summarised_as_sounds() {
        let config = AssessmentConfig::default();
        let (phonemes, _) =
            phoneme_mistakes(&[score("S", 0.2, "sat"), score("T", 0.4, "sat")], &config);
        assert!(phonemes.iter().all(|m| m.kind == MistakeKind::Substitution));
        assert_eq!(summary_line(&phonemes), "Work on: 2 sound(s)");

        let in_words = word_mistakes(&word_diff(&words("bat dat"), &words("cat that")));
        assert!(in_words.iter().all(|m| m.kind == MistakeKind::WrongSound));
        assert_eq!(summary_line(&in_words), "Work on: 2 sound(s)");

        let mut mixed = in_words;
        mixed.extend(word_mistakes(&word_diff(&words("the sat"), &words("the cat sat"))));
        assert_eq!(summary_line(&mixed), "Work on: 1 word(s), 2 sound(s)");
    }

    #[test]
    fn phoneme_mistakes_grade_substitutions() {
        let config = AssessmentConfig::default();
        let scores = vec![
            score("TH", 0.9, "think"),
            score("IH", 0.7, "think"),
            score("NG", 0.2, "think"),
            score("K", 0.4, "think"),
            score("S", 0.55, "so"),
        ];
        let (mistakes, counts) = phoneme_mistakes(&scores, &config);
        assert_eq!(counts.weak_phonemes, 1);
        assert_eq!(counts.substitutions, 3);
        let severities: Vec<Severity> = mistakes.iter().map(|m| m.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Minor, Severity::Major, Severity::Moderate, Severity::Minor]
        );
        assert_eq!(mistakes[0].actual, "(weak: 70%)");
        assert_eq!(mistakes[1].actual, "(wrong: 20%)");
        assert_eq!(mistakes[1].suggestion, "In 'think': The 'NG' sound was incorrect.");
        assert_eq!(mistakes[1].position, 2);
    }

    #[test]
    fn blended_score_subtracts_word_penalty() {
        let config = AssessmentConfig::default();
        assert_eq!(blended_score(100, 100.0, 0, &config), 100);
        assert_eq!(blended_score(95, 80.0, 1, &config), 81);
        assert_eq!(blended_score(0, 0.0, 3, &config), 0);
    }

    #[test]
    fn perfect_attempt_report() {
        let report = run(&input(
            "the cat",
            "the cat",
            vec![
                score("DH", 0.95, "the"),
                score("AH", 0.9, "the"),
                score("K", 0.92, "cat"),
                score("AE", 0.88, "cat"),
                score("T", 0.97, "cat"),
            ],
        ));
        assert!(!report.has_mistakes);
        assert_eq!(report.summary, "Perfect pronunciation!");
        assert_eq!(report.feedback.status, FeedbackStatus::Excellent);
        assert_eq!(report.blended_score, 100);
        assert_eq!(report.letter_accuracy, 100.0);
        assert_eq!(report.word_scores.len(), 2);
        assert!(report.specific_errors.is_empty());
    }

    #[test]
    fn missing_ending_report() {
        let report = run(&input(
            "she sell seashells",
            "she sells seashells",
            vec![score("SH", 0.9, "she"), score("IY", 0.7, "she")],
        ));
        assert_eq!(report.word_errors, 1);
        assert_eq!(report.phoneme_errors, 1);
        assert_eq!(report.summary, "Work on: 2 sound(s)");
        assert_eq!(report.feedback.status, FeedbackStatus::Good);
        assert_eq!(
            report.specific_errors,
            vec![
                "You said 'sell' but it should be 'sells'. Don't forget the 's' at the end!"
                    .to_string(),
                "The 'IY' sound needs to be clearer.".to_string(),
            ]
        );
        let weak = report
            .mistakes
            .iter()
            .find(|m| m.kind == MistakeKind::WeakPhoneme)
            .unwrap();
        assert_eq!(weak.suggestion, "Practice the 'IY' sound more carefully.");
        assert_eq!(report.letter_highlighting.letter_errors_string, "111 11110 111111111");
    }

    #[test]
    fn feedback_orders_tips_by_severity() {
        let diff = word_diff(&words("the big"), &words("the cat sat"));
        let mut mistakes = word_mistakes(&diff);
        let (phonemes, _) = phoneme_mistakes(&[score("S", 0.7, "sat")], &AssessmentConfig::default());
        mistakes.extend(phonemes);
        let feedback = feedback(&mistakes);
        assert_eq!(feedback.status, FeedbackStatus::NeedsWork);
        assert!(feedback
            .tips
            .windows(2)
            .all(|pair| pair[0].severity >= pair[1].severity));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let case = input(
            "she sell sea shells",
            "she sells seashells",
            vec![
                score("SH", 0.5, "she"),
                score("IY", 0.7, "she"),
                score("S", 0.2, "sells"),
                score("EH", 0.65, "sells"),
            ],
        );
        let first = run(&case);
        let second = run(&case);
        assert_eq!(first.blended_score, second.blended_score);
        assert_eq!(first.specific_errors, second.specific_errors);
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_similarity_is_an_error() {
        let case = input("the cat", "the cat", vec![score("DH", f64::NAN, "the")]);
        let config = AssessmentConfig::default();
        let validation =
            validate_speech(&case.transcription, &case.expected_text, &config, &DtwWordAligner)
                .unwrap();
        let result = MistakeSynthesizer::new(&config, None).synthesize(&validation, &case);
        assert!(matches!(result, Err(AssessmentError::InvalidInput { .. })));
    }
}

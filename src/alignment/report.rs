use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;
use crate::types::{Assessment, AssessmentInput, ValidationStatus};

const OUTLIER_TOP_N: usize = 20;

/// One labelled input of a batch run, optionally carrying the outcome it is
/// expected to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluationCase {
    pub id: String,
    #[serde(flatten)]
    pub input: AssessmentInput,
    #[serde(default)]
    pub expect: Option<CaseExpectation>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CaseExpectation {
    pub status: Option<ValidationStatus>,
    pub blended_score: Option<u32>,
    pub per_score: Option<f64>,
    pub missing_words: Option<Vec<String>>,
    pub extra_words: Option<Vec<String>>,
}

pub fn load_cases(path: &Path) -> Result<Vec<EvaluationCase>, AssessmentError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AssessmentError::io("read evaluation cases", e))?;
    serde_json::from_str(&data).map_err(|e| AssessmentError::json("parse evaluation cases", e))
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub meta: Meta,
    pub cases: Vec<CaseReport>,
    pub aggregates: AggregateReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub cases_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    pub aligner: String,
    pub case_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub id: String,
    pub status: ValidationStatus,
    pub can_proceed: bool,
    pub similarity: f64,
    pub hallucination: bool,
    pub word_count_expected: u32,
    pub word_count_transcribed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<CaseScores>,
    /// `None` when the case carried no expectation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation_met: Option<bool>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseScores {
    pub blended_score: u32,
    pub per_score: f64,
    pub per_adjusted: u32,
    pub letter_accuracy: f64,
    pub word_errors: u32,
    pub phoneme_errors: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub counts: AggregateCounts,
    pub metrics: AggregateMetrics,
    pub outliers: OutlierReport,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AggregateCounts {
    pub total: u32,
    pub scored: u32,
    pub rejected: u32,
    pub matched: u32,
    pub partial: u32,
    pub mismatch: u32,
    pub error: u32,
    pub hallucinations: u32,
    pub with_expectation: u32,
    pub expectation_failures: u32,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AggregateMetrics {
    pub similarity: Option<MetricDistribution>,
    pub blended_score: Option<MetricDistribution>,
    pub per_score: Option<MetricDistribution>,
    pub letter_accuracy: Option<MetricDistribution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    pub mean: f32,
    pub p50: f32,
    pub p90: f32,
    pub p95: f32,
    pub p99: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub lowest_blended_score: Vec<OutlierEntry>,
    pub highest_per_score: Vec<OutlierEntry>,
    pub lowest_similarity: Vec<OutlierEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierEntry {
    pub id: String,
    pub status: ValidationStatus,
    pub value: f32,
}

pub fn compute_case_report(case: &EvaluationCase, assessment: &Assessment) -> CaseReport {
    let validation = &assessment.validation;
    let scores = assessment.report.as_ref().map(|report| CaseScores {
        blended_score: report.blended_score,
        per_score: report.per.per_score,
        per_adjusted: report.per.adjusted_score,
        letter_accuracy: report.letter_accuracy,
        word_errors: to_u32(report.word_errors),
        phoneme_errors: to_u32(report.phoneme_errors),
    });

    let mut notes = Vec::new();
    if let Some(kind) = validation.hallucination {
        notes.push(format!("transcription flagged as hallucinated ({kind:?})"));
    }
    let expectation_met = case
        .expect
        .as_ref()
        .map(|expect| check_expectation(expect, assessment, &mut notes));

    CaseReport {
        id: case.id.clone(),
        status: validation.status,
        can_proceed: validation.can_proceed,
        similarity: validation.similarity,
        hallucination: validation.hallucination.is_some(),
        word_count_expected: to_u32(
            validation
                .dtw_comparison
                .iter()
                .filter(|entry| entry.position.is_some())
                .count(),
        ),
        word_count_transcribed: to_u32(validation.transcribed.split_whitespace().count()),
        scores,
        expectation_met,
        notes,
    }
}

/// Appends one note per unmet expectation and reports whether all held.
fn check_expectation(
    expect: &CaseExpectation,
    assessment: &Assessment,
    notes: &mut Vec<String>,
) -> bool {
    let before = notes.len();
    let validation = &assessment.validation;
    let report = assessment.report.as_ref();

    if let Some(status) = expect.status {
        if status != validation.status {
            notes.push(format!(
                "status: expected {}, got {}",
                status.as_str(),
                validation.status.as_str()
            ));
        }
    }
    if let Some(score) = expect.blended_score {
        match report.map(|r| r.blended_score) {
            Some(actual) if actual == score => {}
            actual => notes.push(format!("blended_score: expected {score}, got {actual:?}")),
        }
    }
    if let Some(per) = expect.per_score {
        match report.map(|r| r.per.per_score) {
            Some(actual) if (actual - per).abs() < 1e-9 => {}
            actual => notes.push(format!("per_score: expected {per}, got {actual:?}")),
        }
    }
    if let Some(words) = &expect.missing_words {
        let actual: Vec<&str> = validation.missing_words().map(|d| d.word.as_str()).collect();
        if actual != *words {
            notes.push(format!("missing_words: expected {words:?}, got {actual:?}"));
        }
    }
    if let Some(words) = &expect.extra_words {
        let actual: Vec<&str> = validation.extra_words().map(|d| d.word.as_str()).collect();
        if actual != *words {
            notes.push(format!("extra_words: expected {words:?}, got {actual:?}"));
        }
    }

    notes.len() == before
}

pub fn aggregate_reports(cases: &[CaseReport]) -> AggregateReport {
    let mut counts = AggregateCounts {
        total: to_u32(cases.len()),
        ..AggregateCounts::default()
    };
    for case in cases {
        if case.scores.is_some() {
            counts.scored += 1;
        } else {
            counts.rejected += 1;
        }
        match case.status {
            ValidationStatus::Match => counts.matched += 1,
            ValidationStatus::Partial => counts.partial += 1,
            ValidationStatus::Mismatch => counts.mismatch += 1,
            ValidationStatus::Error => counts.error += 1,
        }
        if case.hallucination {
            counts.hallucinations += 1;
        }
        if let Some(met) = case.expectation_met {
            counts.with_expectation += 1;
            if !met {
                counts.expectation_failures += 1;
            }
        }
    }

    let scores: Vec<(&CaseReport, &CaseScores)> = cases
        .iter()
        .filter_map(|case| case.scores.as_ref().map(|s| (case, s)))
        .collect();
    let similarities: Vec<f64> = cases.iter().map(|case| case.similarity).collect();
    let metric = |f: fn(&CaseScores) -> f64| -> Vec<f64> { scores.iter().map(|(_, s)| f(s)).collect() };
    let metrics = AggregateMetrics {
        similarity: distribution_or_none(&similarities),
        blended_score: distribution_or_none(&metric(|s| f64::from(s.blended_score))),
        per_score: distribution_or_none(&metric(|s| s.per_score)),
        letter_accuracy: distribution_or_none(&metric(|s| s.letter_accuracy)),
    };

    AggregateReport {
        counts,
        metrics,
        outliers: build_outliers(cases, OUTLIER_TOP_N),
    }
}

fn build_outliers(cases: &[CaseReport], top_n: usize) -> OutlierReport {
    OutlierReport {
        lowest_blended_score: ranked_outliers(cases, top_n, false, |case| {
            case.scores.as_ref().map(|s| f64::from(s.blended_score))
        }),
        highest_per_score: ranked_outliers(cases, top_n, true, |case| {
            case.scores.as_ref().map(|s| s.per_score)
        }),
        lowest_similarity: ranked_outliers(cases, top_n, false, |case| Some(case.similarity)),
    }
}

fn ranked_outliers(
    cases: &[CaseReport],
    top_n: usize,
    highest_first: bool,
    metric: impl Fn(&CaseReport) -> Option<f64>,
) -> Vec<OutlierEntry> {
    let mut entries: Vec<OutlierEntry> = cases
        .iter()
        .filter_map(|case| {
            metric(case).map(|value| OutlierEntry {
                id: case.id.clone(),
                status: case.status,
                value: value as f32,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        let by_value = a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal);
        let by_value = if highest_first { by_value.reverse() } else { by_value };
        by_value.then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(top_n);
    entries
}

fn distribution_or_none(values: &[f64]) -> Option<MetricDistribution> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    Some(MetricDistribution {
        mean: mean(&sorted) as f32,
        p50: percentile_sorted(&sorted, 0.5) as f32,
        p90: percentile_sorted(&sorted, 0.9) as f32,
        p95: percentile_sorted(&sorted, 0.95) as f32,
        p99: percentile_sorted(&sorted, 0.99) as f32,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Linear interpolation between closest ranks.
fn percentile_sorted(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    if sorted_values.len() == 1 {
        return sorted_values[0];
    }

    let clamped = percentile.clamp(0.0, 1.0);
    let max_index = (sorted_values.len() - 1) as f64;
    let rank = clamped * max_index;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = rank - lower as f64;
        sorted_values[lower] * (1.0 - weight) + sorted_values[upper] * weight
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

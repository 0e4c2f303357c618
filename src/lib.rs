pub mod alignment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod types;
pub mod validation;

pub use alignment::report::{
    aggregate_reports, compute_case_report, load_cases, AggregateReport, CaseReport,
    EvaluationCase, Meta, Report,
};
pub use config::AssessmentConfig;
pub use error::AssessmentError;
pub use pipeline::builder::AssessorBuilder;
pub use pipeline::runtime::Assessor;
pub use pipeline::traits::{AlignerKind, TipGenerator, WordAligner};
pub use types::{
    Assessment, AssessmentInput, MistakeReport, PhonemeScore, Transcription, ValidationResult,
    ValidationStatus,
};

use crate::error::AssessmentError;
use crate::types::TipRequest;

/// Which built-in word-alignment strategy an `Assessor` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignerKind {
    #[default]
    Dtw,
    Greedy,
}

/// Maps transcribed words onto reference words.
///
/// The result has one slot per transcribed word holding the index of the
/// reference word it aligns to, or `None` when it aligns to nothing.
pub trait WordAligner: Send + Sync {
    fn align(
        &self,
        transcribed: &[String],
        reference: &[String],
    ) -> Result<Vec<Option<usize>>, AssessmentError>;

    fn name(&self) -> &'static str;
}

/// Produces one short coaching tip per weak phoneme.
///
/// Implementations may call out to a remote model. A failure, or a result of
/// the wrong length, makes the caller fall back to the static tip table; the
/// generator is never retried.
pub trait TipGenerator: Send + Sync {
    fn generate(&self, requests: &[TipRequest]) -> Result<Vec<String>, AssessmentError>;
}

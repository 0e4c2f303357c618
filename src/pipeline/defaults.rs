use crate::alignment::word_matcher::{dtw_mapping, greedy_mapping};
use crate::error::AssessmentError;
use crate::pipeline::traits::{TipGenerator, WordAligner};
use crate::scoring::tips::fallback_tip;
use crate::types::TipRequest;

/// Optimal alignment via DTW over word edit distances. Falls back to the
/// greedy strategy when the warping path cannot be computed.
pub struct DtwWordAligner;

impl WordAligner for DtwWordAligner {
    fn align(
        &self,
        transcribed: &[String],
        reference: &[String],
    ) -> Result<Vec<Option<usize>>, AssessmentError> {
        Ok(or_greedy(dtw_mapping(transcribed, reference), transcribed, reference))
    }

    fn name(&self) -> &'static str {
        "dtw"
    }
}

fn or_greedy(
    dtw: Result<Vec<Option<usize>>, AssessmentError>,
    transcribed: &[String],
    reference: &[String],
) -> Vec<Option<usize>> {
    dtw.unwrap_or_else(|err| {
        tracing::warn!(
            error = %err,
            transcribed_words = transcribed.len(),
            reference_words = reference.len(),
            "dtw word alignment failed, using greedy alignment"
        );
        greedy_mapping(transcribed, reference)
    })
}

pub struct GreedyWordAligner;

impl WordAligner for GreedyWordAligner {
    fn align(
        &self,
        transcribed: &[String],
        reference: &[String],
    ) -> Result<Vec<Option<usize>>, AssessmentError> {
        Ok(greedy_mapping(transcribed, reference))
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}

/// Tips from the built-in phoneme table only.
pub struct StaticTipGenerator;

impl TipGenerator for StaticTipGenerator {
    fn generate(&self, requests: &[TipRequest]) -> Result<Vec<String>, AssessmentError> {
        Ok(requests.iter().map(|r| fallback_tip(&r.phoneme)).collect())
    }
}

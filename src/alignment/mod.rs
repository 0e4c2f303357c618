pub mod dtw;
pub mod edit_distance;
pub mod report;
pub mod sequence_matcher;
pub mod tokenization;
pub mod word_diff;
pub mod word_matcher;

/// Rounds half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

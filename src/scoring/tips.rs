use crate::alignment::tokenization::base_phoneme;
use crate::pipeline::traits::TipGenerator;
use crate::types::TipRequest;

const TIP_TABLE: &[(&str, &str)] = &[
    ("TH", "Put your tongue between your teeth and blow air."),
    ("DH", "Put tongue between teeth, add voice for 'TH' in 'the'."),
    ("R", "Curl your tongue back slightly."),
    ("L", "Touch tongue tip to the roof of your mouth."),
    ("SH", "Round your lips and push air through."),
    ("CH", "Start with tongue at roof, release with 'SH'."),
    ("S", "Keep tongue behind teeth for a clear 'S'."),
    ("Z", "Add voice to the 'S' sound."),
    ("NG", "Sound comes from back of throat."),
    ("W", "Round your lips like saying 'oo'."),
    ("Y", "Touch tongue to roof, slide to the next sound."),
    ("V", "Touch upper teeth to lower lip, add voice."),
    ("F", "Touch upper teeth to lower lip, blow air."),
];

/// Built-in articulation tip keyed by the phoneme without its stress digit.
pub fn fallback_tip(phoneme: &str) -> String {
    let base = base_phoneme(phoneme);
    TIP_TABLE
        .iter()
        .find(|(key, _)| *key == base)
        .map(|(_, tip)| (*tip).to_string())
        .unwrap_or_else(|| format!("Practice the '{phoneme}' sound more carefully."))
}

/// One tip per request. The generator's answer is used only when it succeeds
/// with exactly one tip per request; otherwise every tip comes from the table.
pub fn resolve_tips(generator: Option<&dyn TipGenerator>, requests: &[TipRequest]) -> Vec<String> {
    if requests.is_empty() {
        return Vec::new();
    }
    let fallback = || -> Vec<String> { requests.iter().map(|r| fallback_tip(&r.phoneme)).collect() };

    let Some(generator) = generator else {
        return fallback();
    };
    match generator.generate(requests) {
        Ok(tips) if tips.len() == requests.len() => tips,
        Ok(tips) => {
            tracing::warn!(
                expected = requests.len(),
                received = tips.len(),
                "tip generator returned the wrong number of tips, using fallback table"
            );
            fallback()
        }
        Err(err) => {
            tracing::warn!(error = %err, "tip generation failed, using fallback table");
            fallback()
        }
    }
}

//! Softmax over classifier logits and the per-tick text/JSON views.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::classification::domain::class_scores::ClassScores;
use crate::classification::domain::emotion_label::{EmotionLabel, LABELS, LABEL_COUNT};

/// Normalized scores, one per label in `LABELS` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Probabilities([f32; LABEL_COUNT]);

impl Probabilities {
    pub fn values(&self) -> &[f32; LABEL_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f32)> + '_ {
        LABELS.iter().copied().zip(self.0.iter().copied())
    }

    /// Highest-probability label; the first one wins ties.
    pub fn dominant(&self) -> (EmotionLabel, f32) {
        self.iter()
            .fold((LABELS[0], f32::NEG_INFINITY), |best, (label, p)| {
                if p > best.1 {
                    (label, p)
                } else {
                    best
                }
            })
    }
}

/// `exp(s_i) / Σ exp(s_j)`.
///
/// The maximum logit is not subtracted first, so logits above ~88
/// overflow `f32` and yield NaN/zero probabilities.
pub fn softmax(scores: &ClassScores) -> Probabilities {
    let exps = scores.values().map(f32::exp);
    let sum: f32 = exps.iter().sum();
    Probabilities(exps.map(|e| e / sum))
}

/// One `label: probability` line per class, no trailing newline.
pub fn render_text(probabilities: &Probabilities) -> String {
    probabilities
        .iter()
        .map(|(label, p)| format!("{label:<12}: {p:.2}"))
        .collect::<Vec<_>>()
        .join("\n")
}

struct LabelledProbabilities<'a>(&'a Probabilities);

impl Serialize for LabelledProbabilities<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LABEL_COUNT))?;
        for (label, p) in self.0.iter() {
            map.serialize_entry(label.as_str(), &p)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct ProbabilityLine<'a> {
    frame: usize,
    probabilities: LabelledProbabilities<'a>,
}

/// Single-line JSON object keyed by label, in label order.
pub fn render_json(frame: usize, probabilities: &Probabilities) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ProbabilityLine {
        frame,
        probabilities: LabelledProbabilities(probabilities),
    })
}

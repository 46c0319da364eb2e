use super::emotion_label::{EmotionLabel, LABELS, LABEL_COUNT};

/// Raw classifier logits, one per label in `LABELS` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassScores([f32; LABEL_COUNT]);

impl ClassScores {
    pub fn new(scores: [f32; LABEL_COUNT]) -> Self {
        Self(scores)
    }

    /// `None` unless exactly eight values are given.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let scores: [f32; LABEL_COUNT] = values.try_into().ok()?;
        Some(Self(scores))
    }

    pub fn values(&self) -> &[f32; LABEL_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f32)> + '_ {
        LABELS.iter().copied().zip(self.0.iter().copied())
    }
}

use std::fmt;

/// The eight FER+ emotion classes, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Neutral,
    Happiness,
    Surprise,
    Sadness,
    Anger,
    Disgust,
    Fear,
    Contempt,
}

pub const LABEL_COUNT: usize = 8;

/// Positional pairing with the classifier's output vector.
pub const LABELS: [EmotionLabel; LABEL_COUNT] = [
    EmotionLabel::Neutral,
    EmotionLabel::Happiness,
    EmotionLabel::Surprise,
    EmotionLabel::Sadness,
    EmotionLabel::Anger,
    EmotionLabel::Disgust,
    EmotionLabel::Fear,
    EmotionLabel::Contempt,
];

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "Neutral",
            Self::Happiness => "Happiness",
            Self::Surprise => "Surprise",
            Self::Sadness => "Sadness",
            Self::Anger => "Anger",
            Self::Disgust => "Disgust",
            Self::Fear => "Fear",
            Self::Contempt => "Contempt",
        }
    }
}

impl fmt::Display for EmotionLabel {
    // `pad` so width/alignment specifiers like `{:<12}` apply.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

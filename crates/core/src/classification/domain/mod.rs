pub mod class_scores;
pub mod emotion_classifier;
pub mod emotion_label;

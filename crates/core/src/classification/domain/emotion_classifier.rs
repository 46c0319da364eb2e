use crate::classification::domain::class_scores::ClassScores;
use crate::preprocessing::domain::input_tensor::InputTensor;

/// Domain interface for scoring a preprocessed face.
///
/// `&mut self`: one inference session is owned for the process lifetime
/// and calls never overlap.
pub trait EmotionClassifier: Send {
    fn infer(&mut self, tensor: &InputTensor) -> Result<ClassScores, Box<dyn std::error::Error>>;
}

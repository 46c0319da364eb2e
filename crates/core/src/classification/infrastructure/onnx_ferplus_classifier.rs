use std::path::{Path, PathBuf};

use ndarray::Array4;
use thiserror::Error;

use crate::classification::domain::class_scores::ClassScores;
use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::preprocessing::domain::input_tensor::InputTensor;
use crate::shared::constants::TENSOR_SIZE;
use crate::classification::domain::emotion_label::LABEL_COUNT;
use crate::shared::onnx_session::{first_input_shape, first_output_shape, load_session};

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("failed to load emotion model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },
    #[error("emotion model input shape {0:?} is not a 64x64 single-channel tensor")]
    InputShape(Vec<i64>),
    #[error("emotion model produced {0} scores, expected 8")]
    OutputShape(usize),
    #[error("emotion model output shape {0:?} cannot hold 8 scores")]
    DeclaredOutputShape(Vec<i64>),
    #[error("emotion model declares no outputs")]
    MissingOutput,
    #[error("emotion inference failed: {0}")]
    Inference(String),
}

/// Memory layout the model declares for its single-channel input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputLayout {
    /// `[1, 1, 64, 64]`
    Nchw,
    /// `[1, 64, 64, 1]`
    Nhwc,
}

impl InputLayout {
    fn dims(&self) -> [i64; 4] {
        let s = TENSOR_SIZE as i64;
        match self {
            Self::Nchw => [1, 1, s, s],
            Self::Nhwc => [1, s, s, 1],
        }
    }

    /// Match a declared shape; negative dims are dynamic and match anything.
    /// NCHW wins when both would match.
    pub fn detect(shape: &[i64]) -> Result<Self, ClassifierError> {
        let fits = |layout: InputLayout| {
            shape.len() == 4
                && shape
                    .iter()
                    .zip(layout.dims())
                    .skip(1)
                    .all(|(&got, want)| got < 0 || got == want)
        };
        [Self::Nchw, Self::Nhwc]
            .into_iter()
            .find(|&layout| fits(layout))
            .ok_or_else(|| ClassifierError::InputShape(shape.to_vec()))
    }
}

/// FER+ emotion classifier using ONNX Runtime via `ort`.
///
/// Expects raw 0..255 grayscale intensities and returns the eight
/// unnormalized logits.
pub struct OnnxFerPlusClassifier {
    session: ort::session::Session,
    layout: InputLayout,
}

impl OnnxFerPlusClassifier {
    pub fn new(model_path: &Path) -> Result<Self, ClassifierError> {
        let session = load_session(model_path).map_err(|e| ClassifierError::ModelLoad {
            path: model_path.to_path_buf(),
            message: e.to_string(),
        })?;

        // Models without a readable tensor input are assumed to be NCHW.
        let layout = match first_input_shape(&session) {
            Some(shape) => InputLayout::detect(&shape)?,
            None => InputLayout::Nchw,
        };

        if session.outputs().is_empty() {
            return Err(ClassifierError::MissingOutput);
        }
        if let Some(shape) = first_output_shape(&session) {
            validate_output_shape(&shape)?;
        }

        log::info!(
            "Loaded emotion model {} ({layout:?} input)",
            model_path.display()
        );

        Ok(Self { session, layout })
    }
}

fn shape_input(tensor: &InputTensor, layout: InputLayout) -> Result<Array4<f32>, ClassifierError> {
    let array = tensor.clone().into_array();
    match layout {
        InputLayout::Nhwc => Ok(array),
        InputLayout::Nchw => array
            .into_shape_with_order((1, 1, TENSOR_SIZE, TENSOR_SIZE))
            .map_err(|e| ClassifierError::Inference(e.to_string())),
    }
}

/// Static dims must multiply to 8; with dynamic dims they must divide it.
fn validate_output_shape(shape: &[i64]) -> Result<(), ClassifierError> {
    let known: i64 = shape.iter().filter(|&&d| d >= 0).product();
    let dynamic = shape.iter().any(|&d| d < 0);
    let labels = LABEL_COUNT as i64;
    let fits = if dynamic {
        known > 0 && labels % known == 0
    } else {
        known == labels
    };
    if fits {
        Ok(())
    } else {
        Err(ClassifierError::DeclaredOutputShape(shape.to_vec()))
    }
}

fn scores_from_output(values: &[f32]) -> Result<ClassScores, ClassifierError> {
    ClassScores::from_slice(values).ok_or(ClassifierError::OutputShape(values.len()))
}

impl EmotionClassifier for OnnxFerPlusClassifier {
    fn infer(&mut self, tensor: &InputTensor) -> Result<ClassScores, Box<dyn std::error::Error>> {
        let input = shape_input(tensor, self.layout)?;
        let input_value = ort::value::Tensor::from_array(input)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        if outputs.len() == 0 {
            return Err(ClassifierError::MissingOutput.into());
        }
        let logits = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let values: Vec<f32> = logits.iter().copied().collect();
        Ok(scores_from_output(&values)?)
    }
}

use thiserror::Error;

use crate::preprocessing::domain::input_tensor::InputTensor;
use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("cannot preprocess an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(u8),
}

/// Domain interface for turning an image into the classifier's input tensor.
///
/// Synchronous: the returned tensor is fully materialized, so the caller
/// can hand it to the classifier immediately.
pub trait TensorPreprocessor: Send {
    fn preprocess(&self, frame: &Frame) -> Result<InputTensor, Box<dyn std::error::Error>>;
}

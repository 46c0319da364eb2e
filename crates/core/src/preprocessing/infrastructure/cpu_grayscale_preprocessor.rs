use crate::preprocessing::domain::input_tensor::InputTensor;
use crate::preprocessing::domain::tensor_preprocessor::TensorPreprocessor;
use crate::shared::constants::TENSOR_SIZE;
use crate::shared::frame::Frame;

use super::kernel;

/// CPU evaluation of the grayscale-resize kernel.
///
/// Produces the same sampling as the GPU shader; used when no adapter is
/// available or when explicitly requested.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuGrayscalePreprocessor;

impl CpuGrayscalePreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl TensorPreprocessor for CpuGrayscalePreprocessor {
    fn preprocess(&self, frame: &Frame) -> Result<InputTensor, Box<dyn std::error::Error>> {
        kernel::validate(frame)?;
        let values = kernel::grayscale_resize(frame, TENSOR_SIZE);
        Ok(InputTensor::from_vec(values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_output_shape() {
        let frame = Frame::new(vec![90u8; 147 * 147 * 3], 147, 147, 3, 0);
        let tensor = CpuGrayscalePreprocessor::new().preprocess(&frame).unwrap();
        assert_eq!(tensor.view().shape(), &[1, 64, 64, 1]);
    }

    #[test]
    fn test_gray_input_keeps_intensity() {
        let frame = Frame::new(vec![90u8; 147 * 147 * 3], 147, 147, 3, 0);
        let tensor = CpuGrayscalePreprocessor::new().preprocess(&frame).unwrap();
        assert_relative_eq!(tensor.value_at(10, 50), 90.0, epsilon = 1e-3);
    }

    #[test]
    fn test_empty_frame_is_error() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        assert!(CpuGrayscalePreprocessor::new().preprocess(&frame).is_err());
    }
}

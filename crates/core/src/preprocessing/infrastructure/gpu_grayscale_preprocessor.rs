use std::sync::Arc;

use crate::preprocessing::domain::input_tensor::InputTensor;
use crate::preprocessing::domain::tensor_preprocessor::TensorPreprocessor;
use crate::shared::constants::TENSOR_SIZE;
use crate::shared::frame::Frame;

use super::gpu_context::GpuContext;
use super::kernel;

/// GPU preprocessor using the grayscale-resize compute shader.
///
/// Dispatches an 8×8 grid of 8×8 workgroups, one invocation per output
/// element, and blocks on readback so the tensor is ready on return.
pub struct GpuGrayscalePreprocessor {
    ctx: Arc<GpuContext>,
}

impl GpuGrayscalePreprocessor {
    pub fn new(ctx: Arc<GpuContext>) -> Self {
        Self { ctx }
    }
}

impl TensorPreprocessor for GpuGrayscalePreprocessor {
    fn preprocess(&self, frame: &Frame) -> Result<InputTensor, Box<dyn std::error::Error>> {
        kernel::validate(frame)?;
        let pixels = kernel::pack_rgba(frame);
        let values = self.ctx.grayscale_resize(
            &pixels,
            frame.width(),
            frame.height(),
            TENSOR_SIZE as u32,
        );
        Ok(InputTensor::from_vec(values)?)
    }
}

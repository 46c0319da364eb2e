use ndarray::{Array4, ArrayView4, ShapeError};

use crate::shared::constants::TENSOR_SIZE;

/// Classifier input: one 64×64 single-channel float image, shape (1, 64, 64, 1).
///
/// Values are luminance intensities in 0..=255, rows top to bottom.
/// Created per tick and consumed by exactly one inference call.
#[derive(Clone, Debug, PartialEq)]
pub struct InputTensor {
    data: Array4<f32>,
}

impl InputTensor {
    pub const SHAPE: (usize, usize, usize, usize) = (1, TENSOR_SIZE, TENSOR_SIZE, 1);

    /// Builds a tensor from `64 * 64` row-major values.
    pub fn from_vec(values: Vec<f32>) -> Result<Self, ShapeError> {
        let data = Array4::from_shape_vec(Self::SHAPE, values)?;
        Ok(Self { data })
    }

    pub fn zeros() -> Self {
        Self {
            data: Array4::zeros(Self::SHAPE),
        }
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Owned array for handing to an inference runtime. NHWC and NCHW
    /// coincide in memory for a single channel.
    pub fn into_array(self) -> Array4<f32> {
        self.data
    }

    pub fn value_at(&self, x: usize, y: usize) -> f32 {
        self.data[[0, y, x, 0]]
    }
}

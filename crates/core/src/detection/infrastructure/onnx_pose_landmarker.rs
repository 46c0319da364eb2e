/// BlazePose-style landmark model using ONNX Runtime via `ort`.
///
/// The whole frame is stretched to the model's square input, so the
/// normalized output coordinates map straight back onto the frame.
/// Only the 2-D/depth landmark tensor and the presence flag are read;
/// the auxiliary world-landmark and segmentation outputs are ignored.
use std::path::Path;

use thiserror::Error;

use crate::detection::domain::face_localizer::FaceLocalizer;
use crate::detection::domain::landmarks::{Landmark, LandmarkSet};
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{first_input_shape, load_session};

/// Fallback input resolution when the model's shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 256;

/// Default minimum presence probability to report a face.
pub const DEFAULT_PRESENCE_THRESHOLD: f64 = 0.5;

/// x, y, z, visibility, presence.
const VALUES_PER_LANDMARK: usize = 5;

/// Landmarks in the body topology; extra auxiliary points are dropped.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// How the model's presence flag is scaled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresenceActivation {
    /// The flag is already a probability in [0, 1].
    #[default]
    Probability,
    /// The flag is a raw logit and needs a sigmoid.
    Logit,
}

#[derive(Error, Debug, PartialEq)]
pub enum PresenceFlagError {
    #[error("landmark model returned an empty presence output")]
    Empty,
    #[error("presence flag {0} is not a probability; is the model's flag a logit?")]
    OutOfRange(f32),
}

pub struct OnnxPoseLandmarker {
    session: ort::session::Session,
    input_size: u32,
    presence_threshold: f64,
    activation: PresenceActivation,
}

impl OnnxPoseLandmarker {
    /// Load the landmark model. The input size is read from the model's
    /// NHWC input shape (`[1, H, W, 3]`) when it is static.
    pub fn new(
        model_path: &Path,
        presence_threshold: f64,
        activation: PresenceActivation,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_size = first_input_shape(&session)
            .filter(|shape| shape.len() == 4 && shape[1] > 0)
            .map(|shape| shape[1] as u32)
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded landmark model {} (input {input_size}x{input_size}, {activation:?} flag)",
            model_path.display()
        );

        Ok(Self {
            session,
            input_size,
            presence_threshold,
            activation,
        })
    }
}

impl FaceLocalizer for OnnxPoseLandmarker {
    fn locate(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Output 0: [1, N * 5] landmarks, output 1: [1, 1] presence flag.
        if outputs.len() < 2 {
            return Err(format!(
                "Landmark model expected at least 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }

        let flag = outputs[1].try_extract_array::<f32>()?;
        let flag: Vec<f32> = flag.iter().copied().collect();
        let presence = presence_from_flag(&flag, self.activation)?;
        if presence < self.presence_threshold {
            log::debug!("No face (presence {presence:.2})");
            return Ok(None);
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let coords = coords.as_slice().ok_or("Cannot get landmark slice")?;
        Ok(Some(decode_landmarks(coords, self.input_size)))
    }
}

/// Stretch the frame to `size × size`, normalize to [0,1], NHWC float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, s, s, 3));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, y, x, c]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Convert raw model-pixel coordinates into normalized landmarks.
fn decode_landmarks(values: &[f32], input_size: u32) -> LandmarkSet {
    let scale = input_size as f32;
    let points = values
        .chunks_exact(VALUES_PER_LANDMARK)
        .take(POSE_LANDMARK_COUNT)
        .map(|v| Landmark::new(v[0] / scale, v[1] / scale, v[2] / scale))
        .collect();
    LandmarkSet::new(points)
}

/// Presence probability from the model's flag output.
///
/// In `Probability` mode a flag outside [0, 1] or NaN is an error.
fn presence_from_flag(
    flag: &[f32],
    activation: PresenceActivation,
) -> Result<f64, PresenceFlagError> {
    let value = *flag.first().ok_or(PresenceFlagError::Empty)?;
    match activation {
        PresenceActivation::Probability if (0.0..=1.0).contains(&value) => Ok(value as f64),
        PresenceActivation::Probability => Err(PresenceFlagError::OutOfRange(value)),
        PresenceActivation::Logit if value.is_nan() => Err(PresenceFlagError::OutOfRange(value)),
        PresenceActivation::Logit => Ok(sigmoid(value) as f64),
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preprocess_shape_is_nhwc() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let tensor = preprocess(&frame, 256);
        assert_eq!(tensor.shape(), &[1, 256, 256, 3]);
    }

    #[test]
    fn test_preprocess_normalizes_and_keeps_channel_order() {
        let mut data = Vec::new();
        for _ in 0..(10 * 10) {
            data.extend_from_slice(&[255, 0, 51]);
        }
        let frame = Frame::new(data, 10, 10, 3, 0);
        let tensor = preprocess(&frame, 4);
        assert_relative_eq!(tensor[[0, 2, 3, 0]], 1.0);
        assert_relative_eq!(tensor[[0, 2, 3, 1]], 0.0);
        assert_relative_eq!(tensor[[0, 2, 3, 2]], 0.2);
    }

    #[test]
    fn test_decode_landmarks_normalizes_by_input_size() {
        let mut values = vec![0.0f32; 39 * VALUES_PER_LANDMARK];
        values[0] = 128.0; // nose x
        values[1] = 64.0; // nose y
        values[2] = -25.6; // nose z
        let lm = decode_landmarks(&values, 256);
        assert_eq!(lm.len(), POSE_LANDMARK_COUNT);
        let nose = lm.center().unwrap();
        assert_relative_eq!(nose.x, 0.5);
        assert_relative_eq!(nose.y, 0.25);
        assert_relative_eq!(nose.z, -0.1);
    }

    #[test]
    fn test_decode_landmarks_ignores_trailing_partial_values() {
        let values = vec![1.0f32; 2 * VALUES_PER_LANDMARK + 3];
        let lm = decode_landmarks(&values, 256);
        assert_eq!(lm.len(), 2);
    }

    fn is_present(flag: f32, activation: PresenceActivation) -> bool {
        presence_from_flag(&[flag], activation).unwrap() >= DEFAULT_PRESENCE_THRESHOLD
    }

    #[test]
    fn test_probability_flag_is_compared_directly() {
        assert!(!is_present(0.0, PresenceActivation::Probability));
        assert!(!is_present(0.1, PresenceActivation::Probability));
        assert!(!is_present(0.3, PresenceActivation::Probability));
        assert!(is_present(0.5, PresenceActivation::Probability));
        assert!(is_present(0.97, PresenceActivation::Probability));
    }

    #[test]
    fn test_logit_flag_goes_through_sigmoid() {
        assert!(!is_present(-3.0, PresenceActivation::Logit));
        assert!(is_present(0.0, PresenceActivation::Logit));
        assert!(is_present(4.0, PresenceActivation::Logit));
    }

    #[test]
    fn test_probability_flag_out_of_range_is_rejected() {
        assert_eq!(
            presence_from_flag(&[4.2], PresenceActivation::Probability),
            Err(PresenceFlagError::OutOfRange(4.2))
        );
        assert!(matches!(
            presence_from_flag(&[-0.5], PresenceActivation::Probability),
            Err(PresenceFlagError::OutOfRange(_))
        ));
        assert!(presence_from_flag(&[f32::NAN], PresenceActivation::Probability).is_err());
        assert!(presence_from_flag(&[f32::NAN], PresenceActivation::Logit).is_err());
    }

    #[test]
    fn test_empty_flag_output_is_an_error() {
        assert_eq!(
            presence_from_flag(&[], PresenceActivation::Probability),
            Err(PresenceFlagError::Empty)
        );
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(8.0) > 0.99);
        assert!(sigmoid(-8.0) < 0.01);
    }
}

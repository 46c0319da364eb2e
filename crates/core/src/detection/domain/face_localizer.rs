use crate::detection::domain::landmarks::LandmarkSet;
use crate::shared::frame::Frame;

/// Domain interface for locating a face as a set of landmarks.
///
/// `Ok(None)` means no face was found in this frame. Implementations keep
/// no state between frames; `&mut self` only reflects that inference
/// sessions need exclusive access.
pub trait FaceLocalizer: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>>;
}

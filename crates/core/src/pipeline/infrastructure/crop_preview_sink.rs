use std::path::PathBuf;

use crate::pipeline::emotion_pipeline::TickOutcome;
use crate::pipeline::live_session::DisplaySink;
use crate::shared::frame::Frame;

/// Saves the classified face crop to an image file on every fresh tick,
/// then forwards the outcome to the wrapped display.
///
/// The file is overwritten each time, so it always shows the latest crop.
pub struct CropPreviewSink {
    path: PathBuf,
    inner: Box<dyn DisplaySink>,
}

impl CropPreviewSink {
    pub fn new(path: PathBuf, inner: Box<dyn DisplaySink>) -> Self {
        Self { path, inner }
    }

    fn write(&self, crop: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let img = crop
            .to_rgb_image()
            .ok_or("Failed to create image from crop data")?;
        img.save(&self.path)?;
        Ok(())
    }
}

impl DisplaySink for CropPreviewSink {
    fn show(&mut self, frame: &Frame, outcome: &TickOutcome) -> Result<(), Box<dyn std::error::Error>> {
        if let TickOutcome::Fresh {
            crop: Some(crop), ..
        } = outcome
        {
            self.write(crop)?;
        }
        self.inner.show(frame, outcome)
    }
}

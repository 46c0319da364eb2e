use std::path::Path;

use crate::capture::domain::camera_source::{
    CameraBackend, CaptureFormat, DeviceInfo, FrameStream,
};
use crate::shared::frame::Frame;

/// Adapts a still image to the [`CameraBackend`] interface.
///
/// Exposes one device whose stream yields the same picture on every
/// read, so offline classification runs through the same pipeline as
/// live capture. The requested capture format is ignored.
pub struct ImageFileBackend {
    name: String,
    frame: Frame,
}

impl ImageFileBackend {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let image = image::open(path)?.to_rgb8();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            frame: Frame::from_rgb_image(image, 0),
        })
    }
}

impl CameraBackend for ImageFileBackend {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, Box<dyn std::error::Error>> {
        Ok(vec![DeviceInfo {
            index: 0,
            name: self.name.clone(),
            backend_id: None,
        }])
    }

    fn open(
        &mut self,
        _device: &DeviceInfo,
        _format: CaptureFormat,
    ) -> Result<Box<dyn FrameStream>, Box<dyn std::error::Error>> {
        Ok(Box::new(StillFrameStream {
            frame: self.frame.clone(),
            frames_read: 0,
        }))
    }
}

struct StillFrameStream {
    frame: Frame,
    frames_read: usize,
}

impl FrameStream for StillFrameStream {
    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let frame = self.frame.clone().with_index(self.frames_read);
        self.frames_read += 1;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera_source::CameraSource;

    fn write_png(dir: &Path, width: u32, height: u32, rgb: [u8; 3]) -> std::path::PathBuf {
        let path = dir.join("still.png");
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_exposes_single_device_named_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 8, 6, [10, 20, 30]);
        let backend = ImageFileBackend::open(&path).unwrap();
        let devices = backend.list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "still.png");
    }

    #[test]
    fn test_stream_repeats_image_with_increasing_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 8, 6, [10, 20, 30]);
        let backend = ImageFileBackend::open(&path).unwrap();
        let mut source =
            CameraSource::open(Box::new(backend), 0, CaptureFormat::default()).unwrap();

        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_eq!((first.width(), first.height()), (8, 6));
        assert_eq!(&first.data()[..3], &[10, 20, 30]);
        assert_eq!(first.data(), second.data());
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageFileBackend::open(&dir.path().join("nope.png")).is_err());
    }
}

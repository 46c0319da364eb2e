/// Native webcam capture via `nokhwa`.
///
/// Frames are requested as MJPEG close to the configured resolution and
/// decoded to RGB at the boundary so the rest of the pipeline only sees
/// [`Frame`]s.
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

use crate::capture::domain::camera_source::{
    CameraBackend, CaptureError, CaptureFormat, DeviceInfo, FrameStream,
};
use crate::shared::frame::Frame;

pub struct NokhwaCameraBackend;

impl NokhwaCameraBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NokhwaCameraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for NokhwaCameraBackend {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, Box<dyn std::error::Error>> {
        let infos = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CaptureError::Backend(format!("failed to query cameras: {e}")))?;

        Ok(infos
            .iter()
            .enumerate()
            .map(|(position, info)| device_info(position, info.index(), info.human_name()))
            .collect())
    }

    fn open(
        &mut self,
        device: &DeviceInfo,
        format: CaptureFormat,
    ) -> Result<Box<dyn FrameStream>, Box<dyn std::error::Error>> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(format.width, format.height),
                FrameFormat::MJPEG,
                format.fps,
            ),
        ));

        let mut camera = Camera::new(camera_index(device), requested)
            .map_err(|e| CaptureError::Backend(format!("device {}: {e}", device.index)))?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::Backend(format!("device {}: {e}", device.index)))?;

        let resolution = camera.resolution();
        log::info!(
            "Camera {} streaming at {}x{}",
            device.name,
            resolution.width(),
            resolution.height()
        );

        Ok(Box::new(NokhwaFrameStream {
            camera,
            frames_read: 0,
        }))
    }
}

/// Name-addressed devices keep their identifier so they reopen as the
/// same device; `index` is then only the enumeration position.
fn device_info(position: usize, index: &CameraIndex, name: String) -> DeviceInfo {
    match index {
        CameraIndex::Index(i) => DeviceInfo {
            index: *i,
            name,
            backend_id: None,
        },
        CameraIndex::String(id) => DeviceInfo {
            index: position as u32,
            name,
            backend_id: Some(id.clone()),
        },
    }
}

fn camera_index(device: &DeviceInfo) -> CameraIndex {
    match &device.backend_id {
        Some(id) => CameraIndex::String(id.clone()),
        None => CameraIndex::Index(device.index),
    }
}

struct NokhwaFrameStream {
    camera: Camera,
    frames_read: usize,
}

impl FrameStream for NokhwaFrameStream {
    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::Backend(format!("failed to capture frame: {e}")))?;
        let rgb = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Backend(format!("failed to decode frame: {e}")))?;

        let (width, height) = (rgb.width(), rgb.height());
        let frame = Frame::new(rgb.into_raw(), width, height, 3, self.frames_read);
        self.frames_read += 1;
        Ok(frame)
    }
}

impl Drop for NokhwaFrameStream {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::error!("Error stopping camera stream: {e}");
        }
    }
}

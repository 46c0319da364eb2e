use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no video capture devices found")]
    NoDevices,
    #[error("no capture stream is open")]
    NotOpen,
    #[error("camera backend error: {0}")]
    Backend(String),
}

/// A capture device as reported by the backend's enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
    /// Backend identifier for devices addressed by name rather than number.
    pub backend_id: Option<String>,
}

/// Requested capture resolution and rate. Backends pick the closest match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
        }
    }
}

/// An open, live frame stream. Dropping it releases the device.
pub trait FrameStream {
    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>>;
}

/// Domain interface for enumerating and opening capture devices.
///
/// Not `Send`: native camera handles are usually bound to the thread
/// that opened them, and capture runs on the pipeline thread only.
pub trait CameraBackend {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, Box<dyn std::error::Error>>;

    fn open(
        &mut self,
        device: &DeviceInfo,
        format: CaptureFormat,
    ) -> Result<Box<dyn FrameStream>, Box<dyn std::error::Error>>;
}

/// Index of the device after `current`, wrapping to 0 past the last one.
pub fn next_device_index(current: usize, device_count: usize) -> usize {
    if current + 1 >= device_count {
        0
    } else {
        current + 1
    }
}

/// The active camera: one open stream over one enumerated device, with
/// hot-swapping to the next device.
pub struct CameraSource {
    backend: Box<dyn CameraBackend>,
    format: CaptureFormat,
    devices: Vec<DeviceInfo>,
    current: usize,
    stream: Option<Box<dyn FrameStream>>,
}

impl CameraSource {
    /// Enumerates devices and opens the one at `start_index`.
    ///
    /// An out-of-range index is clamped to the last device.
    pub fn open(
        backend: Box<dyn CameraBackend>,
        start_index: usize,
        format: CaptureFormat,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let devices = backend.list_devices()?;
        if devices.is_empty() {
            return Err(CaptureError::NoDevices.into());
        }
        let current = if start_index >= devices.len() {
            log::warn!(
                "Camera index {start_index} out of range ({} devices), using {}",
                devices.len(),
                devices.len() - 1
            );
            devices.len() - 1
        } else {
            start_index
        };

        let mut source = Self {
            backend,
            format,
            devices,
            current,
            stream: None,
        };
        source.open_current()?;
        Ok(source)
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// `None` only after a switch found no devices at all.
    pub fn current_device(&self) -> Option<&DeviceInfo> {
        self.devices.get(self.current)
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Closes the current stream, then opens the next enumerated device.
    ///
    /// Devices are re-enumerated first so hot-plugged cameras are picked
    /// up. With a single device the same device is reopened.
    pub fn switch_to_next(&mut self) -> Result<&DeviceInfo, Box<dyn std::error::Error>> {
        self.stream = None;

        let devices = self.backend.list_devices()?;
        if devices.is_empty() {
            self.devices.clear();
            return Err(CaptureError::NoDevices.into());
        }
        self.current = next_device_index(self.current, devices.len());
        self.devices = devices;
        self.open_current()?;
        Ok(&self.devices[self.current])
    }

    pub fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let stream = self.stream.as_mut().ok_or(CaptureError::NotOpen)?;
        stream.next_frame()
    }

    fn open_current(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let device = &self.devices[self.current];
        log::info!(
            "Opening camera {} ({}) at {}x{}@{}",
            device.index,
            device.name,
            self.format.width,
            self.format.height,
            self.format.fps
        );
        self.stream = Some(self.backend.open(device, self.format)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct StubStream {
        device: u32,
        events: EventLog,
        served: usize,
    }

    impl FrameStream for StubStream {
        fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
            self.served += 1;
            Ok(Frame::new(vec![self.device as u8; 3], 1, 1, 3, self.served))
        }
    }

    impl Drop for StubStream {
        fn drop(&mut self) {
            self.events
                .lock()
                .unwrap()
                .push(format!("close:{}", self.device));
        }
    }

    struct StubBackend {
        device_counts: Vec<usize>,
        enumerations: usize,
        events: EventLog,
    }

    impl StubBackend {
        fn new(device_count: usize) -> (Self, EventLog) {
            Self::with_counts(vec![device_count])
        }

        /// Successive enumerations return the given counts; the last repeats.
        fn with_counts(device_counts: Vec<usize>) -> (Self, EventLog) {
            let events: EventLog = Arc::new(Mutex::new(Vec::new()));
            let backend = Self {
                device_counts,
                enumerations: 0,
                events: events.clone(),
            };
            (backend, events)
        }
    }

    impl CameraBackend for StubBackend {
        fn list_devices(&self) -> Result<Vec<DeviceInfo>, Box<dyn std::error::Error>> {
            let i = self.enumerations.min(self.device_counts.len() - 1);
            Ok((0..self.device_counts[i] as u32)
                .map(|index| DeviceInfo {
                    index,
                    name: format!("cam{index}"),
                    backend_id: None,
                })
                .collect())
        }

        fn open(
            &mut self,
            device: &DeviceInfo,
            _format: CaptureFormat,
        ) -> Result<Box<dyn FrameStream>, Box<dyn std::error::Error>> {
            self.enumerations += 1;
            self.events
                .lock()
                .unwrap()
                .push(format!("open:{}", device.index));
            Ok(Box::new(StubStream {
                device: device.index,
                events: self.events.clone(),
                served: 0,
            }))
        }
    }

    fn events(log: &EventLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[rstest]
    #[case::first_of_three(0, 3, 1)]
    #[case::middle_of_three(1, 3, 2)]
    #[case::last_wraps(2, 3, 0)]
    #[case::single_device(0, 1, 0)]
    #[case::stale_index_after_unplug(4, 2, 0)]
    fn test_next_device_index(#[case] current: usize, #[case] count: usize, #[case] expected: usize) {
        assert_eq!(next_device_index(current, count), expected);
    }

    #[test]
    fn test_open_starts_requested_device() {
        let (backend, log) = StubBackend::new(3);
        let source = CameraSource::open(Box::new(backend), 1, CaptureFormat::default()).unwrap();
        assert_eq!(source.current_index(), 1);
        assert_eq!(source.current_device().unwrap().name, "cam1");
        assert!(source.is_open());
        assert_eq!(events(&log), vec!["open:1"]);
    }

    #[test]
    fn test_open_clamps_out_of_range_index() {
        let (backend, _log) = StubBackend::new(2);
        let source = CameraSource::open(Box::new(backend), 9, CaptureFormat::default()).unwrap();
        assert_eq!(source.current_index(), 1);
    }

    #[test]
    fn test_open_with_no_devices_fails() {
        let (backend, log) = StubBackend::new(0);
        let err = CameraSource::open(Box::new(backend), 0, CaptureFormat::default())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<CaptureError>(),
            Some(CaptureError::NoDevices)
        ));
        assert!(events(&log).is_empty());
    }

    #[test]
    fn test_switch_from_last_device_wraps_to_first() {
        let (backend, _log) = StubBackend::new(3);
        let mut source = CameraSource::open(Box::new(backend), 2, CaptureFormat::default()).unwrap();
        let device = source.switch_to_next().unwrap();
        assert_eq!(device.index, 0);
        assert_eq!(source.current_index(), 0);
    }

    #[test]
    fn test_switch_releases_previous_stream_before_opening_next() {
        let (backend, log) = StubBackend::new(2);
        let mut source = CameraSource::open(Box::new(backend), 0, CaptureFormat::default()).unwrap();
        source.switch_to_next().unwrap();
        assert_eq!(events(&log), vec!["open:0", "close:0", "open:1"]);
    }

    #[test]
    fn test_switch_with_single_device_reopens_same_device() {
        let (backend, log) = StubBackend::new(1);
        let mut source = CameraSource::open(Box::new(backend), 0, CaptureFormat::default()).unwrap();
        source.switch_to_next().unwrap();
        assert_eq!(source.current_index(), 0);
        assert!(source.is_open());
        assert_eq!(events(&log), vec!["open:0", "close:0", "open:0"]);
    }

    #[test]
    fn test_switch_picks_up_shrunken_device_list() {
        let (backend, _log) = StubBackend::with_counts(vec![3, 3, 2]);
        let mut source = CameraSource::open(Box::new(backend), 1, CaptureFormat::default()).unwrap();
        // Second enumeration still sees 3 devices: 1 -> 2
        source.switch_to_next().unwrap();
        assert_eq!(source.current_index(), 2);
        // Third enumeration sees 2 devices: 2 -> wraps to 0
        source.switch_to_next().unwrap();
        assert_eq!(source.current_index(), 0);
        assert_eq!(source.devices().len(), 2);
    }

    #[test]
    fn test_switch_to_empty_list_leaves_source_closed() {
        let (backend, log) = StubBackend::with_counts(vec![1, 0]);
        let mut source = CameraSource::open(Box::new(backend), 0, CaptureFormat::default()).unwrap();
        assert!(source.switch_to_next().is_err());
        assert!(!source.is_open());
        assert_eq!(events(&log), vec!["open:0", "close:0"]);
        assert!(source.next_frame().is_err());
        assert!(source.current_device().is_none());
    }

    #[test]
    fn test_next_frame_reads_from_active_stream() {
        let (backend, _log) = StubBackend::new(2);
        let mut source = CameraSource::open(Box::new(backend), 1, CaptureFormat::default()).unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.data()[0], 1);
        assert_eq!(frame.index(), 1);
    }

    #[test]
    fn test_default_format_matches_constants() {
        let format = CaptureFormat::default();
        assert_eq!(
            (format.width, format.height, format.fps),
            (640, 640, 30)
        );
    }
}

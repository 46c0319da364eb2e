use crate::capture::domain::camera_source::CameraSource;
use crate::pipeline::emotion_pipeline::{EmotionPipeline, TickOutcome};
use crate::shared::frame::Frame;

/// User commands delivered between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    SwitchCamera,
    Quit,
}

/// Non-blocking source of control commands, polled once per tick.
pub trait ControlSource {
    /// Next pending command, or `None` if nothing is waiting.
    fn try_next(&mut self) -> Option<ControlCommand>;
}

/// Control source that never issues commands.
pub struct NoControls;

impl ControlSource for NoControls {
    fn try_next(&mut self) -> Option<ControlCommand> {
        None
    }
}

/// Receives each tick's outcome for display.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame, outcome: &TickOutcome) -> Result<(), Box<dyn std::error::Error>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: usize,
    pub switches: usize,
}

/// Interactive capture loop: controls → frame → pipeline → display.
///
/// Single-threaded; stops on `Quit` or after `max_frames` ticks. Capture,
/// switch and inference errors end the session. The pipeline summary is
/// emitted either way.
pub struct LiveSession {
    camera: CameraSource,
    pipeline: EmotionPipeline,
    controls: Box<dyn ControlSource>,
    display: Box<dyn DisplaySink>,
    max_frames: Option<usize>,
}

impl LiveSession {
    pub fn new(
        camera: CameraSource,
        pipeline: EmotionPipeline,
        controls: Box<dyn ControlSource>,
        display: Box<dyn DisplaySink>,
        max_frames: Option<usize>,
    ) -> Self {
        Self {
            camera,
            pipeline,
            controls,
            display,
            max_frames,
        }
    }

    pub fn run(&mut self) -> Result<SessionStats, Box<dyn std::error::Error>> {
        let mut stats = SessionStats::default();
        let result = self.run_ticks(&mut stats);
        self.pipeline.summary();
        result.map(|()| stats)
    }

    fn run_ticks(&mut self, stats: &mut SessionStats) -> Result<(), Box<dyn std::error::Error>> {
        'session: loop {
            if self.max_frames.is_some_and(|max| stats.ticks >= max) {
                break;
            }

            while let Some(command) = self.controls.try_next() {
                match command {
                    ControlCommand::Quit => break 'session,
                    ControlCommand::SwitchCamera => {
                        let device = self.camera.switch_to_next()?;
                        log::info!("Switched to camera {} ({})", device.index, device.name);
                        stats.switches += 1;
                    }
                }
            }

            // Indices stay monotonic across device switches.
            let frame = self.camera.next_frame()?.with_index(stats.ticks);
            let outcome = self.pipeline.run_tick(&frame)?;
            self.display.show(&frame, &outcome)?;
            stats.ticks += 1;
        }
        Ok(())
    }
}

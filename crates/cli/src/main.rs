use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use moodcam_core::capture::domain::camera_source::{CameraBackend, CameraSource, CaptureFormat};
use moodcam_core::capture::infrastructure::image_file_source::ImageFileBackend;
use moodcam_core::capture::infrastructure::nokhwa_camera::NokhwaCameraBackend;
use moodcam_core::classification::infrastructure::onnx_ferplus_classifier::OnnxFerPlusClassifier;
use moodcam_core::detection::domain::face_localizer::FaceLocalizer;
use moodcam_core::detection::infrastructure::onnx_pose_landmarker::{
    OnnxPoseLandmarker, PresenceActivation, DEFAULT_PRESENCE_THRESHOLD,
};
use moodcam_core::pipeline::emotion_pipeline::{CropRecovery, EmotionPipeline, PipelineConfig};
use moodcam_core::pipeline::infrastructure::console_display::{ConsoleDisplay, OutputFormat};
use moodcam_core::pipeline::infrastructure::crop_preview_sink::CropPreviewSink;
use moodcam_core::pipeline::infrastructure::stdin_control_source::StdinControlSource;
use moodcam_core::pipeline::live_session::{ControlSource, DisplaySink, LiveSession, NoControls};
use moodcam_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use moodcam_core::preprocessing::infrastructure::preprocessor_factory::{
    create_preprocessor, PreprocessorBackend,
};
use moodcam_core::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, EMOTION_MODEL_NAME,
    EMOTION_MODEL_URL, IMAGE_EXTENSIONS,
};
use moodcam_core::shared::model_resolver;

/// Live facial emotion recognition from a webcam.
///
/// Press Enter to switch to the next camera; type `q` and Enter to quit.
#[derive(Parser)]
#[command(name = "moodcam")]
struct Cli {
    /// Emotion model (FER+ ONNX). Downloaded and cached if omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Locate the face and classify only the cropped region.
    #[arg(long, requires = "landmark_model")]
    face_crop: bool,

    /// Pose landmark model (BlazePose-style ONNX) used by --face-crop.
    #[arg(long)]
    landmark_model: Option<PathBuf>,

    /// Minimum face presence probability (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_PRESENCE_THRESHOLD)]
    landmark_confidence: f64,

    /// How the landmark model's presence flag is scaled.
    #[arg(long, value_enum, default_value_t = FlagArg::Probability)]
    landmark_flag: FlagArg,

    /// Starting camera index.
    #[arg(long, default_value_t = 0)]
    camera: usize,

    /// Requested capture width.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_WIDTH)]
    width: u32,

    /// Requested capture height.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
    height: u32,

    /// Requested capture frame rate.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_FPS)]
    fps: u32,

    /// Print available cameras and exit.
    #[arg(long)]
    list_devices: bool,

    /// Classify a still image instead of the webcam.
    #[arg(long, conflicts_with = "list_devices")]
    image: Option<PathBuf>,

    /// Stop after this many frames (defaults to 1 with --image).
    #[arg(long)]
    frames: Option<usize>,

    /// What to show when the face crop fails.
    #[arg(long, value_enum, default_value_t = RecoveryArg::Reuse)]
    crop_recovery: RecoveryArg,

    /// Where tensor preprocessing runs.
    #[arg(long, value_enum, default_value_t = PreprocessorArg::Auto)]
    preprocessor: PreprocessorArg,

    /// Output format for each frame's probabilities.
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Write the current face crop to this image file on every fresh frame.
    #[arg(long, requires = "face_crop")]
    crop_preview: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RecoveryArg {
    Reuse,
    Skip,
    FullFrame,
}

#[derive(Clone, Copy, ValueEnum)]
enum FlagArg {
    Probability,
    Logit,
}

#[derive(Clone, Copy, ValueEnum)]
enum PreprocessorArg {
    Auto,
    Gpu,
    Cpu,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<RecoveryArg> for CropRecovery {
    fn from(arg: RecoveryArg) -> Self {
        match arg {
            RecoveryArg::Reuse => CropRecovery::ReuseLast,
            RecoveryArg::Skip => CropRecovery::SkipFrame,
            RecoveryArg::FullFrame => CropRecovery::FullFrame,
        }
    }
}

impl From<FlagArg> for PresenceActivation {
    fn from(arg: FlagArg) -> Self {
        match arg {
            FlagArg::Probability => PresenceActivation::Probability,
            FlagArg::Logit => PresenceActivation::Logit,
        }
    }
}

impl From<PreprocessorArg> for PreprocessorBackend {
    fn from(arg: PreprocessorArg) -> Self {
        match arg {
            PreprocessorArg::Auto => PreprocessorBackend::Auto,
            PreprocessorArg::Gpu => PreprocessorBackend::Gpu,
            PreprocessorArg::Cpu => PreprocessorBackend::Cpu,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    if cli.list_devices {
        return list_devices();
    }

    let pipeline = build_pipeline(&cli)?;
    let format = CaptureFormat {
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
    };

    let backend: Box<dyn CameraBackend>;
    let controls: Box<dyn ControlSource>;
    let max_frames = match &cli.image {
        Some(path) => {
            backend = Box::new(ImageFileBackend::open(path)?);
            controls = Box::new(NoControls);
            Some(cli.frames.unwrap_or(1))
        }
        None => {
            backend = Box::new(NokhwaCameraBackend::new());
            controls = Box::new(StdinControlSource::spawn()?);
            eprintln!("Press Enter to switch camera, q + Enter to quit.");
            cli.frames
        }
    };

    let camera = CameraSource::open(backend, cli.camera, format)?;

    let mut display: Box<dyn DisplaySink> = Box::new(ConsoleDisplay::stdout(cli.format.into()));
    if let Some(path) = &cli.crop_preview {
        display = Box::new(CropPreviewSink::new(path.clone(), display));
    }

    let mut session = LiveSession::new(camera, pipeline, controls, display, max_frames);
    let stats = session.run()?;
    log::info!(
        "Session ended after {} frames ({} camera switches)",
        stats.ticks,
        stats.switches
    );
    Ok(())
}

fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let devices = NokhwaCameraBackend::new().list_devices()?;
    if devices.is_empty() {
        println!("No cameras found");
    }
    for device in devices {
        println!("{}: {}", device.index, device.name);
    }
    Ok(())
}

fn build_pipeline(cli: &Cli) -> Result<EmotionPipeline, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {EMOTION_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        EMOTION_MODEL_NAME,
        EMOTION_MODEL_URL,
        cli.model.as_deref(),
        Some(Path::new("models")),
        Some(Box::new(download_progress)),
    )?;
    let classifier = OnnxFerPlusClassifier::new(&model_path)?;

    let localizer: Option<Box<dyn FaceLocalizer>> = match (&cli.landmark_model, cli.face_crop) {
        (Some(path), true) => Some(Box::new(OnnxPoseLandmarker::new(
            path,
            cli.landmark_confidence,
            cli.landmark_flag.into(),
        )?)),
        _ => None,
    };

    let preprocessor = create_preprocessor(cli.preprocessor.into())?;
    let config = PipelineConfig {
        crop_recovery: cli.crop_recovery.into(),
    };

    Ok(
        EmotionPipeline::new(localizer, preprocessor, Box::new(classifier), config)
            .with_logger(Box::new(StdoutPipelineLogger::default())),
    )
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.model {
        if !path.is_file() {
            return Err(format!("Emotion model not found: {}", path.display()).into());
        }
    }
    if let Some(path) = &cli.landmark_model {
        if !path.is_file() {
            return Err(format!("Landmark model not found: {}", path.display()).into());
        }
    }
    if let Some(path) = &cli.image {
        if !path.is_file() {
            return Err(format!("Input image not found: {}", path.display()).into());
        }
        if !is_image(path) {
            return Err(format!(
                "Unsupported image type: {} (expected one of {})",
                path.display(),
                IMAGE_EXTENSIONS.join(", ")
            )
            .into());
        }
    }
    if !(0.0..=1.0).contains(&cli.landmark_confidence) {
        return Err(format!(
            "Landmark confidence must be between 0.0 and 1.0, got {}",
            cli.landmark_confidence
        )
        .into());
    }
    if cli.width == 0 || cli.height == 0 || cli.fps == 0 {
        return Err(format!(
            "Capture format must be non-zero, got {}x{}@{}",
            cli.width, cli.height, cli.fps
        )
        .into());
    }
    if cli.frames == Some(0) {
        return Err("--frames must be at least 1".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading emotion model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading emotion model... {downloaded} bytes");
    }
}

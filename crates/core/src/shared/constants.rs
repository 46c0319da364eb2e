pub const EMOTION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EMOTION_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

/// Side length of the square single-channel classifier input.
pub const TENSOR_SIZE: usize = 64;

/// Requested capture format when none is given on the command line.
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 640;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

/// Crop side as a multiple of the inter-eye distance.
pub const CROP_EYE_SCALE: f64 = 2.3;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

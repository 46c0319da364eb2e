pub mod image_file_source;
pub mod nokhwa_camera;

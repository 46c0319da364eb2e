pub mod face_localizer;
pub mod landmarks;
pub mod region_cropper;

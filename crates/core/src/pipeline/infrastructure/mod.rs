pub mod console_display;
pub mod crop_preview_sink;
pub mod stdin_control_source;

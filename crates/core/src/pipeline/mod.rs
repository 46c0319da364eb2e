pub mod emotion_pipeline;
pub mod infrastructure;
pub mod live_session;
pub mod pipeline_logger;

pub mod cpu_grayscale_preprocessor;
pub mod gpu_context;
pub mod gpu_grayscale_preprocessor;
mod kernel;
pub mod preprocessor_factory;

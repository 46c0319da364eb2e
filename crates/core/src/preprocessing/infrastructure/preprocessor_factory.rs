use std::sync::Arc;

use thiserror::Error;

use crate::preprocessing::domain::tensor_preprocessor::TensorPreprocessor;

use super::cpu_grayscale_preprocessor::CpuGrayscalePreprocessor;
use super::gpu_context::GpuContext;
use super::gpu_grayscale_preprocessor::GpuGrayscalePreprocessor;

/// Where the preprocessing kernel runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PreprocessorBackend {
    /// GPU when an adapter is available, otherwise CPU.
    #[default]
    Auto,
    Gpu,
    Cpu,
}

#[derive(Error, Debug)]
#[error("no GPU adapter available for compute preprocessing")]
pub struct NoGpuAdapter;

/// Creates the preprocessor for `backend`.
///
/// `Auto` probes for a wgpu adapter and falls back to the CPU; `Gpu`
/// fails instead of falling back. Logs which backend is selected.
pub fn create_preprocessor(
    backend: PreprocessorBackend,
) -> Result<Box<dyn TensorPreprocessor>, NoGpuAdapter> {
    if backend == PreprocessorBackend::Cpu {
        log::info!("Using CPU backend for tensor preprocessing");
        return Ok(Box::new(CpuGrayscalePreprocessor::new()));
    }

    match GpuContext::new() {
        Some(ctx) => {
            log::info!("Using GPU backend for tensor preprocessing");
            Ok(Box::new(GpuGrayscalePreprocessor::new(Arc::new(ctx))))
        }
        None if backend == PreprocessorBackend::Auto => {
            log::info!("No GPU available, using CPU backend for tensor preprocessing");
            Ok(Box::new(CpuGrayscalePreprocessor::new()))
        }
        None => Err(NoGpuAdapter),
    }
}

use std::path::Path;

use ort::session::Session;

/// Open an ONNX model with the platform's preferred execution provider.
pub fn load_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let session = Session::builder()?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Declared shape of the model's first input, if it is a tensor.
///
/// Dynamic dimensions are reported as `-1`.
pub fn first_input_shape(session: &Session) -> Option<Vec<i64>> {
    session.inputs().first().and_then(tensor_shape)
}

/// Declared shape of the model's first output, if it is a tensor.
pub fn first_output_shape(session: &Session) -> Option<Vec<i64>> {
    session.outputs().first().and_then(tensor_shape)
}

fn tensor_shape(outlet: &ort::value::Outlet) -> Option<Vec<i64>> {
    if let ort::value::ValueType::Tensor { ref shape, .. } = outlet.dtype() {
        Some(shape.to_vec())
    } else {
        None
    }
}

/// CoreML on macOS, DirectML on Windows, plain CPU elsewhere.
///
/// ONNX Runtime falls back to CPU if the platform provider fails to register.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

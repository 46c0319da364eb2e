pub mod input_tensor;
pub mod tensor_preprocessor;

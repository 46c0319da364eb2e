pub mod onnx_ferplus_classifier;

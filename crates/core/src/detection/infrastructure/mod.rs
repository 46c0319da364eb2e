pub mod onnx_pose_landmarker;

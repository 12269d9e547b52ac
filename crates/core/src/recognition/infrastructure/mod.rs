pub mod arcface_encoder;
pub mod encoding_store;
pub mod onnx_face_locator;
pub mod onnx_face_matcher;
pub mod onnx_session;

pub mod camera;
pub mod chat;
pub mod shared;

pub use camera::{CameraCapture, CaptureHandle};
pub use chat::DiagnosisChat;

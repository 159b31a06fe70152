pub mod capture;
pub mod wav;

pub use capture::{AudioCapture, AudioChunk, CaptureFactory};
pub use wav::{encode_wav, WavFileCapture, WavFileCaptureFactory};

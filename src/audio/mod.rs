pub mod backend;
pub mod capture;
pub mod decode;
pub mod file;

#[cfg(feature = "microphone")]
pub mod mic;

pub use backend::{
    AudioFrame, AudioSource, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError,
};
pub use capture::{encode_wav, AudioCaptureSession, AudioChunk};
pub use decode::{decode_chunk, DecodeError, RECOGNIZER_SAMPLE_RATE};
pub use file::FileBackend;

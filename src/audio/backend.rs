use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by audio capture backends.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No backend can serve the requested source in this build or on
    /// this platform. Detectable before any recording attempt.
    #[error("audio capture is not supported in this environment: {0}")]
    UnsupportedEnvironment(String),

    /// A backend exists but the input could not be acquired (device
    /// missing, busy, or permission denied).
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),

    /// The backend failed while a capture was running.
    #[error("capture backend failure: {0}")]
    Backend(String),

    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Frame duration derived from sample count, rate, and channel layout.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Duration of each emitted chunk in milliseconds
    pub chunk_interval_ms: u64,
    /// Preferred sample rate (backends may deliver their native rate)
    pub sample_rate: u32,
    /// Preferred channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame granularity delivered by backends, in milliseconds
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_interval_ms: 2000, // one transcription request per 2s of audio
            sample_rate: 16000,
            channels: 1,
            frame_duration_ms: 100,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - File: streams a WAV file (testing/batch processing)
/// - Microphone: cpal input device (requires the `microphone` feature)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The
    /// channel closes when the source is exhausted or capture stops.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Microphone input (requires the `microphone` feature)
    Microphone,
    /// WAV file input (testing/batch processing)
    File(String),
}

impl AudioSource {
    /// Parse a configured source string: `"microphone"` selects the input
    /// device, anything else is treated as a WAV file path.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("microphone") {
            AudioSource::Microphone
        } else {
            AudioSource::File(value.to_string())
        }
    }
}

/// Audio backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the given source.
    pub fn create(
        source: &AudioSource,
        config: CaptureConfig,
    ) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        match source {
            AudioSource::File(path) => {
                let backend = super::file::FileBackend::new(path.clone(), config);
                Ok(Box::new(backend))
            }

            AudioSource::Microphone => {
                #[cfg(feature = "microphone")]
                {
                    let backend = super::mic::MicrophoneBackend::new(config);
                    Ok(Box::new(backend))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    Err(CaptureError::UnsupportedEnvironment(
                        "microphone capture requires the `microphone` feature".to_string(),
                    ))
                }
            }
        }
    }

    /// Whether a backend exists for the source in this build. Acquisition
    /// can still fail at start time with `DeviceUnavailable`.
    pub fn is_supported(source: &AudioSource) -> bool {
        match source {
            AudioSource::File(_) => true,
            AudioSource::Microphone => cfg!(feature = "microphone"),
        }
    }
}

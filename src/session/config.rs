use std::time::Duration;

use crate::recognize::ModelTier;

/// Configuration for a transcription session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Duration of audio covered by each chunk before it is transcribed
    /// Default: 2 seconds
    pub chunk_interval: Duration,

    /// Sample rate for audio capture (recognition expects 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Recognition tier used until switched at runtime
    pub tier: ModelTier,

    /// Save the accumulated transcript automatically when recording stops
    pub auto_save_on_stop: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_millis(2000),
            sample_rate: 16000, // recognition expects 16kHz
            channels: 1,        // Mono
            tier: ModelTier::default(),
            auto_save_on_stop: true,
        }
    }
}

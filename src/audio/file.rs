use super::backend::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};
use hound::WavReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Streams a WAV file as capture frames.
///
/// Frames carry timestamps derived from their audio position, so interval
/// chunking behaves exactly as it would against a live source. Frames are
/// delivered as fast as the consumer accepts them.
pub struct FileBackend {
    path: PathBuf,
    config: CaptureConfig,
    is_capturing: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
            is_capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let reader = WavReader::open(&self.path).map_err(|e| {
            CaptureError::DeviceUnavailable(format!(
                "failed to open WAV file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CaptureError::Backend(format!("failed to read audio samples: {}", e)))?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        let (tx, rx) = mpsc::channel(100);
        let is_capturing = Arc::clone(&self.is_capturing);
        is_capturing.store(true, Ordering::SeqCst);

        let frame_ms = self.config.frame_duration_ms.max(1);
        let samples_per_frame =
            ((spec.sample_rate as u64 * frame_ms / 1000).max(1) as usize) * spec.channels as usize;

        let task = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;

            for block in samples.chunks(samples_per_frame) {
                if !is_capturing.load(Ordering::SeqCst) {
                    break;
                }

                let frame = AudioFrame {
                    samples: block.to_vec(),
                    sample_rate: spec.sample_rate,
                    channels: spec.channels,
                    timestamp_ms,
                };
                timestamp_ms += frame.duration_ms();

                if tx.send(frame).await.is_err() {
                    break;
                }
            }

            is_capturing.store(false, Ordering::SeqCst);
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.is_capturing.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("File capture task ended abnormally: {}", e);
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "file"
    }
}

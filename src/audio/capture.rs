use super::backend::{
    AudioFrame, AudioSource, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError,
};
use std::io::Cursor;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// An opaque span of captured audio, encoded as a complete WAV payload.
///
/// Chunks are what the recognizer consumes. Their contents are never
/// inspected by the capture layer beyond the metadata carried here.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Chunk number (0-indexed, capture order)
    pub index: usize,
    /// WAV-encoded PCM payload
    pub bytes: Vec<u8>,
    /// Start time in milliseconds since capture started
    pub start_ms: u64,
    /// End time in milliseconds since capture started
    pub end_ms: u64,
    /// Number of samples in this chunk
    pub sample_count: usize,
}

/// Captures audio from a backend and re-chunks the frame stream into
/// fixed-interval payloads.
///
/// One chunk is emitted per `chunk_interval_ms` of captured audio
/// (default 2000 ms). Stopping, or exhausting the source, flushes the
/// partial chunk and closes the chunk channel. Intervals in which the
/// backend produced no audio emit nothing.
pub struct AudioCaptureSession {
    backend: Box<dyn CaptureBackend>,
    config: CaptureConfig,
    chunker_task: Option<tokio::task::JoinHandle<()>>,
}

impl AudioCaptureSession {
    pub fn new(source: &AudioSource, config: CaptureConfig) -> Result<Self, CaptureError> {
        let backend = CaptureBackendFactory::create(source, config.clone())?;

        Ok(Self {
            backend,
            config,
            chunker_task: None,
        })
    }

    /// Start capturing. Returns the receiver for emitted chunks.
    pub async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        let frame_rx = self.backend.start().await?;
        let (chunk_tx, chunk_rx) = mpsc::channel(100);

        let interval_ms = self.config.chunk_interval_ms.max(1);
        let task = tokio::spawn(async move {
            run_chunker(frame_rx, chunk_tx, interval_ms).await;
        });

        self.chunker_task = Some(task);

        info!(
            "Audio capture started: backend={}, chunk interval {}ms",
            self.backend.name(),
            interval_ms
        );

        Ok(chunk_rx)
    }

    /// Stop capturing. The partial chunk is flushed into the channel
    /// before this returns.
    pub async fn stop(&mut self) -> Result<(), CaptureError> {
        self.backend.stop().await?;

        if let Some(task) = self.chunker_task.take() {
            if let Err(e) = task.await {
                warn!("Chunker task ended abnormally: {}", e);
            }
        }

        info!("Audio capture stopped");

        Ok(())
    }

    pub fn is_capturing(&self) -> bool {
        self.backend.is_capturing()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

/// Encode interleaved i16 PCM samples as an in-memory WAV payload.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>, CaptureError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;

    for &sample in samples {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;

    Ok(cursor.into_inner())
}

/// Accumulates frames until the configured interval has elapsed, then
/// encodes and emits the chunk. Flushes whatever is pending when the
/// frame stream closes.
async fn run_chunker(
    mut frames: mpsc::Receiver<AudioFrame>,
    chunks: mpsc::Sender<AudioChunk>,
    interval_ms: u64,
) {
    let mut current: Option<PendingChunk> = None;
    let mut index = 0usize;

    while let Some(frame) = frames.recv().await {
        if frame.samples.is_empty() {
            continue;
        }

        let rotate = match &current {
            None => false,
            Some(chunk) => frame.timestamp_ms.saturating_sub(chunk.start_ms) >= interval_ms,
        };

        if rotate {
            if let Some(pending) = current.take() {
                if !emit_chunk(pending, &mut index, &chunks).await {
                    return;
                }
            }
        }

        current
            .get_or_insert_with(|| PendingChunk::new(&frame))
            .push(&frame);
    }

    // Frame stream closed: flush the final partial chunk
    if let Some(pending) = current.take() {
        emit_chunk(pending, &mut index, &chunks).await;
    }
}

async fn emit_chunk(
    pending: PendingChunk,
    index: &mut usize,
    chunks: &mpsc::Sender<AudioChunk>,
) -> bool {
    match pending.into_chunk(*index) {
        Ok(chunk) => {
            info!(
                "Chunk {} complete: {:.1}s - {:.1}s ({} samples)",
                chunk.index,
                chunk.start_ms as f64 / 1000.0,
                chunk.end_ms as f64 / 1000.0,
                chunk.sample_count
            );

            *index += 1;
            chunks.send(chunk).await.is_ok()
        }
        Err(e) => {
            warn!("Failed to encode audio chunk {}: {}", index, e);
            true
        }
    }
}

/// Samples buffered for the chunk currently being assembled.
struct PendingChunk {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    start_ms: u64,
    end_ms: u64,
}

impl PendingChunk {
    fn new(frame: &AudioFrame) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            start_ms: frame.timestamp_ms,
            end_ms: frame.timestamp_ms,
        }
    }

    fn push(&mut self, frame: &AudioFrame) {
        self.samples.extend_from_slice(&frame.samples);
        self.end_ms = frame.timestamp_ms + frame.duration_ms();
    }

    fn into_chunk(self, index: usize) -> Result<AudioChunk, CaptureError> {
        let sample_count = self.samples.len();
        let bytes = encode_wav(&self.samples, self.sample_rate, self.channels)?;

        Ok(AudioChunk {
            index,
            bytes,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            sample_count,
        })
    }
}

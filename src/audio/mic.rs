use super::backend::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Captures from the default input device via cpal.
///
/// The cpal stream is not `Send`, so it is built and owned by a dedicated
/// thread that parks until capture stops. Frames are handed off from the
/// audio callback with `try_send`; a lagging consumer loses frames rather
/// than stalling the device.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    is_capturing: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            is_capturing: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = oneshot::channel();

        let active = Arc::clone(&self.is_capturing);
        active.store(true, Ordering::SeqCst);

        let thread_active = Arc::clone(&self.is_capturing);
        let preferred_rate = self.config.sample_rate;
        let thread = std::thread::spawn(move || {
            run_input_thread(frame_tx, ready_tx, thread_active, preferred_rate);
        });
        self.thread = Some(thread);

        match ready_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.is_capturing.store(false, Ordering::SeqCst);
                self.join_thread().await;
                Err(e)
            }
            Err(_) => {
                self.is_capturing.store(false, Ordering::SeqCst);
                self.join_thread().await;
                Err(CaptureError::Backend(
                    "capture thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.is_capturing.store(false, Ordering::SeqCst);
        self.join_thread().await;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl MicrophoneBackend {
    async fn join_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }
    }
}

/// Owns the cpal stream for its whole lifetime and reports startup
/// success or failure through the oneshot channel.
fn run_input_thread(
    frames: mpsc::Sender<AudioFrame>,
    ready: oneshot::Sender<Result<(), CaptureError>>,
    active: Arc<AtomicBool>,
    preferred_rate: u32,
) {
    let stream = match build_input_stream(frames, preferred_rate) {
        Ok(stream) => stream,
        Err(e) => {
            active.store(false, Ordering::SeqCst);
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        active.store(false, Ordering::SeqCst);
        let _ = ready.send(Err(CaptureError::DeviceUnavailable(format!(
            "failed to start input stream: {}",
            e
        ))));
        return;
    }

    let _ = ready.send(Ok(()));

    while active.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Dropping the stream ends the callbacks and closes the frame channel
    drop(stream);
}

fn build_input_stream(
    frames: mpsc::Sender<AudioFrame>,
    preferred_rate: u32,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".to_string()))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device.default_input_config().map_err(|e| {
        CaptureError::DeviceUnavailable(format!("no supported input config: {}", e))
    })?;

    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    info!(
        "Microphone capture: {} ({}Hz, {} channels, {:?})",
        device_name, sample_rate, channels, sample_format
    );

    if sample_rate != preferred_rate {
        info!(
            "Device runs at {}Hz, chunks will be downsampled to {}Hz for recognition",
            sample_rate, preferred_rate
        );
    }

    let err_fn = |err| warn!("Audio input stream error: {}", err);

    let mut pusher = FramePusher::new(frames, sample_rate, channels);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _| {
                pusher.push(data.iter().map(|&s| f32_to_i16(s)).collect());
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _| {
                pusher.push(data.to_vec());
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _| {
                pusher.push(data.iter().map(|&s| u16_to_i16(s)).collect());
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::UnsupportedEnvironment(format!(
                "unsupported input sample format: {:?}",
                other
            )));
        }
    }
    .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to build input stream: {}", e)))?;

    Ok(stream)
}

/// Converts callback buffers into timestamped frames. Lives inside the
/// audio callback, so it never blocks.
struct FramePusher {
    frames: mpsc::Sender<AudioFrame>,
    sample_rate: u32,
    channels: u16,
    frames_sent: u64,
}

impl FramePusher {
    fn new(frames: mpsc::Sender<AudioFrame>, sample_rate: u32, channels: u16) -> Self {
        Self {
            frames,
            sample_rate,
            channels,
            frames_sent: 0,
        }
    }

    fn push(&mut self, samples: Vec<i16>) {
        if samples.is_empty() || self.sample_rate == 0 {
            return;
        }

        let timestamp_ms = self.frames_sent * 1000 / self.sample_rate as u64;
        self.frames_sent += (samples.len() / self.channels.max(1) as usize) as u64;

        let frame = AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
        };

        // The device callback must never block
        if self.frames.try_send(frame).is_err() {
            warn!("Dropping audio frame, consumer is lagging");
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn u16_to_i16(sample: u16) -> i16 {
    (sample as i32 - 32768) as i16
}

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Sample rate the recognizer consumes.
pub const RECOGNIZER_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed audio chunk: {0}")]
    Malformed(String),

    #[error("audio chunk contains no decodable track")]
    NoAudioTrack,

    #[error("unsupported sample rate {0}Hz, chunks must be at least 16kHz")]
    UnsupportedSampleRate(u32),
}

/// Decode an opaque chunk payload into mono f32 samples at 16kHz.
///
/// The container is probed rather than assumed, so any format symphonia
/// recognizes is accepted. Channels are downmixed by averaging and higher
/// sample rates are reduced by decimation.
pub fn decode_chunk(bytes: Vec<u8>) -> Result<Vec<f32>, DecodeError> {
    let (samples, sample_rate) = decode_to_mono(bytes)?;
    downsample(samples, sample_rate, RECOGNIZER_SAMPLE_RATE)
}

/// Decode a chunk payload into mono f32 samples at its native rate.
pub fn decode_to_mono(bytes: Vec<u8>) -> Result<(Vec<f32>, u32), DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let mut format = probed.format;

    let track = format.default_track().ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::Malformed("track is missing a sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Malformed(format!("unsupported codec: {}", e)))?;

    let mut mono = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => break,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Recoverable per-packet corruption, skip and continue
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        if sample_buf.is_none() {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }
    }

    Ok((mono, sample_rate))
}

/// Reduce the sample rate by nearest-sample decimation. Upsampling is
/// not supported.
fn downsample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>, DecodeError> {
    if from_rate == to_rate {
        return Ok(samples);
    }

    if from_rate < to_rate {
        return Err(DecodeError::UnsupportedSampleRate(from_rate));
    }

    let step = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / step).floor() as usize;

    let downsampled = (0..out_len)
        .map(|i| samples[(i as f64 * step) as usize])
        .collect();

    Ok(downsampled)
}

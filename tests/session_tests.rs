// Integration tests for the transcription session lifecycle
//
// These tests run full recordings against WAV files with stubbed
// recognition: start/stop gating, draft accumulation and auto-save,
// participant handling, and discarding of late recognition results.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use meetscribe::audio::AudioSource;
use meetscribe::recognize::{
    ModelLoader, ModelTier, RecognitionModel, RecognizeError, Recognizer,
};
use meetscribe::session::{SessionConfig, SessionError, SessionState, TranscriptionSession};
use meetscribe::store::TranscriptionStore;
use tempfile::TempDir;

fn write_wav(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(())
}

/// Five seconds of 16kHz mono audio, which chunks into 2s + 2s + 1s.
fn write_five_second_wav(path: &Path) -> Result<()> {
    let samples: Vec<i16> = (0..80_000).map(|i| (i % 997) as i16).collect();
    write_wav(path, &samples, 16_000, 1)
}

/// Produces "fragment 0", "fragment 1", ... in call order.
struct ScriptedModel {
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl RecognitionModel for ScriptedModel {
    fn model_id(&self) -> String {
        "scripted".to_string()
    }

    fn transcribe(&self, _samples: &[f32]) -> Result<String, RecognizeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("fragment {}", n))
    }
}

struct StubLoader {
    model: Arc<ScriptedModel>,
}

#[async_trait]
impl ModelLoader for StubLoader {
    async fn load(&self, _tier: ModelTier) -> Result<Arc<dyn RecognitionModel>, RecognizeError> {
        Ok(Arc::clone(&self.model) as Arc<dyn RecognitionModel>)
    }
}

/// Blocks the first transcription until the test releases it.
struct GatedModel {
    gate: StdMutex<Option<std::sync::mpsc::Receiver<()>>>,
}

impl RecognitionModel for GatedModel {
    fn model_id(&self) -> String {
        "gated".to_string()
    }

    fn transcribe(&self, _samples: &[f32]) -> Result<String, RecognizeError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        Ok("ghost fragment".to_string())
    }
}

struct GatedLoader {
    model: Arc<GatedModel>,
}

#[async_trait]
impl ModelLoader for GatedLoader {
    async fn load(&self, _tier: ModelTier) -> Result<Arc<dyn RecognitionModel>, RecognizeError> {
        Ok(Arc::clone(&self.model) as Arc<dyn RecognitionModel>)
    }
}

/// Only the base tier has a model available.
struct BaseOnlyLoader;

#[async_trait]
impl ModelLoader for BaseOnlyLoader {
    async fn load(&self, tier: ModelTier) -> Result<Arc<dyn RecognitionModel>, RecognizeError> {
        match tier {
            ModelTier::Base => Ok(Arc::new(ScriptedModel::new()) as Arc<dyn RecognitionModel>),
            ModelTier::Small => Err(RecognizeError::ModelUnavailable(
                "small model missing".to_string(),
            )),
        }
    }
}

async fn ready_session(
    wav_path: &Path,
    store: Arc<TranscriptionStore>,
    config: SessionConfig,
) -> Result<TranscriptionSession> {
    let loader = Arc::new(StubLoader {
        model: Arc::new(ScriptedModel::new()),
    });
    let recognizer = Arc::new(Recognizer::new(loader));
    recognizer.ensure_loaded(config.tier).await?;

    Ok(TranscriptionSession::new(
        config,
        AudioSource::parse(wav_path.to_str().unwrap()),
        recognizer,
        store,
    ))
}

/// Poll session stats until the whole file has been recognized.
async fn wait_for_fragments(session: &TranscriptionSession, count: usize) -> bool {
    for _ in 0..200 {
        if session.stats().await.fragments_recognized >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[tokio::test]
async fn test_start_requires_a_ready_model() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let loader = Arc::new(StubLoader {
        model: Arc::new(ScriptedModel::new()),
    });
    // No ensure_loaded, so the tier is still NotLoaded
    let recognizer = Arc::new(Recognizer::new(loader));
    let session = TranscriptionSession::new(
        SessionConfig::default(),
        AudioSource::parse(wav_path.to_str().unwrap()),
        recognizer,
        store,
    );

    let err = session.start().await.expect_err("start should be blocked");
    assert!(matches!(err, SessionError::ModelNotReady { .. }));

    // The rejected start must leave the session idle
    assert_eq!(session.stats().await.state, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_recording_transcribes_and_saves_on_stop() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let session = ready_session(&wav_path, store.clone(), SessionConfig::default()).await?;

    session
        .set_participants(vec![
            "Alice".to_string(),
            "Bob".to_string(),
            "Alice".to_string(),
        ])
        .await;

    session.start().await?;
    assert_eq!(session.stats().await.state, SessionState::Recording);

    assert!(
        wait_for_fragments(&session, 3).await,
        "All three chunks should be recognized"
    );

    let saved = session
        .stop()
        .await?
        .expect("auto-save should produce a meeting");

    // Fragments land in capture order, joined with spaces
    assert_eq!(saved.text, "fragment 0 fragment 1 fragment 2");
    assert_eq!(saved.participants, vec!["Alice", "Bob"]);
    assert!(saved.id.starts_with("meeting-"));

    // The draft resets after a save; participants carry over
    assert_eq!(session.transcript().await, "");
    assert_eq!(session.participants().await, vec!["Alice", "Bob"]);

    let listed = store.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);

    Ok(())
}

#[tokio::test]
async fn test_double_start_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let session = ready_session(&wav_path, store, SessionConfig::default()).await?;

    session.start().await?;
    let err = session.start().await.expect_err("second start should fail");
    assert!(matches!(err, SessionError::AlreadyRecording));

    session.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_when_idle_is_a_no_op() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let session = ready_session(&wav_path, store, SessionConfig::default()).await?;

    assert!(session.stop().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_save_draft_rejects_empty_and_mid_recording() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let session = ready_session(&wav_path, store, SessionConfig::default()).await?;

    // Nothing recognized yet
    let err = session.save_draft().await.expect_err("empty draft");
    assert!(matches!(err, SessionError::EmptyTranscript));

    // Saving is blocked while a recording is active
    session.start().await?;
    let err = session.save_draft().await.expect_err("mid-recording save");
    assert!(matches!(err, SessionError::StillRecording));
    session.stop().await?;

    Ok(())
}

#[tokio::test]
async fn test_manual_edits_are_saved_as_given() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let session = ready_session(&wav_path, store, SessionConfig::default()).await?;

    session
        .set_transcript("  Manually edited notes  ".to_string())
        .await;
    let saved = session.save_draft().await?;

    assert_eq!(saved.text, "Manually edited notes");
    assert_eq!(session.transcript().await, "");

    Ok(())
}

#[tokio::test]
async fn test_stop_without_auto_save_keeps_the_draft() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let config = SessionConfig {
        auto_save_on_stop: false,
        ..SessionConfig::default()
    };
    let session = ready_session(&wav_path, store.clone(), config).await?;

    session.start().await?;
    assert!(wait_for_fragments(&session, 3).await);

    assert!(session.stop().await?.is_none(), "No auto-save expected");
    assert!(store.list().await.is_empty());

    // The draft survives the stop and can be saved explicitly
    let saved = session.save_draft().await?;
    assert_eq!(saved.text, "fragment 0 fragment 1 fragment 2");
    assert_eq!(store.list().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_stop_discards_recognition_still_in_flight() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);

    let (release, gate) = std::sync::mpsc::channel();
    let loader = Arc::new(GatedLoader {
        model: Arc::new(GatedModel {
            gate: StdMutex::new(Some(gate)),
        }),
    });
    let recognizer = Arc::new(Recognizer::new(loader));
    recognizer.ensure_loaded(ModelTier::Base).await?;

    let session = Arc::new(TranscriptionSession::new(
        SessionConfig::default(),
        AudioSource::parse(wav_path.to_str().unwrap()),
        recognizer,
        store.clone(),
    ));

    session.start().await?;

    // Wait until the first chunk is inside recognition
    let mut picked_up = false;
    for _ in 0..200 {
        if session.stats().await.chunks_captured >= 1 {
            picked_up = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(picked_up, "The drain task should pick up the first chunk");

    // Stop while recognition is blocked, then let it finish
    let stopper = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.stop().await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    release.send(()).expect("gate receiver should still be alive");

    let saved = stopper.await??;

    // The late result must not leak into the draft or the store
    assert!(saved.is_none(), "Nothing recognized before the stop");
    assert_eq!(session.transcript().await, "");
    assert_eq!(session.stats().await.fragments_recognized, 0);
    assert!(store.list().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_set_tier_only_switches_after_a_successful_load() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("meeting.wav");
    write_five_second_wav(&wav_path)?;

    let store = Arc::new(TranscriptionStore::open(temp_dir.path().join("meetings.json")).await);
    let recognizer = Arc::new(Recognizer::new(Arc::new(BaseOnlyLoader)));
    recognizer.ensure_loaded(ModelTier::Base).await?;

    let session = TranscriptionSession::new(
        SessionConfig::default(),
        AudioSource::parse(wav_path.to_str().unwrap()),
        recognizer,
        store,
    );

    assert_eq!(session.active_tier().await, ModelTier::Base);

    let err = session
        .set_tier(ModelTier::Small)
        .await
        .expect_err("the small model cannot load");
    assert!(matches!(
        err,
        SessionError::Recognize(RecognizeError::ModelUnavailable(_))
    ));

    // A failed switch leaves the old tier active and usable
    assert_eq!(session.active_tier().await, ModelTier::Base);
    session.start().await?;
    session.stop().await?;

    Ok(())
}

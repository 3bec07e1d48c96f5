// Integration tests for meeting summary generation
//
// These tests run the SummaryClient against stub generators: prompt
// construction, output cleanup, the per-meeting in-flight guard, and
// failure propagation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use anyhow::Result;
use async_trait::async_trait;
use meetscribe::summary::{SummaryClient, SummaryError, SummaryRequest, TextGenerator};
use tokio::sync::oneshot;
use tokio::sync::Mutex as TokioMutex;

/// Records every prompt and replies with a fixed string.
struct RecordingGenerator {
    prompts: StdMutex<Vec<String>>,
    calls: AtomicUsize,
    reply: String,
}

impl RecordingGenerator {
    fn new(reply: &str) -> Self {
        Self {
            prompts: StdMutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "recording-stub"
    }
}

/// Signals when generation starts and blocks until the test releases it.
struct GatedGenerator {
    entered: TokioMutex<Option<oneshot::Sender<()>>>,
    release: TokioMutex<Option<oneshot::Receiver<()>>>,
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, SummaryError> {
        if let Some(entered) = self.entered.lock().await.take() {
            let _ = entered.send(());
        }
        let release = self.release.lock().await.take();
        if let Some(release) = release {
            let _ = release.await;
        }
        Ok("### Topic\n- point".to_string())
    }

    fn name(&self) -> &str {
        "gated-stub"
    }
}

struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, SummaryError> {
        Err(SummaryError::GenerationFailed(
            "upstream returned 500: quota exceeded".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "failing-stub"
    }
}

fn request(text: &str, participants: &[&str]) -> SummaryRequest {
    SummaryRequest {
        text: text.to_string(),
        participants: participants.iter().map(|p| p.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_empty_transcripts_never_reach_the_generator() -> Result<()> {
    let generator = Arc::new(RecordingGenerator::new("### Topic"));
    let client = SummaryClient::new(generator.clone());

    let err = client
        .generate_summary("meeting-1", &request("   \n  ", &[]))
        .await
        .expect_err("whitespace-only text should be rejected");
    assert!(matches!(err, SummaryError::EmptyText));

    assert_eq!(
        generator.calls.load(Ordering::SeqCst),
        0,
        "No upstream call should be made for empty text"
    );

    Ok(())
}

#[tokio::test]
async fn test_prompt_carries_transcript_and_participants() -> Result<()> {
    let generator = Arc::new(RecordingGenerator::new("### Decisions\n- approved"));
    let client = SummaryClient::new(generator.clone());

    let summary = client
        .generate_summary(
            "meeting-1",
            &request("The budget was approved for Q3.", &["Ana", "Raj"]),
        )
        .await?;

    assert_eq!(summary, "Summary\n\n### Decisions\n- approved");

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("This meeting included 2 participants: Ana, Raj."));
    assert!(prompts[0].contains("The budget was approved for Q3."));
    assert!(prompts[0].contains(r####"**Always include the "### Action Items" section.**"####));

    Ok(())
}

#[tokio::test]
async fn test_fenced_generator_output_is_cleaned() -> Result<()> {
    let generator = Arc::new(RecordingGenerator::new(
        "```markdown\n### Topic\n- fenced point\n```",
    ));
    let client = SummaryClient::new(generator);

    let summary = client
        .generate_summary("meeting-1", &request("something happened", &[]))
        .await?;

    assert_eq!(summary, "Summary\n\n### Topic\n- fenced point");

    Ok(())
}

#[tokio::test]
async fn test_concurrent_generation_for_one_meeting_is_rejected() -> Result<()> {
    let (entered_tx, entered_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();

    let generator = Arc::new(GatedGenerator {
        entered: TokioMutex::new(Some(entered_tx)),
        release: TokioMutex::new(Some(release_rx)),
    });
    let client = Arc::new(SummaryClient::new(generator));

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .generate_summary("meeting-1", &request("first call", &[]))
                .await
        })
    };

    // Wait for the first generation to be inside the generator
    entered_rx.await?;

    let err = client
        .generate_summary("meeting-1", &request("second call", &[]))
        .await
        .expect_err("the same meeting id should be rejected while pending");
    assert!(matches!(err, SummaryError::AlreadyInFlight(_)));

    // Other meetings are not affected by the guard
    let other = client
        .generate_summary("meeting-2", &request("other meeting", &[]))
        .await?;
    assert!(other.starts_with("Summary\n\n"));

    // Release the first call and verify the guard clears with it
    release_tx.send(()).expect("generator should be waiting");
    let first = pending.await??;
    assert_eq!(first, "Summary\n\n### Topic\n- point");

    let again = client
        .generate_summary("meeting-1", &request("retry call", &[]))
        .await?;
    assert!(again.starts_with("Summary\n\n"));

    Ok(())
}

#[tokio::test]
async fn test_generator_failures_propagate_and_clear_the_guard() -> Result<()> {
    let client = SummaryClient::new(Arc::new(FailingGenerator));

    let err = client
        .generate_summary("meeting-1", &request("some text", &[]))
        .await
        .expect_err("the failing generator should surface its error");
    match err {
        SummaryError::GenerationFailed(detail) => {
            assert!(detail.contains("quota exceeded"), "got: {}", detail)
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The guard must not stay behind after a failure
    let err = client
        .generate_summary("meeting-1", &request("some text", &[]))
        .await
        .expect_err("still failing, but not in-flight");
    assert!(matches!(err, SummaryError::GenerationFailed(_)));

    Ok(())
}

/// Collects recognized text fragments for the current recording session.
///
/// Fragments are appended in arrival order and joined with a trailing
/// space. The buffer is cleared after a successful save.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    text: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a recognized fragment followed by a single space.
    pub fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.text.push(' ');
    }

    /// Replace the draft wholesale (manual edits before saving).
    pub fn set(&mut self, text: String) {
        self.text = text;
    }

    /// Current draft, including the trailing join space.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Draft with surrounding whitespace removed, as used for saving.
    pub fn trimmed(&self) -> String {
        self.text.trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Clear the draft after a successful save.
    pub fn reset(&mut self) {
        self.text.clear();
    }
}

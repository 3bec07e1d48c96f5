// Meeting summary generation against an upstream text model.

pub mod client;
pub mod gemini;

pub use client::{SummaryClient, SummaryError, SummaryRequest, TextGenerator};
pub use gemini::GeminiGenerator;

// Local persistence for saved meeting transcriptions.

pub mod meeting;
pub mod store;

pub use meeting::Meeting;
pub use store::{ImportOutcome, StorageHealth, StoreError, TranscriptionStore};

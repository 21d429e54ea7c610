//! Services module
//!
//! Business logic services that coordinate between the HTTP routes,
//! the repository and the blob store.

pub mod attachments;
pub mod notes;
pub mod sync;

pub use attachments::AttachmentsService;
pub use notes::NotesService;
pub use sync::{SyncDelta, SyncService};

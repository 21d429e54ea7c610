//! Storage module
//!
//! Provides blob storage for binary data (images, attachments).

pub mod blob_store;

pub use blob_store::BlobStore;

//! notesync library
//!
//! Personal notes backend: folders, notes, attachments and a
//! last-write-wins sync endpoint, served over HTTP by the `notesync` binary.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod services;
pub mod storage;

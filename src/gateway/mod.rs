//! Notes API gateway
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `NotesApi` trait: one async method per HTTP endpoint
//! - `HttpNotesApi`: real implementation over reqwest
//! - `MockNotesApi`: in-memory server double for tests

pub mod client;
pub mod error;
pub mod mock;
pub mod traits;

pub use client::HttpNotesApi;
pub use error::{ApiError, Result};
pub use mock::MockNotesApi;
pub use traits::NotesApi;

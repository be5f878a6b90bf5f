//! Knowledge notes module
//!
//! Models shared with the API, and the client-side store that caches notes,
//! tracks selection and filters, and reconciles every gateway response into
//! its state.

pub mod events;
pub mod models;
pub mod store;

pub use events::{StoreEvent, StoreEvents};
pub use models::*;
pub use store::{LoadNotesParams, NotesState, NotesStore};

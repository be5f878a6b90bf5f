//! Change notifications published by the notes store

use super::models::NoteId;
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 256;

/// A reconciliation step that changed store state.
///
/// Published while the state lock is held, so events arrive in the order the
/// changes were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The whole note list was replaced by a list load
    NotesReplaced { count: usize },
    /// A note was inserted at the front of the list
    NoteInserted { id: NoteId },
    /// Cached entries for a note were replaced with a fresh copy
    NoteReplaced { id: NoteId },
    /// Cached entries for a note were removed
    NoteRemoved { id: NoteId },
    /// The selected note changed
    SelectionChanged { selected: Option<NoteId> },
    /// The persisted search keyword or tag filter changed
    FiltersChanged {
        search_keyword: String,
        tag_filter: Option<String>,
    },
    /// The tag statistics were replaced
    TagsReplaced { count: usize },
    /// The loading flag flipped
    LoadingChanged { loading: bool },
    /// The store was reset to its initial state
    Reset,
}

/// Broadcasts [`StoreEvent`]s to any number of subscribers.
///
/// Fire-and-forget: emitting never blocks, never panics. Without subscribers
/// events are silently dropped; slow subscribers observe `Lagged`.
#[derive(Debug, Clone)]
pub struct StoreEvents {
    sender: broadcast::Sender<StoreEvent>,
}

impl StoreEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn emit(&self, event: StoreEvent) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        debug!(event = ?event, "store event emitted");
        let _ = self.sender.send(event);
    }

    pub fn emit_all(&self, events: impl IntoIterator<Item = StoreEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

impl Default for StoreEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

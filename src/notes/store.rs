//! Notes Store - client-side cache of notes, selection and filters
//!
//! Every action awaits exactly one gateway call and then reconciles the result
//! into the cached state. Reconciliation runs under a short synchronous lock
//! that is never held across an await, so concurrent actions interleave only
//! at their network calls. There is no sequencing token: when two actions
//! resolve out of issue order, the one resolving last wins.

use super::events::{StoreEvent, StoreEvents};
use super::models::{
    KnowledgeItem, KnowledgePayload, KnowledgeUpdate, ListQuery, NoteId, TagStat,
};
use crate::gateway::{NotesApi, Result};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tokio::sync::broadcast;
use tracing::debug;

// ============================================================================
// State
// ============================================================================

/// Snapshot of everything the store tracks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesState {
    /// Cached notes, front = most recently inserted
    pub notes: Vec<KnowledgeItem>,
    /// Focused note; `None` or (normally) the id of a cached note
    pub selected_id: Option<NoteId>,
    /// Persisted free-text filter, empty = no filter
    pub search_keyword: String,
    /// Persisted tag filter
    pub tag_filter: Option<String>,
    pub loading: bool,
    pub tags: Vec<TagStat>,
}

impl NotesState {
    /// The cached note matching the selected id, if any
    pub fn selected_note(&self) -> Option<&KnowledgeItem> {
        let id = self.selected_id?;
        self.notes.iter().find(|n| n.id == id)
    }

    /// Query built from the persisted filters
    pub fn list_query(&self) -> ListQuery {
        ListQuery::new(Some(&self.search_keyword), self.tag_filter.as_deref())
    }

    fn first_id(&self) -> Option<NoteId> {
        self.notes.first().map(|n| n.id)
    }

    fn contains(&self, id: NoteId) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }

    fn set_selected(&mut self, selected: Option<NoteId>, events: &mut Vec<StoreEvent>) {
        if self.selected_id != selected {
            self.selected_id = selected;
            events.push(StoreEvent::SelectionChanged { selected });
        }
    }

    fn set_loading(&mut self, loading: bool, events: &mut Vec<StoreEvent>) {
        if self.loading != loading {
            self.loading = loading;
            events.push(StoreEvent::LoadingChanged { loading });
        }
    }

    /// Apply `load_notes` overrides. An empty tag clears the tag filter.
    fn apply_filters(
        &mut self,
        q: Option<String>,
        tag: Option<String>,
        events: &mut Vec<StoreEvent>,
    ) {
        let mut changed = false;
        if let Some(q) = q {
            changed |= self.search_keyword != q;
            self.search_keyword = q;
        }
        if let Some(tag) = tag {
            let tag = Some(tag).filter(|t| !t.is_empty());
            changed |= self.tag_filter != tag;
            self.tag_filter = tag;
        }
        if changed {
            events.push(StoreEvent::FiltersChanged {
                search_keyword: self.search_keyword.clone(),
                tag_filter: self.tag_filter.clone(),
            });
        }
    }

    /// Replace the whole list, then repair the selection: keep it if the
    /// selected note survived, otherwise fall back to the first note.
    fn replace_notes(&mut self, notes: Vec<KnowledgeItem>, events: &mut Vec<StoreEvent>) {
        self.notes = notes;
        events.push(StoreEvent::NotesReplaced {
            count: self.notes.len(),
        });

        let keep = matches!(self.selected_id, Some(id) if self.contains(id));
        if !keep {
            let first = self.first_id();
            self.set_selected(first, events);
        }
    }

    /// Replace a cached note in place, or insert it at the front
    fn upsert_fetched(&mut self, item: KnowledgeItem, events: &mut Vec<StoreEvent>) {
        let id = item.id;
        match self.notes.iter().position(|n| n.id == id) {
            Some(idx) => {
                self.notes[idx] = item;
                events.push(StoreEvent::NoteReplaced { id });
            }
            None => {
                self.notes.insert(0, item);
                events.push(StoreEvent::NoteInserted { id });
            }
        }
    }

    fn insert_created(&mut self, item: KnowledgeItem, events: &mut Vec<StoreEvent>) {
        let id = item.id;
        self.notes.insert(0, item);
        events.push(StoreEvent::NoteInserted { id });
        self.set_selected(Some(id), events);
    }

    /// Swap every cached copy of `id` for the server's version and select it.
    /// Length and order of the list never change.
    fn apply_update(&mut self, id: NoteId, item: KnowledgeItem, events: &mut Vec<StoreEvent>) {
        let mut replaced = false;
        for note in self.notes.iter_mut().filter(|n| n.id == id) {
            *note = item.clone();
            replaced = true;
        }
        if replaced {
            events.push(StoreEvent::NoteReplaced { id });
        }
        self.set_selected(Some(id), events);
    }

    fn remove(&mut self, id: NoteId, events: &mut Vec<StoreEvent>) {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() != before {
            events.push(StoreEvent::NoteRemoved { id });
        }
        if self.selected_id == Some(id) {
            let first = self.first_id();
            self.set_selected(first, events);
        }
    }

    fn replace_tags(&mut self, tags: Vec<TagStat>, events: &mut Vec<StoreEvent>) {
        self.tags = tags;
        events.push(StoreEvent::TagsReplaced {
            count: self.tags.len(),
        });
    }
}

/// Filter overrides for [`NotesStore::load_notes`].
///
/// A supplied value is stored in the store and stays in effect for later
/// loads; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadNotesParams {
    pub q: Option<String>,
    pub tag: Option<String>,
}

impl LoadNotesParams {
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            tag: None,
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            q: None,
            tag: Some(tag.into()),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Client-side notes store.
///
/// One instance per consumer context; share it as `Arc<NotesStore>` when
/// several tasks drive it. All accessors return owned copies of the current
/// state.
pub struct NotesStore {
    api: Arc<dyn NotesApi>,
    state: RwLock<NotesState>,
    events: StoreEvents,
}

/// Clears the loading flag when dropped, whichever way `load_notes` exits.
struct LoadingGuard<'a> {
    store: &'a NotesStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store
            .reconcile(|state, events| state.set_loading(false, events));
    }
}

impl NotesStore {
    /// Create a store with empty state
    pub fn new(api: Arc<dyn NotesApi>) -> Self {
        Self::from_state(api, NotesState::default())
    }

    /// Create a store starting from a previously captured snapshot
    pub fn from_state(api: Arc<dyn NotesApi>, state: NotesState) -> Self {
        Self {
            api,
            state: RwLock::new(state),
            events: StoreEvents::default(),
        }
    }

    /// Use an existing event channel (builder pattern).
    pub fn with_events(mut self, events: StoreEvents) -> Self {
        self.events = events;
        self
    }

    /// Receive a [`StoreEvent`] for every state change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, NotesState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one synchronous reconciliation step and publish its events.
    ///
    /// Events are sent while the write lock is still held so subscribers see
    /// them in the same order as the state changes. `broadcast::send` never
    /// blocks.
    fn reconcile<R>(&self, f: impl FnOnce(&mut NotesState, &mut Vec<StoreEvent>) -> R) -> R {
        let mut events = Vec::new();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state, &mut events);
        self.events.emit_all(events);
        result
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Copy of the full current state
    pub fn snapshot(&self) -> NotesState {
        self.read().clone()
    }

    pub fn notes(&self) -> Vec<KnowledgeItem> {
        self.read().notes.clone()
    }

    pub fn selected_id(&self) -> Option<NoteId> {
        self.read().selected_id
    }

    /// The cached note whose id equals the selected id, if any
    pub fn selected_note(&self) -> Option<KnowledgeItem> {
        self.read().selected_note().cloned()
    }

    pub fn search_keyword(&self) -> String {
        self.read().search_keyword.clone()
    }

    pub fn tag_filter(&self) -> Option<String> {
        self.read().tag_filter.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn tags(&self) -> Vec<TagStat> {
        self.read().tags.clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Restore the initial empty state
    pub fn reset(&self) {
        self.reconcile(|state, events| {
            *state = NotesState::default();
            events.push(StoreEvent::Reset);
        });
    }

    /// Tear the store down and hand back its final state
    pub fn into_state(self) -> NotesState {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Reload the note list with the persisted filters.
    ///
    /// Overrides in `params` are written to the store before the request and
    /// stay applied even if the request fails.
    pub async fn load_notes(&self, params: LoadNotesParams) -> Result<Vec<KnowledgeItem>> {
        let query = self.reconcile(|state, events| {
            state.set_loading(true, events);
            state.apply_filters(params.q, params.tag, events);
            state.list_query()
        });
        let _loading = LoadingGuard { store: self };

        let notes = self.api.list_notes(&query).await?;
        debug!(
            count = notes.len(),
            q = ?query.q,
            tag = ?query.tag,
            "Loaded notes"
        );

        self.reconcile(|state, events| state.replace_notes(notes.clone(), events));
        Ok(notes)
    }

    /// Select a note. No existence check: the caller passes a valid id.
    pub fn select(&self, id: NoteId) {
        self.reconcile(|state, events| state.set_selected(Some(id), events));
    }

    /// Fetch one note and refresh or insert it in the cache.
    /// Selection is left untouched.
    pub async fn fetch_note(&self, id: NoteId) -> Result<KnowledgeItem> {
        let item = self.api.get_note(id).await?;
        debug!(note_id = id, "Fetched note");
        self.reconcile(|state, events| state.upsert_fetched(item.clone(), events));
        Ok(item)
    }

    /// Create a note, put it at the front of the list and select it
    pub async fn add_note(&self, payload: KnowledgePayload) -> Result<KnowledgeItem> {
        let item = self.api.create_note(&payload).await?;
        debug!(note_id = item.id, "Created note");
        self.reconcile(|state, events| state.insert_created(item.clone(), events));
        Ok(item)
    }

    /// Send a partial update, replace the cached copies with the server's
    /// version and select the note
    pub async fn update_note(&self, id: NoteId, update: KnowledgeUpdate) -> Result<KnowledgeItem> {
        let item = self.api.update_note(id, &update).await?;
        debug!(note_id = id, "Updated note");
        self.reconcile(|state, events| state.apply_update(id, item.clone(), events));
        Ok(item)
    }

    /// Delete a note and drop it from the cache. A removed selection moves
    /// to the first remaining note.
    pub async fn remove_note(&self, id: NoteId) -> Result<()> {
        self.api.delete_note(id).await?;
        debug!(note_id = id, "Deleted note");
        self.reconcile(|state, events| state.remove(id, events));
        Ok(())
    }

    /// Reload tag statistics
    pub async fn load_tags(&self) -> Result<Vec<TagStat>> {
        let tags = self.api.list_tags().await?;
        debug!(count = tags.len(), "Loaded tags");
        self.reconcile(|state, events| state.replace_tags(tags.clone(), events));
        Ok(tags)
    }

    /// Fetch every note from the server. The cache is not touched.
    pub async fn export_all(&self) -> Result<Vec<KnowledgeItem>> {
        self.api.export_notes().await
    }
}

// ============================================================================
// Tests
// ============================================================================

//! An open diagram: model store, undo history, gesture controller and
//! auto-save bookkeeping behind one event entry point.

use crate::config::EditorConfig;
use crate::gesture::{GestureController, GestureEffect, Overlay};
use crate::history::History;
use crate::input::GestureEvent;
use crate::model::Diagram;
use crate::storage::{AutoSaver, DiagramStorage, StorageResult};
use crate::store::{DiagramStore, ModelEvent};

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Editing session for a single diagram.
#[derive(Debug)]
pub struct EditorSession {
    store: DiagramStore,
    history: History,
    controller: GestureController,
    autosave: AutoSaver,
}

impl EditorSession {
    /// Open a persisted document. Its current state becomes the first
    /// history entry and counts as saved.
    pub fn open(diagram: Diagram, config: EditorConfig) -> Self {
        Self::from_store(DiagramStore::from_document(diagram, config))
    }

    /// Start an unsaved empty diagram.
    pub fn create(name: impl Into<String>, config: EditorConfig) -> Self {
        let mut session = Self::from_store(DiagramStore::new(name, config));
        session.autosave.mark_unsaved();
        session
    }

    fn from_store(store: DiagramStore) -> Self {
        let config = store.config();
        let mut history = History::new(config.max_history);
        history.commit(store.snapshot());
        let mut autosave = AutoSaver::new(config.autosave_quiet_period());
        autosave.reset(store.generation());
        Self {
            store,
            history,
            controller: GestureController::new(),
            autosave,
        }
    }

    pub fn store(&self) -> &DiagramStore {
        &self.store
    }

    /// Direct model access for hosts that edit outside gestures.
    pub fn store_mut(&mut self) -> &mut DiagramStore {
        &mut self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn controller(&self) -> &GestureController {
        &self.controller
    }

    pub fn overlay(&self) -> &Overlay {
        self.controller.overlay()
    }

    pub fn autosave(&self) -> &AutoSaver {
        &self.autosave
    }

    /// Feed one input event through the gesture machine.
    pub fn dispatch(&mut self, event: GestureEvent) -> Vec<GestureEffect> {
        let effects = self.controller.handle(event, &mut self.store, &mut self.history);
        self.autosave.observe(self.store.generation());
        effects
    }

    /// Model change notifications since the last call, for the renderer.
    pub fn drain_events(&mut self) -> Vec<ModelEvent> {
        self.store.drain_events()
    }

    /// Snapshot the model and record it as a history step.
    ///
    /// For edits made through `store_mut`.
    pub fn commit(&mut self) {
        self.history.commit(self.store.snapshot());
        self.autosave.observe(self.store.generation());
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    /// Write the current document now.
    pub async fn save<S: DiagramStorage + ?Sized>(&mut self, storage: &S) -> StorageResult<Diagram> {
        let ticket = self.autosave.begin();
        match storage.put(&self.store.to_document()).await {
            Ok(saved) => {
                self.store.mark_saved(&saved);
                self.autosave.finish(ticket, true);
                log::info!("Saved diagram {} at revision {:?}", saved.id, saved.revision);
                Ok(saved)
            }
            Err(err) => {
                self.autosave.finish(ticket, false);
                Err(err)
            }
        }
    }

    /// Save if the model has been quiet long enough. Returns whether a
    /// save succeeded; failures are logged and retried on a later tick.
    pub async fn autosave_tick<S: DiagramStorage + ?Sized>(&mut self, storage: &S) -> bool {
        self.autosave_tick_at(storage, Instant::now()).await
    }

    pub async fn autosave_tick_at<S: DiagramStorage + ?Sized>(&mut self, storage: &S, now: Instant) -> bool {
        if !self.autosave.should_save_at(now) {
            return false;
        }
        let ticket = self.autosave.begin();
        match storage.put(&self.store.to_document()).await {
            Ok(saved) => {
                self.store.mark_saved(&saved);
                self.autosave.finish_at(ticket, true, now);
                log::info!("Auto-saved diagram {} at revision {:?}", saved.id, saved.revision);
                true
            }
            Err(err) => {
                log::warn!("Auto-save of {} failed: {err}", self.store.id());
                self.autosave.finish_at(ticket, false, now);
                false
            }
        }
    }
}

//! Single-todo screen state with its edit mode.
//!
//! # Design
//! Loading and every write target the same record, so at most one request
//! is in flight at a time. A load cannot land on top of a confirmed save,
//! and a write never races a load. Anything started meanwhile gets `Busy`.

use std::cell::RefCell;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use super::{event_channel, Confirmation, InFlight, Outcome, ViewEvent};
use crate::api::TodoApi;
use crate::error::ViewError;
use crate::transport::Transport;
use crate::types::{EditDraft, Todo, TodoId, TodoPatch, TodoStatus};

/// What the detail screen should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailView {
    Loading,
    /// Loading failed and there is nothing to show; offer a way back.
    Failed { error: ViewError },
    Loaded {
        todo: Todo,
        editing: bool,
        error: Option<ViewError>,
    },
    /// The record was deleted; the caller should navigate away.
    Deleted,
}

/// Claimed exclusively: a load and a write never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Load,
    /// Save, status change or delete.
    Write,
}

#[derive(Default)]
struct DetailState {
    record: Option<Todo>,
    draft: Option<EditDraft>,
    is_editing: bool,
    deleted: bool,
    last_error: Option<ViewError>,
}

impl DetailState {
    fn adopt(&mut self, todo: Todo) {
        self.draft = Some(EditDraft::from_todo(&todo));
        self.record = Some(todo);
    }

    fn fail(&mut self, action: &'static str, err: impl Into<ViewError>) -> Outcome {
        let err = err.into();
        warn!(action, error = %err, "todo detail action failed");
        self.last_error = Some(err);
        Outcome::Failed
    }
}

/// State of the single-todo screen, including its edit mode.
pub struct DetailViewModel<T> {
    api: Arc<TodoApi<T>>,
    state: RefCell<DetailState>,
    in_flight: InFlight<Slot>,
    events: broadcast::Sender<ViewEvent>,
}

impl<T: Transport> DetailViewModel<T> {
    pub fn new(api: Arc<TodoApi<T>>) -> Self {
        Self::with_events(api, event_channel())
    }

    pub fn with_events(api: Arc<TodoApi<T>>, events: broadcast::Sender<ViewEvent>) -> Self {
        Self {
            api,
            state: RefCell::new(DetailState::default()),
            in_flight: InFlight::default(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub fn record(&self) -> Option<Todo> {
        self.state.borrow().record.clone()
    }

    pub fn draft(&self) -> Option<EditDraft> {
        self.state.borrow().draft.clone()
    }

    pub fn is_editing(&self) -> bool {
        self.state.borrow().is_editing
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.contains(&Slot::Load)
    }

    /// A save, status change or delete is waiting on the server; the
    /// matching buttons should be disabled.
    pub fn is_saving(&self) -> bool {
        self.in_flight.contains(&Slot::Write)
    }

    pub fn is_deleted(&self) -> bool {
        self.state.borrow().deleted
    }

    pub fn last_error(&self) -> Option<ViewError> {
        self.state.borrow().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state.borrow_mut().last_error = None;
    }

    pub fn view(&self) -> DetailView {
        let state = self.state.borrow();
        if state.deleted {
            return DetailView::Deleted;
        }
        match (&state.record, &state.last_error) {
            (Some(todo), error) => DetailView::Loaded {
                todo: todo.clone(),
                editing: state.is_editing,
                error: error.clone(),
            },
            (None, Some(error)) if !self.is_loading() => DetailView::Failed { error: error.clone() },
            (None, _) => DetailView::Loading,
        }
    }

    /// Fetch `id` and seed the edit draft from it. On failure no record is
    /// shown.
    pub async fn load(&self, id: &TodoId) -> Outcome {
        let Some(_claim) = self.in_flight.claim_exclusive(Slot::Load) else {
            return Outcome::Busy;
        };
        let result = self.api.get(id).await;
        let mut state = self.state.borrow_mut();
        state.is_editing = false;
        state.deleted = false;
        match result {
            Ok(todo) => {
                state.adopt(todo);
                state.last_error = None;
                Outcome::Applied
            }
            Err(err) => {
                state.record = None;
                state.draft = None;
                state.fail("load", err)
            }
        }
    }

    /// Returns `false` when there is no record to edit.
    pub fn enter_edit(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.record.is_none() || state.deleted {
            return false;
        }
        state.is_editing = true;
        true
    }

    /// Leave edit mode, discarding draft changes.
    pub fn cancel_edit(&self) {
        let mut state = self.state.borrow_mut();
        let draft = state.record.as_ref().map(EditDraft::from_todo);
        state.is_editing = false;
        state.draft = draft;
    }

    /// Apply `f` to the draft. Returns `false` outside edit mode.
    pub fn edit_draft(&self, f: impl FnOnce(&mut EditDraft)) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.is_editing {
            return false;
        }
        match state.draft.as_mut() {
            Some(draft) => {
                f(draft);
                true
            }
            None => false,
        }
    }

    /// Send the changed draft fields. Success adopts the server record and
    /// leaves edit mode; failure keeps edit mode and the draft for a retry.
    pub async fn save(&self) -> Outcome {
        let (id, draft) = {
            let state = self.state.borrow();
            match (&state.record, &state.draft) {
                (Some(record), Some(draft)) if state.is_editing => (record.id.clone(), draft.clone()),
                _ => return Outcome::Skipped,
            }
        };
        let Some(_claim) = self.in_flight.claim_exclusive(Slot::Write) else {
            return Outcome::Busy;
        };
        if let Err(err) = draft.validate() {
            return self.state.borrow_mut().fail("save", err);
        }
        let patch = match self.state.borrow().record.as_ref() {
            Some(record) => draft.diff(record),
            None => return Outcome::Skipped,
        };
        if patch.is_empty() {
            self.cancel_edit();
            return Outcome::Applied;
        }

        let result = self.api.update(&id, &patch).await;
        let outcome = {
            let mut state = self.state.borrow_mut();
            match result {
                Ok(todo) => {
                    state.adopt(todo);
                    state.is_editing = false;
                    state.last_error = None;
                    Outcome::Applied
                }
                Err(err) => state.fail("save", err),
            }
        };
        if outcome == Outcome::Applied {
            let _ = self.events.send(ViewEvent::Reload);
        }
        outcome
    }

    /// Id of the loaded record, unless it has been deleted.
    fn live_id(&self) -> Option<TodoId> {
        let state = self.state.borrow();
        if state.deleted {
            return None;
        }
        state.record.as_ref().map(|r| r.id.clone())
    }

    /// Set the status of the loaded record once the server confirms it.
    pub async fn toggle_status_inline(&self, status: TodoStatus) -> Outcome {
        let Some(id) = self.live_id() else {
            return Outcome::Skipped;
        };
        let Some(_claim) = self.in_flight.claim_exclusive(Slot::Write) else {
            return Outcome::Busy;
        };
        let result = self.api.update(&id, &TodoPatch::status(status)).await;
        let outcome = {
            let mut state = self.state.borrow_mut();
            match result {
                Ok(todo) => {
                    if state.is_editing {
                        let confirmed = todo.status;
                        if let Some(draft) = state.draft.as_mut() {
                            draft.status = confirmed;
                        }
                        state.record = Some(todo);
                    } else {
                        state.adopt(todo);
                    }
                    Outcome::Applied
                }
                Err(err) => state.fail("toggle_status", err),
            }
        };
        if outcome == Outcome::Applied {
            let _ = self.events.send(ViewEvent::Reload);
        }
        outcome
    }

    /// Delete the loaded record. The caller must have asked the user first;
    /// `Confirmation::Declined` sends nothing, and neither does deleting a
    /// record that is already gone.
    pub async fn delete(&self, confirmation: Confirmation) -> Outcome {
        if confirmation == Confirmation::Declined {
            return Outcome::Skipped;
        }
        let Some(id) = self.live_id() else {
            return Outcome::Skipped;
        };
        let Some(_claim) = self.in_flight.claim_exclusive(Slot::Write) else {
            return Outcome::Busy;
        };
        let result = self.api.delete(&id).await;
        let outcome = {
            let mut state = self.state.borrow_mut();
            match result {
                Ok(()) => {
                    state.deleted = true;
                    state.is_editing = false;
                    Outcome::Applied
                }
                Err(err) => state.fail("delete", err),
            }
        };
        if outcome == Outcome::Applied {
            let _ = self.events.send(ViewEvent::Reload);
            let _ = self.events.send(ViewEvent::NavigateAway);
        }
        outcome
    }
}

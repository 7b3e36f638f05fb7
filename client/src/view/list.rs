//! List screen state: the todos last confirmed by the server.
//!
//! # Design
//! A refresh replaces the whole list, but a write confirmed while the
//! collection request was out is newer than the snapshot it returns. Such
//! writes are logged and replayed over the snapshot, so a refresh never
//! undoes a confirmed toggle, removal or create.
//!
//! A refresh requested while one is in flight is folded into one more fetch
//! once the current one completes.

use std::cell::RefCell;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::{event_channel, InFlight, Outcome, ViewEvent};
use crate::api::TodoApi;
use crate::error::ViewError;
use crate::transport::Transport;
use crate::types::{NewTodo, Todo, TodoId, TodoPatch, TodoStatus};

/// What the list screen should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    /// Nothing has been loaded yet.
    Loading,
    /// The first load failed; show the error with a retry action.
    Failed { error: ViewError },
    /// Loaded and there are no todos. `error` is from a later action.
    Empty { error: Option<ViewError> },
    /// The last good list, with an inline error if a later action failed.
    Items { todos: Vec<Todo>, error: Option<ViewError> },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Refresh,
    Create,
    Record(TodoId),
}

/// A write the server confirmed.
enum Confirmed {
    Created(Todo),
    Updated(Todo),
    Removed(TodoId),
}

#[derive(Default)]
struct ListState {
    items: Vec<Todo>,
    loaded: bool,
    last_error: Option<ViewError>,
    /// `Some` while a refresh is in flight.
    writes_during_refresh: Option<Vec<Confirmed>>,
    reload_requested: bool,
}

impl ListState {
    fn confirm(&mut self, write: Confirmed) {
        self.apply(&write);
        if let Some(log) = self.writes_during_refresh.as_mut() {
            log.push(write);
        }
    }

    fn apply(&mut self, write: &Confirmed) {
        match write {
            Confirmed::Created(todo) => self.upsert(todo.clone()),
            Confirmed::Updated(todo) => self.replace_existing(todo.clone()),
            Confirmed::Removed(id) => self.items.retain(|t| &t.id != id),
        }
    }

    fn begin_refresh(&mut self) {
        self.reload_requested = false;
        self.writes_during_refresh = Some(Vec::new());
    }

    /// Adopt a collection snapshot, then replay writes confirmed since it
    /// was requested.
    fn adopt_snapshot(&mut self, todos: Vec<Todo>) {
        self.items.clear();
        for todo in todos {
            self.upsert(todo);
        }
        for write in self.writes_during_refresh.take().unwrap_or_default() {
            self.apply(&write);
        }
        self.loaded = true;
        self.last_error = None;
    }

    fn upsert(&mut self, todo: Todo) {
        match self.items.iter_mut().find(|t| t.id == todo.id) {
            Some(existing) => *existing = todo,
            None => self.items.push(todo),
        }
    }

    fn replace_existing(&mut self, todo: Todo) {
        if let Some(existing) = self.items.iter_mut().find(|t| t.id == todo.id) {
            *existing = todo;
        }
    }

    fn fail(&mut self, action: &'static str, err: impl Into<ViewError>) -> Outcome {
        let err = err.into();
        warn!(action, error = %err, "todo list action failed");
        self.last_error = Some(err);
        Outcome::Failed
    }
}

/// State of the todo list screen.
///
/// Items are unique by id and kept in the order the server last sent them;
/// that order carries no meaning beyond a stable display.
pub struct ListViewModel<T> {
    api: Arc<TodoApi<T>>,
    state: RefCell<ListState>,
    in_flight: InFlight<Slot>,
    events: broadcast::Sender<ViewEvent>,
}

impl<T: Transport> ListViewModel<T> {
    pub fn new(api: Arc<TodoApi<T>>) -> Self {
        Self::with_events(api, event_channel())
    }

    /// Share an event channel with other view-models.
    pub fn with_events(api: Arc<TodoApi<T>>, events: broadcast::Sender<ViewEvent>) -> Self {
        Self {
            api,
            state: RefCell::new(ListState::default()),
            in_flight: InFlight::default(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> broadcast::Sender<ViewEvent> {
        self.events.clone()
    }

    pub fn items(&self) -> Vec<Todo> {
        self.state.borrow().items.clone()
    }

    pub fn get(&self, id: &TodoId) -> Option<Todo> {
        self.state.borrow().items.iter().find(|t| &t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.contains(&Slot::Refresh)
    }

    pub fn is_creating(&self) -> bool {
        self.in_flight.contains(&Slot::Create)
    }

    /// Whether a toggle or delete for `id` is waiting on the server.
    pub fn is_pending(&self, id: &TodoId) -> bool {
        self.in_flight.contains(&Slot::Record(id.clone()))
    }

    pub fn last_error(&self) -> Option<ViewError> {
        self.state.borrow().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state.borrow_mut().last_error = None;
    }

    pub fn view(&self) -> ListView {
        let state = self.state.borrow();
        let error = state.last_error.clone();
        if !state.loaded {
            return match error {
                Some(error) if !self.is_loading() => ListView::Failed { error },
                _ => ListView::Loading,
            };
        }
        if state.items.is_empty() {
            ListView::Empty { error }
        } else {
            ListView::Items {
                todos: state.items.clone(),
                error,
            }
        }
    }

    /// Replace the list with the server's. On failure the previous items
    /// stay visible and `last_error` is set. Called while a refresh is
    /// already in flight, returns `Busy` and makes that refresh fetch once
    /// more before it finishes.
    pub async fn refresh(&self) -> Outcome {
        let Some(_claim) = self.in_flight.claim(Slot::Refresh) else {
            self.state.borrow_mut().reload_requested = true;
            return Outcome::Busy;
        };
        loop {
            self.state.borrow_mut().begin_refresh();
            let result = self.api.list().await;
            let mut state = self.state.borrow_mut();
            match result {
                Ok(todos) => state.adopt_snapshot(todos),
                Err(err) => {
                    state.writes_during_refresh = None;
                    state.reload_requested = false;
                    return state.fail("refresh", err);
                }
            }
            if !state.reload_requested {
                return Outcome::Applied;
            }
            debug!("reload requested during refresh, fetching again");
        }
    }

    /// Ask the server to set `status`; the local record changes only once
    /// the updated record comes back.
    pub async fn toggle_status(&self, id: &TodoId, status: TodoStatus) -> Outcome {
        let Some(_claim) = self.in_flight.claim(Slot::Record(id.clone())) else {
            return Outcome::Busy;
        };
        let result = self.api.update(id, &TodoPatch::status(status)).await;
        let mut state = self.state.borrow_mut();
        match result {
            Ok(todo) => {
                state.confirm(Confirmed::Updated(todo));
                Outcome::Applied
            }
            Err(err) => state.fail("toggle_status", err),
        }
    }

    /// Delete `id`; the record is removed locally only after the server
    /// confirms.
    pub async fn remove(&self, id: &TodoId) -> Outcome {
        let Some(_claim) = self.in_flight.claim(Slot::Record(id.clone())) else {
            return Outcome::Busy;
        };
        let result = self.api.delete(id).await;
        let mut state = self.state.borrow_mut();
        match result {
            Ok(()) => {
                state.confirm(Confirmed::Removed(id.clone()));
                Outcome::Applied
            }
            Err(err) => state.fail("remove", err),
        }
    }

    /// Validate and create a todo, adding the server's record to the list.
    pub async fn create(&self, input: NewTodo) -> Outcome {
        if let Err(err) = input.validate() {
            return self.state.borrow_mut().fail("create", err);
        }
        let Some(_claim) = self.in_flight.claim(Slot::Create) else {
            return Outcome::Busy;
        };
        let result = self.api.create(input).await;
        let outcome = {
            let mut state = self.state.borrow_mut();
            match result {
                Ok(todo) => {
                    state.confirm(Confirmed::Created(todo));
                    Outcome::Applied
                }
                Err(err) => state.fail("create", err),
            }
        };
        if outcome == Outcome::Applied {
            let _ = self.events.send(ViewEvent::Reload);
        }
        outcome
    }

    /// Refresh on every `Reload` received until the channel closes.
    pub async fn follow(&self, mut events: broadcast::Receiver<ViewEvent>) {
        loop {
            match events.recv().await {
                Ok(ViewEvent::Reload) | Err(RecvError::Lagged(_)) => {
                    let _ = self.refresh().await;
                }
                Ok(ViewEvent::NavigateAway) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::error::{ApiError, ValidationError};
    use crate::http::HttpMethod;
    use crate::testing::{scripted_api, todo_json, ScriptedTransport};

    fn list_vm() -> (ListViewModel<ScriptedTransport>, ScriptedTransport) {
        let (api, transport) = scripted_api();
        (ListViewModel::new(api), transport)
    }

    async fn loaded(todos: &[String]) -> (ListViewModel<ScriptedTransport>, ScriptedTransport) {
        let (vm, transport) = list_vm();
        transport.respond(200, format!("[{}]", todos.join(",")));
        assert_eq!(vm.refresh().await, Outcome::Applied);
        (vm, transport)
    }

    #[tokio::test]
    async fn starts_loading_and_shows_empty_state_for_empty_list() {
        let (vm, transport) = list_vm();
        assert_eq!(vm.view(), ListView::Loading);
        transport.respond(200, "[]");
        assert_eq!(vm.refresh().await, Outcome::Applied);
        assert_eq!(vm.view(), ListView::Empty { error: None });
        assert!(!vm.is_loading());
    }

    #[tokio::test]
    async fn first_refresh_failure_shows_retryable_error() {
        let (vm, transport) = list_vm();
        transport.respond(500, "boom");
        assert_eq!(vm.refresh().await, Outcome::Failed);
        assert!(matches!(vm.view(), ListView::Failed { .. }));

        transport.respond(200, format!("[{}]", todo_json("a", "A", "TODO")));
        assert_eq!(vm.refresh().await, Outcome::Applied);
        assert!(matches!(vm.view(), ListView::Items { error: None, .. }));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_items() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO")]).await;
        transport.fail("connection reset");
        assert_eq!(vm.refresh().await, Outcome::Failed);
        assert_eq!(vm.len(), 1);
        match vm.view() {
            ListView::Items { todos, error } => {
                assert_eq!(todos[0].name, "A");
                assert_eq!(error, Some(ApiError::Network("connection reset".to_string()).into()));
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_collapses_duplicate_ids() {
        let (vm, _) = loaded(&[todo_json("a", "Old", "TODO"), todo_json("b", "B", "TODO"), todo_json("a", "New", "DONE")]).await;
        assert_eq!(vm.len(), 2);
        assert_eq!(vm.get(&TodoId::from("a")).unwrap().name, "New");
    }

    #[tokio::test]
    async fn toggle_replaces_record_with_server_response() {
        let mut original: serde_json::Value = serde_json::from_str(&todo_json("a", "A", "TODO")).unwrap();
        original["assignee"] = "kim".into();
        let (vm, transport) = loaded(&[original.to_string()]).await;

        // Server also cleared the assignee; the local copy must not keep it.
        transport.respond(200, todo_json("a", "A", "DONE"));
        assert_eq!(vm.toggle_status(&TodoId::from("a"), TodoStatus::Done).await, Outcome::Applied);
        let todo = vm.get(&TodoId::from("a")).unwrap();
        assert_eq!(todo.status, TodoStatus::Done);
        assert_eq!(todo.assignee, "");

        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.body.as_deref(), Some(r#"{"status":"DONE"}"#));
    }

    #[tokio::test]
    async fn toggle_applies_only_after_response_arrives() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO")]).await;
        let gate = Arc::new(Notify::new());
        transport.respond_after(gate.clone(), 200, todo_json("a", "A", "DONE"));
        let id = TodoId::from("a");

        let toggle = vm.toggle_status(&id, TodoStatus::Done);
        let observe = async {
            tokio::task::yield_now().await;
            assert!(vm.is_pending(&id));
            assert_eq!(vm.get(&id).unwrap().status, TodoStatus::Todo);
            gate.notify_one();
        };
        let (outcome, ()) = tokio::join!(toggle, observe);
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(vm.get(&id).unwrap().status, TodoStatus::Done);
        assert!(!vm.is_pending(&id));
    }

    #[tokio::test]
    async fn failed_toggle_leaves_record_unchanged() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO")]).await;
        transport.respond(409, "conflict");
        let id = TodoId::from("a");
        assert_eq!(vm.toggle_status(&id, TodoStatus::Done).await, Outcome::Failed);
        assert_eq!(vm.get(&id).unwrap().status, TodoStatus::Todo);
        assert_eq!(vm.last_error().unwrap().api().unwrap().status(), Some(409));
    }

    #[tokio::test]
    async fn second_update_on_same_id_is_rejected_while_first_in_flight() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO"), todo_json("b", "B", "TODO")]).await;
        let gate = Arc::new(Notify::new());
        transport.respond_after(gate.clone(), 200, todo_json("a", "A", "DONE"));
        transport.respond(200, todo_json("b", "B", "DONE"));
        let a = TodoId::from("a");
        let b = TodoId::from("b");

        let (first, second, other, ()) = tokio::join!(
            vm.toggle_status(&a, TodoStatus::Done),
            vm.toggle_status(&a, TodoStatus::InProgress),
            vm.toggle_status(&b, TodoStatus::Done),
            async {
                tokio::task::yield_now().await;
                gate.notify_one();
            }
        );
        assert_eq!(first, Outcome::Applied);
        assert_eq!(second, Outcome::Busy);
        assert_eq!(other, Outcome::Applied);
        // list + one update per record; the rejected call sent nothing.
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(vm.get(&a).unwrap().status, TodoStatus::Done);
    }

    #[tokio::test]
    async fn dropped_request_releases_its_guard() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO")]).await;
        let id = TodoId::from("a");
        transport.respond_after(Arc::new(Notify::new()), 200, todo_json("a", "A", "DONE"));
        {
            let mut pending = Box::pin(vm.toggle_status(&id, TodoStatus::Done));
            assert!(poll_once(pending.as_mut()).await.is_none());
            assert!(vm.is_pending(&id));
        }
        assert!(!vm.is_pending(&id));
        assert_eq!(vm.get(&id).unwrap().status, TodoStatus::Todo);
    }

    async fn poll_once<F: std::future::Future + Unpin>(fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            out = fut => Some(out),
            _ = std::future::ready(()) => None,
        }
    }

    #[tokio::test]
    async fn remove_only_after_confirmation() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO"), todo_json("b", "B", "TODO")]).await;
        transport.respond(500, "nope");
        assert_eq!(vm.remove(&TodoId::from("a")).await, Outcome::Failed);
        assert_eq!(vm.len(), 2);
        assert!(vm.get(&TodoId::from("a")).is_some());

        transport.respond(204, "");
        assert_eq!(vm.remove(&TodoId::from("a")).await, Outcome::Applied);
        assert_eq!(vm.items().iter().map(|t| t.id.clone()).collect::<Vec<_>>(), [TodoId::from("b")]);
    }

    #[tokio::test]
    async fn create_adds_server_record_and_signals_reload() {
        let (vm, transport) = loaded(&[]).await;
        let mut events = vm.subscribe();
        transport.respond(201, todo_json("srv-9", "Buy milk", "TODO"));
        assert_eq!(vm.create(NewTodo::named("Buy milk")).await, Outcome::Applied);
        assert_eq!(vm.get(&TodoId::from("srv-9")).unwrap().name, "Buy milk");
        assert_eq!(events.try_recv().unwrap(), ViewEvent::Reload);

        let body: serde_json::Value =
            serde_json::from_str(transport.requests()[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["creator"], "User");
        assert_eq!(body["status"], "TODO");
        assert_eq!(body["description"], "");
        assert!(body["date"].is_string());
    }

    #[tokio::test]
    async fn create_with_blank_name_never_reaches_network() {
        let (vm, transport) = loaded(&[]).await;
        assert_eq!(vm.create(NewTodo::named("   ")).await, Outcome::Failed);
        assert_eq!(vm.last_error(), Some(ValidationError::EmptyName.into()));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(vm.view(), ListView::Empty { error: Some(ValidationError::EmptyName.into()) });
    }

    #[tokio::test]
    async fn follow_refreshes_on_reload() {
        let (vm, transport) = loaded(&[]).await;
        transport.respond(200, format!("[{}]", todo_json("a", "A", "TODO")));
        let (tx, rx) = broadcast::channel(4);
        tx.send(ViewEvent::NavigateAway).unwrap();
        tx.send(ViewEvent::Reload).unwrap();
        drop(tx);
        vm.follow(rx).await;
        assert_eq!(vm.len(), 1);
    }

    #[tokio::test]
    async fn refresh_in_flight_keeps_create_confirmed_meanwhile() {
        let (vm, transport) = list_vm();
        let gate = Arc::new(Notify::new());
        // Collection snapshot taken before the create reached the server.
        transport.respond_after(gate.clone(), 200, "[]");
        transport.respond(201, todo_json("srv-1", "Buy milk", "TODO"));

        let (refreshed, created) = tokio::join!(vm.refresh(), async {
            let outcome = vm.create(NewTodo::named("Buy milk")).await;
            gate.notify_one();
            outcome
        });
        assert_eq!(refreshed, Outcome::Applied);
        assert_eq!(created, Outcome::Applied);
        assert_eq!(vm.get(&TodoId::from("srv-1")).unwrap().name, "Buy milk");
    }

    #[tokio::test]
    async fn refresh_in_flight_does_not_revert_confirmed_toggle() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO")]).await;
        let gate = Arc::new(Notify::new());
        transport.respond_after(gate.clone(), 200, format!("[{}]", todo_json("a", "A", "TODO")));
        transport.respond(200, todo_json("a", "A", "DONE"));
        let id = TodoId::from("a");

        let (refreshed, toggled) = tokio::join!(vm.refresh(), async {
            let outcome = vm.toggle_status(&id, TodoStatus::Done).await;
            gate.notify_one();
            outcome
        });
        assert_eq!(refreshed, Outcome::Applied);
        assert_eq!(toggled, Outcome::Applied);
        assert_eq!(vm.get(&id).unwrap().status, TodoStatus::Done);
    }

    #[tokio::test]
    async fn refresh_in_flight_does_not_resurrect_removed_record() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO"), todo_json("b", "B", "TODO")]).await;
        let gate = Arc::new(Notify::new());
        transport.respond_after(
            gate.clone(),
            200,
            format!("[{},{}]", todo_json("a", "A", "TODO"), todo_json("b", "B", "TODO")),
        );
        transport.respond(204, "");

        let (refreshed, removed) = tokio::join!(vm.refresh(), async {
            let outcome = vm.remove(&TodoId::from("a")).await;
            gate.notify_one();
            outcome
        });
        assert_eq!(refreshed, Outcome::Applied);
        assert_eq!(removed, Outcome::Applied);
        assert_eq!(vm.items().iter().map(|t| t.id.clone()).collect::<Vec<_>>(), [TodoId::from("b")]);
    }

    #[tokio::test]
    async fn later_refresh_is_not_affected_by_earlier_writes() {
        let (vm, transport) = loaded(&[todo_json("a", "A", "TODO")]).await;
        transport.respond(200, todo_json("a", "A", "DONE"));
        assert_eq!(vm.toggle_status(&TodoId::from("a"), TodoStatus::Done).await, Outcome::Applied);

        // Someone else reopened it; this snapshot was taken after our write.
        transport.respond(200, format!("[{}]", todo_json("a", "A", "IN_PROGRESS")));
        assert_eq!(vm.refresh().await, Outcome::Applied);
        assert_eq!(vm.get(&TodoId::from("a")).unwrap().status, TodoStatus::InProgress);
    }

    #[tokio::test]
    async fn reload_during_refresh_fetches_again() {
        let (vm, transport) = list_vm();
        let gate = Arc::new(Notify::new());
        transport.respond_after(gate.clone(), 200, "[]");
        transport.respond(200, format!("[{}]", todo_json("a", "A", "TODO")));
        let (tx, rx) = broadcast::channel(4);

        let (refreshed, ()) = tokio::join!(vm.refresh(), async {
            tx.send(ViewEvent::Reload).unwrap();
            drop(tx);
            vm.follow(rx).await;
            gate.notify_one();
        });
        assert_eq!(refreshed, Outcome::Applied);
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(vm.len(), 1);
        assert!(!vm.is_loading());
    }

    #[tokio::test]
    async fn failed_refresh_drops_pending_reload() {
        let (vm, transport) = list_vm();
        let gate = Arc::new(Notify::new());
        transport.respond_after(gate.clone(), 500, "down");

        let (first, second) = tokio::join!(vm.refresh(), async {
            let outcome = vm.refresh().await;
            gate.notify_one();
            outcome
        });
        assert_eq!(first, Outcome::Failed);
        assert_eq!(second, Outcome::Busy);
        assert_eq!(transport.requests().len(), 1);
    }
}

//! Draft state of the "add todo" form.
//!
//! Submitting goes through `ListViewModel::create`, so a new record shows up
//! in the list the same way any other confirmed create does.

use std::cell::RefCell;

use super::{InFlight, ListViewModel, Outcome};
use crate::error::ViewError;
use crate::transport::Transport;
use crate::types::NewTodo;

#[derive(Default)]
struct FormState {
    name: String,
    description: String,
    assignee: String,
    expanded: bool,
    last_error: Option<ViewError>,
}

/// Draft fields of the "add todo" form.
///
/// Description and assignee sit in a collapsible section; they are sent
/// whether or not it is expanded.
#[derive(Default)]
pub struct CreateForm {
    state: RefCell<FormState>,
    in_flight: InFlight<()>,
}

impl CreateForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    pub fn description(&self) -> String {
        self.state.borrow().description.clone()
    }

    pub fn assignee(&self) -> String {
        self.state.borrow().assignee.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.state.borrow_mut().name = name.into();
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.state.borrow_mut().description = description.into();
    }

    pub fn set_assignee(&self, assignee: impl Into<String>) {
        self.state.borrow_mut().assignee = assignee.into();
    }

    pub fn is_expanded(&self) -> bool {
        self.state.borrow().expanded
    }

    pub fn toggle_expanded(&self) {
        let mut state = self.state.borrow_mut();
        state.expanded = !state.expanded;
    }

    /// The submit button should be disabled while this is true.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.contains(&())
    }

    pub fn last_error(&self) -> Option<ViewError> {
        self.state.borrow().last_error.clone()
    }

    fn to_new_todo(&self) -> NewTodo {
        let state = self.state.borrow();
        NewTodo {
            name: state.name.clone(),
            description: Some(state.description.clone()),
            assignee: Some(state.assignee.clone()),
            ..NewTodo::default()
        }
    }

    /// Create the todo through `list` so it shows up there. On success the
    /// form is cleared and collapsed; on failure the fields are kept.
    pub async fn submit<T: Transport>(&self, list: &ListViewModel<T>) -> Outcome {
        let input = self.to_new_todo();
        if let Err(err) = input.validate() {
            self.state.borrow_mut().last_error = Some(err.into());
            return Outcome::Failed;
        }
        let Some(_claim) = self.in_flight.claim(()) else {
            return Outcome::Busy;
        };
        self.state.borrow_mut().last_error = None;

        let outcome = list.create(input).await;
        let mut state = self.state.borrow_mut();
        match outcome {
            Outcome::Applied => {
                *state = FormState::default();
            }
            Outcome::Failed => {
                state.last_error = list.last_error();
            }
            Outcome::Busy | Outcome::Skipped => {}
        }
        outcome
    }
}

//! View-models: UI state that sits between `TodoApi` and a rendering layer.
//!
//! # Design
//! - Every method takes `&self`; state lives in a `RefCell` that is never
//!   borrowed across an `.await`. Two actions on different records can be in
//!   flight at once, while an action on a record that already has one
//!   outstanding returns `Outcome::Busy` without sending anything.
//! - Local state changes only after the server confirms, and always by
//!   adopting the record the server returned.
//! - Failures are stored as `last_error`; nothing is returned as `Err`.
//! - In-flight futures borrow their view-model, so a view-model cannot be
//!   dropped while one of its requests could still write into it.

mod detail;
mod form;
mod list;

use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::Hash;

use tokio::sync::broadcast;

pub use detail::{DetailView, DetailViewModel};
pub use form::CreateForm;
pub use list::{ListView, ListViewModel};

/// What a mutating view-model action did.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The server confirmed the change and local state was updated.
    Applied,
    /// Validation or the request failed; `last_error` describes why.
    Failed,
    /// A request for the same target is still in flight; nothing was sent.
    Busy,
    /// There was nothing to do (no record loaded, or not confirmed).
    Skipped,
}

/// Signals a view-model sends to its presentation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// The collection changed on the server; list views should refresh.
    Reload,
    /// The shown record no longer exists; leave the detail view.
    NavigateAway,
}

/// The caller's answer to a destructive-action prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

const EVENT_CAPACITY: usize = 16;

fn event_channel() -> broadcast::Sender<ViewEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}

/// Set of actions with a request outstanding. A slot can be claimed once;
/// the claim frees it when dropped, including when the future holding it is
/// dropped before completing.
struct InFlight<S> {
    slots: RefCell<HashSet<S>>,
}

impl<S> Default for InFlight<S> {
    fn default() -> Self {
        Self {
            slots: RefCell::new(HashSet::new()),
        }
    }
}

impl<S: Eq + Hash + Clone> InFlight<S> {
    fn claim(&self, slot: S) -> Option<Claim<'_, S>> {
        if !self.slots.borrow_mut().insert(slot.clone()) {
            return None;
        }
        Some(Claim { owner: self, slot })
    }

    /// Claim `slot` only if nothing at all is in flight.
    fn claim_exclusive(&self, slot: S) -> Option<Claim<'_, S>> {
        if !self.slots.borrow().is_empty() {
            return None;
        }
        self.claim(slot)
    }

    fn contains(&self, slot: &S) -> bool {
        self.slots.borrow().contains(slot)
    }
}

struct Claim<'a, S: Eq + Hash> {
    owner: &'a InFlight<S>,
    slot: S,
}

impl<S: Eq + Hash> Drop for Claim<'_, S> {
    fn drop(&mut self) {
        self.owner.slots.borrow_mut().remove(&self.slot);
    }
}

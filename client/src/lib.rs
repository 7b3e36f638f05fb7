//! Client core for the todo service: API access plus the view-models that
//! keep UI state consistent with the server.
//!
//! # Overview
//! `TodoClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network. `TodoApi` runs those requests through a
//! `Transport` (`UreqTransport` in production). The view-models in `view`
//! own the list, detail and create-form state and only ever change it with
//! records the server returned.
//!
//! # Design
//! - `TodoClient` is stateless; it holds only `base_url`.
//! - Each CRUD operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and testable with plain data.
//! - One `TodoApi` is constructed and passed to view-models as an `Arc`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

pub use crate::api::TodoApi;
pub use crate::client::TodoClient;
pub use crate::config::{build_url, resolve_base_url, ClientConfig};
pub use crate::error::{ApiError, ValidationError, ViewError};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse};
pub use crate::transport::{Transport, TransportError, UreqTransport};
pub use crate::types::{CreateTodo, EditDraft, NewTodo, Todo, TodoId, TodoPatch, TodoStatus};
pub use crate::view::{
    Confirmation, CreateForm, DetailView, DetailViewModel, ListView, ListViewModel, Outcome, ViewEvent,
};

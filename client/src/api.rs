//! Async API client: `TodoClient` requests executed over a `Transport`.
//!
//! # Design
//! One `TodoApi` is constructed per application and handed to the
//! view-models explicitly (usually behind an `Arc`). Each operation is a
//! single round-trip: build, execute, parse. There is no caching and no
//! retry; failures are returned to the caller unchanged.

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::client::TodoClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{NewTodo, Todo, TodoId, TodoPatch};

pub struct TodoApi<T> {
    client: TodoClient,
    transport: T,
}

impl TodoApi<UreqTransport> {
    /// Client for the base URL configured in the environment.
    pub fn from_env() -> Self {
        Self::new(TodoClient::from_config(&ClientConfig::from_env()), UreqTransport::new())
    }
}

impl<T: Transport> TodoApi<T> {
    pub fn new(client: TodoClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method.as_str();
        let url = request.url.clone();
        match self.transport.execute(request).await {
            Ok(response) => {
                debug!(method, %url, status = response.status, "todo api response");
                Ok(response)
            }
            Err(err) => {
                debug!(method, %url, error = %err, "todo api request failed");
                Err(err.into())
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<Todo>, ApiError> {
        let response = self.round_trip(self.client.build_list_todos()).await?;
        self.client.parse_list_todos(response)
    }

    pub async fn get(&self, id: &TodoId) -> Result<Todo, ApiError> {
        let response = self.round_trip(self.client.build_get_todo(id)).await?;
        self.client.parse_get_todo(response)
    }

    /// Create a todo, defaulting an unset date to today's local date.
    pub async fn create(&self, input: NewTodo) -> Result<Todo, ApiError> {
        self.create_on(input, Local::now().date_naive()).await
    }

    /// Create a todo with `today` as the default date.
    pub async fn create_on(&self, input: NewTodo, today: NaiveDate) -> Result<Todo, ApiError> {
        let payload = input.into_payload(today);
        let request = self.client.build_create_todo(&payload)?;
        let response = self.round_trip(request).await?;
        self.client.parse_create_todo(response)
    }

    pub async fn update(&self, id: &TodoId, patch: &TodoPatch) -> Result<Todo, ApiError> {
        let request = self.client.build_update_todo(id, patch)?;
        let response = self.round_trip(request).await?;
        self.client.parse_update_todo(response)
    }

    pub async fn delete(&self, id: &TodoId) -> Result<(), ApiError> {
        let response = self.round_trip(self.client.build_delete_todo(id)).await?;
        self.client.parse_delete_todo(response)
    }
}

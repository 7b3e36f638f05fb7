//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each CRUD operation is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `TodoApi` pairs the two around a `Transport`; tests can drive either half
//! directly with plain data.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{build_url, ClientConfig};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateTodo, Todo, TodoId, TodoPatch};

const JSON: &str = "application/json";

/// Bytes escaped when an id is used as a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        build_url(&self.base_url, "/todos")
    }

    fn item_url(&self, id: &TodoId) -> String {
        let id_str = id.to_string();
        let segment = utf8_percent_encode(&id_str, PATH_SEGMENT);
        build_url(&self.base_url, &format!("/todos/{segment}"))
    }

    pub fn build_list_todos(&self) -> HttpRequest {
        bodiless(HttpMethod::Get, self.collection_url())
    }

    pub fn build_get_todo(&self, id: &TodoId) -> HttpRequest {
        bodiless(HttpMethod::Get, self.item_url(id))
    }

    pub fn build_create_todo(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        with_json_body(HttpMethod::Post, self.collection_url(), input)
    }

    pub fn build_update_todo(&self, id: &TodoId, patch: &TodoPatch) -> Result<HttpRequest, ApiError> {
        with_json_body(HttpMethod::Put, self.item_url(id), patch)
    }

    pub fn build_delete_todo(&self, id: &TodoId) -> HttpRequest {
        bodiless(HttpMethod::Delete, self.item_url(id))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(response).map(drop)
    }
}

fn bodiless(method: HttpMethod, url: String) -> HttpRequest {
    HttpRequest {
        method,
        url,
        headers: Vec::new(),
        body: None,
    }
}

fn with_json_body<T: Serialize>(method: HttpMethod, url: String, payload: &T) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(HttpRequest {
        method,
        url,
        headers: vec![("content-type".to_string(), JSON.to_string())],
        body: Some(body),
    })
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    let response = check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Pass 2xx responses through; turn anything else into `RequestFailed`.
fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    let status_text = if response.status_text.is_empty() {
        crate::http::canonical_reason(response.status).to_string()
    } else {
        response.status_text
    };
    Err(ApiError::RequestFailed {
        status: response.status,
        status_text,
        body: Some(response.body).filter(|b| !b.is_empty()),
    })
}

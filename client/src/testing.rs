//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::TodoApi;
use crate::client::TodoClient;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError};

struct Step {
    gate: Option<Arc<Notify>>,
    reply: Result<HttpResponse, TransportError>,
}

#[derive(Default)]
struct Inner {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

/// Replays queued responses in order and records every request it sees.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn respond(&self, status: u16, body: impl Into<String>) {
        self.push(None, Ok(HttpResponse::new(status, body)));
    }

    /// Queue a response that is only delivered once `gate` is notified.
    pub fn respond_after(&self, gate: Arc<Notify>, status: u16, body: impl Into<String>) {
        self.push(Some(gate), Ok(HttpResponse::new(status, body)));
    }

    pub fn fail(&self, message: &str) {
        self.push(None, Err(TransportError(message.to_string())));
    }

    fn push(&self, gate: Option<Arc<Notify>>, reply: Result<HttpResponse, TransportError>) {
        self.inner.script.lock().unwrap().push_back(Step { gate, reply });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.inner.requests.lock().unwrap().push(request);
        let step = self.inner.script.lock().unwrap().pop_front();
        let Some(step) = step else {
            return Err(TransportError("no scripted response".to_string()));
        };
        if let Some(gate) = step.gate {
            gate.notified().await;
        }
        step.reply
    }
}

pub fn scripted_api() -> (Arc<TodoApi<ScriptedTransport>>, ScriptedTransport) {
    let transport = ScriptedTransport::default();
    let api = TodoApi::new(TodoClient::new("http://api.test"), transport.clone());
    (Arc::new(api), transport)
}

pub fn todo_json(id: &str, name: &str, status: &str) -> String {
    serde_json::json!({
        "id": id,
        "name": name,
        "description": "",
        "status": status,
        "date": "2025-06-01",
        "assignee": "",
        "creator": "User"
    })
    .to_string()
}

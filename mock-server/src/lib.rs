use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub date: Option<NaiveDate>,
    pub assignee: String,
    pub creator: String,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub creator: String,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub date: Option<NaiveDate>,
    pub assignee: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<String, Todo>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_todos(State(db): State<Db>) -> Json<Vec<Todo>> {
    let todos = db.read().await;
    Json(todos.values().cloned().collect())
}

async fn create_todo(
    State(db): State<Db>,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), StatusCode> {
    if input.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let todo = Todo {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        description: input.description,
        status: input.status,
        date: input.date,
        assignee: input.assignee,
        creator: input.creator,
    };
    tracing::debug!(id = %todo.id, "created todo");
    db.write().await.insert(todo.id.clone(), todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, StatusCode> {
    let todos = db.read().await;
    todos.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, StatusCode> {
    let mut todos = db.write().await;
    let todo = todos.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        if name.trim().is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }
        todo.name = name;
    }
    if let Some(description) = input.description {
        todo.description = description;
    }
    if let Some(status) = input.status {
        todo.status = status;
    }
    if let Some(date) = input.date {
        todo.date = Some(date);
    }
    if let Some(assignee) = input.assignee {
        todo.assignee = assignee;
    }
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut todos = db.write().await;
    let removed = todos.remove(&id).ok_or(StatusCode::NOT_FOUND)?;
    tracing::debug!(id = %removed.id, "deleted todo");
    Ok(StatusCode::NO_CONTENT)
}

//! In-memory todo API: the terminal handlers behind the pipeline.

use std::sync::Arc;

use relais::{Request, Response, Router, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::error;

#[derive(Clone, Debug, Serialize)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub done: bool,
    pub estimate_hours: f64,
}

#[derive(Debug, Deserialize)]
struct NewTodo {
    title: String,
    #[serde(default)]
    estimate_hours: f64,
}

/// A todo as rendered for one request: the estimate is formatted with the
/// request's locale.
#[derive(Serialize)]
struct TodoView<'a> {
    #[serde(flatten)]
    todo: &'a Todo,
    estimate: String,
}

impl<'a> TodoView<'a> {
    fn new(todo: &'a Todo, req: &Request) -> Self {
        Self { todo, estimate: req.locale().format_decimal(todo.estimate_hours, 1) }
    }
}

#[derive(Default)]
pub struct TodoStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    todos: Vec<Todo>,
    next_id: u64,
}

impl TodoStore {
    /// A store with a couple of entries so a fresh server has something to show.
    pub fn seeded() -> Self {
        let mut inner = Inner::default();
        for (title, hours) in [("Walk dog", 0.5), ("File taxes", 1234.5)] {
            inner.insert(title.to_owned(), hours);
        }
        Self { inner: Mutex::new(inner) }
    }
}

impl Inner {
    fn insert(&mut self, title: String, estimate_hours: f64) -> Todo {
        self.next_id += 1;
        let todo = Todo { id: self.next_id, title, done: false, estimate_hours };
        self.todos.push(todo.clone());
        todo
    }
}

pub fn routes(store: Arc<TodoStore>) -> Router {
    let (list_store, show_store, create_store) =
        (Arc::clone(&store), Arc::clone(&store), store);

    Router::new()
        .get("/todos", move |req: Request| list(Arc::clone(&list_store), req))
        .get("/todos/{id}", move |req: Request| show(Arc::clone(&show_store), req))
        .post("/todos", move |req: Request| create(Arc::clone(&create_store), req))
}

async fn list(store: Arc<TodoStore>, req: Request) -> Response {
    let inner = store.inner.lock().await;
    let views: Vec<_> = inner.todos.iter().map(|t| TodoView::new(t, &req)).collect();
    json(StatusCode::OK, &views)
}

async fn show(store: Arc<TodoStore>, req: Request) -> Response {
    let Some(id) = req.param("id").and_then(|id| id.parse::<u64>().ok()) else {
        return Response::status(StatusCode::NOT_FOUND);
    };
    let inner = store.inner.lock().await;
    match inner.todos.iter().find(|t| t.id == id) {
        Some(todo) => json(StatusCode::OK, &TodoView::new(todo, &req)),
        None => Response::status(StatusCode::NOT_FOUND),
    }
}

async fn create(store: Arc<TodoStore>, req: Request) -> Response {
    let input: NewTodo = match serde_json::from_slice(req.body()) {
        Ok(input) => input,
        Err(e) => {
            return Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .text(format!("invalid todo: {e}"));
        }
    };
    if input.title.trim().is_empty() {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .text("invalid todo: title is empty");
    }

    let todo = store.inner.lock().await.insert(input.title, input.estimate_hours);
    let location = format!("/todos/{}", todo.id);
    match serde_json::to_vec(&TodoView::new(&todo, &req)) {
        Ok(body) => Response::builder()
            .status(StatusCode::CREATED)
            .header("location", &location)
            .json(body),
        Err(e) => serialization_failed(e),
    }
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => Response::builder().status(status).json(body),
        Err(e) => serialization_failed(e),
    }
}

fn serialization_failed(e: serde_json::Error) -> Response {
    error!("failed to serialize response: {e}");
    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
}

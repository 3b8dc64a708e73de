//! In-memory Portability Integration API used for tests and local runs.
//!
//! Serves a home document of URI templates at `/`, read/write endpoints for
//! numbers and customers, and a handful of fixture routes that reproduce the
//! server behaviors the client has to classify.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Number {
    pub id: u64,
    pub number: String,
    pub customer_id: u64,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct Store {
    numbers: BTreeMap<u64, Number>,
    customers: BTreeMap<u64, Customer>,
    next_number_id: u64,
}

impl Store {
    /// Two customers, three numbers.
    pub fn seeded() -> Self {
        let customers = [(1, "ACME Telecom"), (2, "Globex")]
            .into_iter()
            .map(|(id, name)| (id, Customer { id, name: name.to_string() }))
            .collect();
        let numbers = [(1, "51999000111", 1), (2, "51999000222", 1), (3, "51999000333", 2)]
            .into_iter()
            .map(|(id, number, customer_id)| {
                (
                    id,
                    Number {
                        id,
                        number: number.to_string(),
                        customer_id,
                        status: "active".to_string(),
                    },
                )
            })
            .collect();
        Self {
            numbers,
            customers,
            next_number_id: 4,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    store: Arc<RwLock<Store>>,
}

pub const HOME_DOCUMENT: &[(&str, &str)] = &[
    ("number_collection_url", "/numbers"),
    ("number_url", "/numbers/{number_id}"),
    ("customer_collection_url", "/customers"),
    ("customer_url", "/customers/{customer_id}"),
    ("customer_number_collection_url", "/customers/{customer_id}/numbers"),
];

pub fn app(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        store: Arc::new(RwLock::new(Store::seeded())),
    };
    Router::new()
        .route("/", get(home))
        .route("/numbers", get(list_numbers).post(create_number))
        .route("/numbers/{id}", get(get_number).put(update_number).delete(delete_number))
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer))
        .route("/customers/{id}/numbers", get(list_customer_numbers))
        .route(
            "/echo",
            get(echo_query)
                .put(echo_form)
                .post(echo_multipart)
                .delete(echo_form),
        )
        .route("/fixtures/not-json", get(not_json))
        .route("/fixtures/empty-errors", get(empty_errors))
        .route("/fixtures/no-errors-field", get(no_errors_field))
        .route("/fixtures/not-utf8", get(not_utf8))
        .route("/fixtures/large", get(large))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

/// Error body in the shape the API uses everywhere.
pub fn error_body(code: &str, message: &str) -> Value {
    json!({"errors": [{"code": code, "message": message}]})
}

fn api_error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(error_body(code, message))).into_response()
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = request
        .headers()
        .get("x-apikey")
        .and_then(|value| value.to_str().ok());
    match key {
        Some(key) if key == &*state.api_key => next.run(request).await,
        Some(_) => api_error(StatusCode::FORBIDDEN, "forbidden", "API key not allowed"),
        None => api_error(StatusCode::UNAUTHORIZED, "missing_api_key", "X-ApiKey header is required"),
    }
}

async fn home() -> Json<Value> {
    let links: serde_json::Map<String, Value> = HOME_DOCUMENT
        .iter()
        .map(|(name, template)| (name.to_string(), Value::from(*template)))
        .collect();
    Json(Value::Object(links))
}

async fn list_numbers(State(state): State<AppState>) -> Json<Vec<Number>> {
    let store = state.store.read().await;
    Json(store.numbers.values().cloned().collect())
}

async fn create_number(
    State(state): State<AppState>,
    Form(input): Form<BTreeMap<String, String>>,
) -> Response {
    let Some(number) = input.get("number").cloned() else {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, "missing_field", "number is required");
    };
    let Some(customer_id) = input.get("customer_id").and_then(|id| id.parse().ok()) else {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_field", "customer_id must be an integer");
    };

    let mut store = state.store.write().await;
    if !store.customers.contains_key(&customer_id) {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, "unknown_customer", "customer does not exist");
    }
    let id = store.next_number_id;
    store.next_number_id += 1;
    let created = Number {
        id,
        number,
        customer_id,
        status: "pending".to_string(),
    };
    store.numbers.insert(id, created.clone());
    debug!(id, "created number");
    Json(created).into_response()
}

async fn get_number(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let store = state.store.read().await;
    match store.numbers.get(&id) {
        Some(number) => Json(number.clone()).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "not_found", "number not found"),
    }
}

async fn update_number(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Form(input): Form<BTreeMap<String, String>>,
) -> Response {
    let mut store = state.store.write().await;
    let Some(number) = store.numbers.get_mut(&id) else {
        return api_error(StatusCode::NOT_FOUND, "not_found", "number not found");
    };
    if let Some(status) = input.get("status") {
        number.status = status.clone();
    }
    Json(number.clone()).into_response()
}

async fn delete_number(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut store = state.store.write().await;
    match store.numbers.remove(&id) {
        Some(_) => Json(json!({"deleted": id})).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "not_found", "number not found"),
    }
}

async fn list_customers(State(state): State<AppState>) -> Json<Vec<Customer>> {
    let store = state.store.read().await;
    Json(store.customers.values().cloned().collect())
}

async fn get_customer(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let store = state.store.read().await;
    match store.customers.get(&id) {
        Some(customer) => Json(customer.clone()).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "not_found", "customer not found"),
    }
}

async fn list_customer_numbers(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let store = state.store.read().await;
    if !store.customers.contains_key(&id) {
        return api_error(StatusCode::NOT_FOUND, "not_found", "customer not found");
    }
    let numbers: Vec<Number> = store
        .numbers
        .values()
        .filter(|number| number.customer_id == id)
        .cloned()
        .collect();
    Json(numbers).into_response()
}

async fn echo_query(
    request_headers: axum::http::HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let user_agent = request_headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok());
    Json(json!({"query": query, "user_agent": user_agent}))
}

async fn echo_form(Form(form): Form<BTreeMap<String, String>>) -> Json<Value> {
    Json(json!({"form": form}))
}

async fn echo_multipart(mut multipart: Multipart) -> Response {
    let mut fields = BTreeMap::new();
    let mut files = BTreeMap::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return api_error(StatusCode::BAD_REQUEST, "bad_multipart", &err.body_text()),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return api_error(StatusCode::BAD_REQUEST, "bad_multipart", &err.body_text()),
        };
        match file_name {
            Some(file_name) => {
                files.insert(
                    name,
                    json!({
                        "file_name": file_name,
                        "content_type": content_type,
                        "content": String::from_utf8_lossy(&bytes),
                    }),
                );
            }
            None => {
                fields.insert(name, String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    Json(json!({"fields": fields, "files": files})).into_response()
}

async fn not_json() -> &'static str {
    "service temporarily unavailable"
}

async fn not_utf8() -> Vec<u8> {
    vec![0xff, 0xfe, b'{']
}

/// Entries in the `/fixtures/large` array; the body ends up around 11 MiB.
pub const LARGE_ENTRIES: usize = 11 * 1024;

async fn large() -> Json<Value> {
    let entry = "x".repeat(1024);
    Json(Value::Array(vec![Value::from(entry); LARGE_ENTRIES]))
}

async fn empty_errors() -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"errors": []})))
}

async fn no_errors_field() -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_GATEWAY, Json(json!({"detail": "upstream failed"})))
}

//! Stand-in REST service for exercising the adapter over real HTTP.
//!
//! Everything lives under `/v1` and requires a non-empty `x-api-key` header:
//!
//! - `/records` stores arbitrary JSON objects under sequential numeric ids;
//!   `PUT` merges top-level fields into the stored object.
//! - `/echo` answers with the received query pairs, in order.
//! - `/status/{code}` answers with an empty body and the given status.
//! - `/binary` answers with a fixed non-UTF-8 payload.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Served by `/v1/binary`: invalid UTF-8 followed by a PNG-style tag.
pub const BINARY_BODY: &[u8] = &[0xff, 0xfe, 0x00, 0x89, b'P', b'N', b'G'];

type Fields = Map<String, Value>;

#[derive(Default)]
pub struct Records {
    last_id: u64,
    by_id: BTreeMap<u64, Fields>,
}

impl Records {
    fn insert(&mut self, fields: Fields) -> u64 {
        self.last_id += 1;
        self.by_id.insert(self.last_id, fields);
        self.last_id
    }

    fn render(&self, id: u64) -> Option<Value> {
        self.by_id.get(&id).map(|fields| with_id(id, fields))
    }
}

pub type Store = Arc<RwLock<Records>>;

#[derive(Deserialize)]
struct NameFilter {
    name: Option<String>,
}

pub fn app() -> Router {
    let v1 = Router::new()
        .route("/records", get(list_records).post(create_record))
        .route(
            "/records/{id}",
            get(get_record).put(merge_record).delete(delete_record),
        )
        .route("/echo", get(echo))
        .route("/status/{code}", get(status))
        .route("/binary", get(binary))
        .layer(middleware::from_fn(require_api_key))
        .with_state(Store::default());
    Router::new().nest("/v1", v1)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_api_key(request: Request, next: Next) -> Result<Response, StatusCode> {
    let present = request
        .headers()
        .get(API_KEY_HEADER)
        .is_some_and(|v| !v.is_empty());
    if !present {
        tracing::debug!(uri = %request.uri(), "rejecting request without api key");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

/// The stored object with its id spliced in; a client-sent `id` never wins.
fn with_id(id: u64, fields: &Fields) -> Value {
    let mut record = fields.clone();
    record.insert("id".to_string(), Value::from(id));
    Value::Object(record)
}

async fn list_records(State(store): State<Store>, Query(filter): Query<NameFilter>) -> Json<Vec<Value>> {
    let records = store.read().await;
    let matches = |fields: &Fields| match &filter.name {
        Some(name) => fields.get("name").and_then(Value::as_str) == Some(name.as_str()),
        None => true,
    };
    Json(
        records
            .by_id
            .iter()
            .filter(|(_, fields)| matches(fields))
            .map(|(id, fields)| with_id(*id, fields))
            .collect(),
    )
}

async fn create_record(State(store): State<Store>, Json(fields): Json<Fields>) -> (StatusCode, Json<Value>) {
    let mut records = store.write().await;
    let id = records.insert(fields);
    let body = records.render(id).unwrap_or(Value::Null);
    (StatusCode::CREATED, Json(body))
}

async fn get_record(State(store): State<Store>, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    store.read().await.render(id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn merge_record(
    State(store): State<Store>,
    Path(id): Path<u64>,
    Json(patch): Json<Fields>,
) -> Result<Json<Value>, StatusCode> {
    let mut records = store.write().await;
    let fields = records.by_id.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    fields.extend(patch);
    Ok(Json(with_id(id, fields)))
}

async fn delete_record(State(store): State<Store>, Path(id): Path<u64>) -> StatusCode {
    match store.write().await.by_id.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Reflects the query string back as `[[key, value], ...]` in received order.
async fn echo(Query(pairs): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(pairs)
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn binary() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], BINARY_BODY)
}

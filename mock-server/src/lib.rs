//! In-memory stand-in for the remote object-data REST API.
//!
//! Serves the handful of endpoints the client talks to under
//! `/services/data/{version}/`, keeps records in memory, and logs every
//! request it sees so tests can assert on the exact wire traffic. Tests can
//! also stub a raw status and body for a `(method, path)` pair.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// Object types listed by describe even before any record exists.
pub const STANDARD_OBJECTS: &[&str] = &["Account", "Contact", "Lead", "Opportunity"];

/// Cookie set on describe responses.
pub const SESSION_COOKIE: &str = "sid_Client";

type Record = Map<String, Value>;

/// One request as it arrived on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Raw path, still percent-encoded.
    pub path: String,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
}

/// Shared server state. Cloning shares the same underlying store.
#[derive(Clone, Default)]
pub struct AppState {
    records: Arc<RwLock<HashMap<String, HashMap<String, Record>>>>,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    stubs: Arc<Mutex<HashMap<(String, String), (StatusCode, Vec<u8>)>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Answer `method path` with `status` and a raw `body` instead of routing
    /// it. The body is sent byte for byte, valid UTF-8 or not. Authentication
    /// is not checked for stubbed requests.
    pub fn stub(&self, method: &str, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if let Ok(mut stubs) = self.stubs.lock() {
            stubs.insert(
                (method.to_ascii_uppercase(), path.to_string()),
                (status, body.into()),
            );
        }
    }

    fn record(&self, request: RecordedRequest) {
        if let Ok(mut log) = self.log.lock() {
            log.push(request);
        }
    }

    fn stub_for(&self, method: &str, path: &str) -> Option<(StatusCode, Vec<u8>)> {
        self.stubs
            .lock()
            .ok()?
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEntry {
    error_code: &'static str,
    message: String,
}

/// Error bodies are a JSON array of `{errorCode, message}`.
fn error_response(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    let body = vec![ErrorEntry {
        error_code: code,
        message: message.into(),
    }];
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "The requested resource does not exist",
    )
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/services/data/{version}/sobjects", get(describe_global))
        .route("/services/data/{version}/search/{params}", get(search))
        .route("/services/data/{version}/{object}", post(create_record))
        .route(
            "/services/data/{version}/{object}/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .layer(middleware::from_fn_with_state(state.clone(), gatekeeper))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::default()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty())
}

/// Logs the request, then serves a stub, rejects it, or passes it on.
async fn gatekeeper(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let authorized = is_authorized(request.headers());
    state.record(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: header_string(request.headers(), header::AUTHORIZATION),
        cookie: header_string(request.headers(), header::COOKIE),
    });
    debug!(%method, %path, authorized, "request");

    if let Some((status, body)) = state.stub_for(&method, &path) {
        return (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();
    }
    if !authorized {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "INVALID_SESSION_ID",
            "Session expired or invalid",
        );
    }
    next.run(request).await
}

fn record_url(version: &str, object: &str, id: &str) -> String {
    format!("/services/data/{version}/sobjects/{object}/{id}")
}

/// A stored record as the API returns it: `attributes`, `Id`, then fields.
fn render_record(version: &str, object: &str, id: &str, fields: &Record) -> Value {
    let mut out = Map::new();
    out.insert(
        "attributes".to_string(),
        json!({ "type": object, "url": record_url(version, object, id) }),
    );
    out.insert("Id".to_string(), Value::String(id.to_string()));
    for (k, v) in fields {
        out.insert(k.clone(), v.clone());
    }
    Value::Object(out)
}

/// 18-character id with a three-character key prefix per object type.
fn new_record_id(object: &str) -> String {
    let prefix = match object {
        "Account" => "001",
        "Contact" => "003",
        "Opportunity" => "006",
        "Lead" => "00Q",
        _ => "a00",
    };
    let suffix = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{prefix}{}", &suffix[..15])
}

/// Parse a request body that must be a JSON object.
fn parse_fields(body: &[u8]) -> Result<Record, Response> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "JSON_PARSER_ERROR",
            "Expected a JSON object",
        )),
        Err(e) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "JSON_PARSER_ERROR",
            e.to_string(),
        )),
    }
}

async fn describe_global(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> impl IntoResponse {
    let records = state.records.read().await;
    let names: BTreeSet<&str> = STANDARD_OBJECTS
        .iter()
        .copied()
        .chain(records.keys().map(String::as_str))
        .collect();
    let sobjects: Vec<Value> = names
        .into_iter()
        .map(|name| {
            json!({
                "name": name,
                "label": name,
                "custom": name.ends_with("__c"),
                "createable": true,
                "deletable": true,
                "queryable": true,
                "searchable": true,
                "updateable": true,
                "urls": {
                    "sobject": format!("/services/data/{version}/sobjects/{name}"),
                    "rowTemplate": format!("/services/data/{version}/sobjects/{name}/{{ID}}"),
                },
            })
        })
        .collect();
    let cookie = format!("{SESSION_COOKIE}={}; Path=/", Uuid::new_v4().simple());
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "encoding": "UTF-8",
            "maxBatchSize": 200,
            "sobjects": sobjects,
        })),
    )
}

/// Term to match: the `{...}` part of `FIND {term}`, else the whole query.
fn search_term(params: &str) -> String {
    let query = params.strip_prefix("q=").unwrap_or(params);
    match (query.find('{'), query.rfind('}')) {
        (Some(start), Some(end)) if start < end => query[start + 1..end].to_string(),
        _ => query.to_string(),
    }
}

async fn search(
    State(state): State<AppState>,
    Path((version, params)): Path<(String, String)>,
) -> Json<Value> {
    let term = search_term(&params).to_lowercase();
    let records = state.records.read().await;
    let mut hits = Vec::new();
    if !term.is_empty() {
        for (object, by_id) in records.iter() {
            for (id, fields) in by_id {
                let matched = fields
                    .values()
                    .filter_map(Value::as_str)
                    .any(|s| s.to_lowercase().contains(&term));
                if matched {
                    hits.push(json!({
                        "attributes": { "type": object, "url": record_url(&version, object, id) },
                        "Id": id,
                    }));
                }
            }
        }
    }
    Json(json!({ "searchRecords": hits }))
}

async fn create_record(
    State(state): State<AppState>,
    Path((_version, object)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let fields = match parse_fields(&body) {
        Ok(fields) => fields,
        Err(rejection) => return rejection,
    };
    let id = new_record_id(&object);
    state
        .records
        .write()
        .await
        .entry(object)
        .or_default()
        .insert(id.clone(), fields);
    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "success": true, "errors": [] })),
    )
        .into_response()
}

async fn get_record(
    State(state): State<AppState>,
    Path((version, object, id)): Path<(String, String, String)>,
) -> Response {
    let records = state.records.read().await;
    match records.get(&object).and_then(|by_id| by_id.get(&id)) {
        Some(fields) => Json(render_record(&version, &object, &id, fields)).into_response(),
        None => not_found(),
    }
}

async fn update_record(
    State(state): State<AppState>,
    Path((_version, object, id)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let changes = match parse_fields(&body) {
        Ok(fields) => fields,
        Err(rejection) => return rejection,
    };
    let mut records = state.records.write().await;
    match records.get_mut(&object).and_then(|by_id| by_id.get_mut(&id)) {
        Some(fields) => {
            fields.extend(changes);
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(),
    }
}

async fn delete_record(
    State(state): State<AppState>,
    Path((_version, object, id)): Path<(String, String, String)>,
) -> Response {
    let mut records = state.records.write().await;
    match records.get_mut(&object).and_then(|by_id| by_id.remove(&id)) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}

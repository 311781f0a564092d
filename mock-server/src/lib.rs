//! In-process stand-in for the FluidDB HTTP API.
//!
//! Covers the endpoints the client exercises: users, namespaces, tags,
//! tag values by object id or by about, and `/values` queries. Requests are
//! authenticated with HTTP Basic; an `Origin` header is echoed back as
//! `Access-Control-Allow-Origin`.

pub mod store;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub use store::{Store, TagValue, VALUE_CONTENT_TYPE};

use store::{is_primitive, owner, parent, ABOUT_TAG};

pub const USERNAME: &str = "test";
pub const PASSWORD: &str = "test";

pub type Db = Arc<RwLock<Store>>;

#[derive(Debug, Deserialize)]
pub struct CreateNamespace {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTag {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub indexed: bool,
}

/// Router seeded with the `test`/`test` user.
pub fn app() -> Router {
    app_with(Store::seeded(USERNAME, PASSWORD))
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/users/{name}", get(get_user))
        .route(
            "/namespaces/{*path}",
            get(get_namespace).post(create_namespace).delete(delete_namespace),
        )
        .route("/tags/{*path}", get(get_tag).post(create_tag).delete(delete_tag))
        .route("/objects/{id}", get(get_object))
        .route(
            "/objects/{id}/{*tag}",
            get(get_object_value).put(put_object_value).delete(delete_object_value),
        )
        .route("/about/{about}", get(get_about).post(create_about))
        .route(
            "/about/{about}/{*tag}",
            get(get_about_value).put(put_about_value).delete(delete_about_value),
        )
        .route("/values", get(query_values))
        .layer(middleware::from_fn(echo_origin))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("mock fluiddb listening on {addr}");
    }
    axum::serve(listener, app()).await
}

async fn echo_origin(request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let mut response = next.run(request).await;
    if let Some(origin) = origin {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    response
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// The calling user, `None` when anonymous. Bad credentials are a 401.
fn caller(store: &Store, headers: &HeaderMap) -> Result<Option<String>, StatusCode> {
    let Some(authorization) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let authorization = authorization.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    match store.authenticate(authorization) {
        Some(user) => Ok(Some(user)),
        None => {
            debug!("rejected credentials");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// An authenticated caller who owns the top-level namespace of `path`.
fn writer(store: &Store, headers: &HeaderMap, path: &str) -> Result<String, StatusCode> {
    let user = caller(store, headers)?.ok_or(StatusCode::UNAUTHORIZED)?;
    if owner(path) != user {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(user)
}

fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

fn flag(pairs: &[(String, String)], name: &str) -> bool {
    pairs
        .iter()
        .any(|(k, v)| k == name && v.eq_ignore_ascii_case("true"))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn get_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    let user = store.users.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "name": user.name, "id": user.id })))
}

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

async fn get_namespace(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    let namespace = store.namespaces.get(&path).ok_or(StatusCode::NOT_FOUND)?;

    let pairs = query_pairs(query.as_deref());
    let mut body = json!({ "id": namespace.id });
    if flag(&pairs, "returnDescription") {
        body["description"] = json!(namespace.description);
    }
    let (namespaces, tags) = store.children(&path);
    if flag(&pairs, "returnNamespaces") {
        body["namespaceNames"] = json!(namespaces);
    }
    if flag(&pairs, "returnTags") {
        body["tagNames"] = json!(tags);
    }
    Ok(Json(body))
}

async fn create_namespace(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<String>,
    Json(input): Json<CreateNamespace>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let mut store = db.write().await;
    writer(&store, &headers, &path)?;
    if !store.namespaces.contains_key(&path) {
        return Err(StatusCode::NOT_FOUND);
    }
    let full = format!("{path}/{}", input.name);
    if store.namespaces.contains_key(&full) || store.tags.contains_key(&full) {
        return Err(StatusCode::PRECONDITION_FAILED);
    }
    let id = store.add_namespace(&full, &input.description);
    info!("created namespace {full}");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "URI": format!("/namespaces/{full}") })),
    ))
}

async fn delete_namespace(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    writer(&store, &headers, &path)?;
    if !store.namespaces.contains_key(&path) {
        return Err(StatusCode::NOT_FOUND);
    }
    let (namespaces, tags) = store.children(&path);
    if !namespaces.is_empty() || !tags.is_empty() {
        return Err(StatusCode::PRECONDITION_FAILED);
    }
    store.namespaces.remove(&path);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

async fn get_tag(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    let tag = store.tags.get(&path).ok_or(StatusCode::NOT_FOUND)?;
    let mut body = json!({ "id": tag.id, "indexed": tag.indexed });
    if flag(&query_pairs(query.as_deref()), "returnDescription") {
        body["description"] = json!(tag.description);
    }
    Ok(Json(body))
}

async fn create_tag(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<String>,
    Json(input): Json<CreateTag>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let mut store = db.write().await;
    writer(&store, &headers, &path)?;
    if !store.namespaces.contains_key(&path) {
        return Err(StatusCode::NOT_FOUND);
    }
    let full = format!("{path}/{}", input.name);
    if store.tags.contains_key(&full) || store.namespaces.contains_key(&full) {
        return Err(StatusCode::PRECONDITION_FAILED);
    }
    let id = store.add_tag(&full, &input.description, input.indexed);
    info!("created tag {full}");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "URI": format!("/tags/{full}") })),
    ))
}

async fn delete_tag(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    writer(&store, &headers, &path)?;
    if parent(&path).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    store
        .remove_tag(&path)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

// ---------------------------------------------------------------------------
// Tag values
// ---------------------------------------------------------------------------

fn value_response(value: &TagValue) -> Response {
    let content_type = HeaderValue::from_str(&value.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], value.bytes.clone()).into_response()
}

/// Validate a PUT body against its declared content type.
fn parse_value(headers: &HeaderMap, body: Bytes) -> Result<TagValue, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();
    if content_type == VALUE_CONTENT_TYPE {
        let json: serde_json::Value =
            serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
        if !is_primitive(&json) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    Ok(TagValue {
        content_type,
        bytes: body.to_vec(),
    })
}

fn store_value(
    store: &mut Store,
    headers: &HeaderMap,
    object: Uuid,
    tag: &str,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    writer(store, headers, tag)?;
    if !store.tags.contains_key(tag) {
        return Err(StatusCode::NOT_FOUND);
    }
    let value = parse_value(headers, body)?;
    debug!("storing {} under {tag} on {object}", value.content_type);
    store.set_value(object, tag, value);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_object(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    let values = store.objects.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let tag_paths: Vec<&String> = values.keys().collect();
    let about = values.get(ABOUT_TAG).and_then(TagValue::as_json);
    Ok(Json(json!({ "about": about, "tagPaths": tag_paths })))
}

async fn get_object_value(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, tag)): Path<(Uuid, String)>,
) -> Result<Response, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    store
        .value(id, &tag)
        .map(value_response)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_object_value(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, tag)): Path<(Uuid, String)>,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    if !store.objects.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    store_value(&mut store, &headers, id, &tag, body)
}

async fn delete_object_value(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, tag)): Path<(Uuid, String)>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    writer(&store, &headers, &tag)?;
    store
        .remove_value(id, &tag)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

// ---------------------------------------------------------------------------
// About
// ---------------------------------------------------------------------------

async fn get_about(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(about): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    let id = store.abouts.get(&about).ok_or(StatusCode::NOT_FOUND)?;
    let tag_paths: Vec<&String> = store
        .objects
        .get(id)
        .map(|values| values.keys().collect())
        .unwrap_or_default();
    Ok(Json(json!({ "id": id, "tagPaths": tag_paths })))
}

async fn create_about(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(about): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let mut store = db.write().await;
    caller(&store, &headers)?.ok_or(StatusCode::UNAUTHORIZED)?;
    let existed = store.abouts.contains_key(&about);
    let id = store.about_object(&about);
    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(json!({ "id": id, "URI": format!("/objects/{id}") }))))
}

async fn get_about_value(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((about, tag)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    let id = store.abouts.get(&about).ok_or(StatusCode::NOT_FOUND)?;
    store
        .value(*id, &tag)
        .map(value_response)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_about_value(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((about, tag)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    writer(&store, &headers, &tag)?;
    if !store.tags.contains_key(&tag) {
        return Err(StatusCode::NOT_FOUND);
    }
    let id = store.about_object(&about);
    store_value(&mut store, &headers, id, &tag, body)
}

async fn delete_about_value(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((about, tag)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    writer(&store, &headers, &tag)?;
    let id = *store.abouts.get(&about).ok_or(StatusCode::NOT_FOUND)?;
    store
        .remove_value(id, &tag)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// `GET /values?query=has <tag>&tag=<path>...`
///
/// Only `has` queries are understood. Primitive values are inlined; opaque
/// ones are described by content type and size.
async fn query_values(
    State(db): State<Db>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = db.read().await;
    caller(&store, &headers)?;
    let pairs = query_pairs(query.as_deref());

    let expression = pairs
        .iter()
        .find(|(k, _)| k == "query")
        .map(|(_, v)| v.as_str())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let tag = expression
        .trim()
        .strip_prefix("has ")
        .map(str::trim)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let wanted: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == "tag")
        .map(|(_, v)| v.as_str())
        .collect();
    if wanted.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut results = serde_json::Map::new();
    for id in store.objects_with(tag) {
        let mut entry = serde_json::Map::new();
        for wanted_tag in &wanted {
            if let Some(value) = store.value(id, wanted_tag) {
                let rendered = match value.as_json() {
                    Some(json) => json!({ "value": json }),
                    None => json!({
                        "value-type": value.content_type,
                        "size": value.bytes.len(),
                    }),
                };
                entry.insert(wanted_tag.to_string(), rendered);
            }
        }
        results.insert(id.to_string(), serde_json::Value::Object(entry));
    }
    Ok(Json(json!({ "results": { "id": results } })))
}

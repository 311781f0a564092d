//! The FluidDB call dispatcher.
//!
//! # Design
//! `FluidClient` holds the instance URL, optional credentials and a
//! `Transport`. A call runs in three steps, each usable on its own:
//!
//! 1. `build_request` turns a `Call` into an `HttpRequest` (no I/O).
//! 2. The transport performs exactly one round-trip.
//! 3. `parse_response` decodes the body by its declared content type.
//!
//! Non-2xx statuses are returned as ordinary `Response` metadata. The only
//! error raised before I/O is `ApiError::InvalidUsage`, for a body that can
//! be neither JSON-encoded nor sent verbatim.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::http::{
    media_type, HttpMethod, HttpRequest, HttpResponse, Response, JSON_CONTENT_TYPE,
    PRIMITIVE_CONTENT_TYPE,
};
use crate::path::{build_url, Path, QueryValue};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Body, Value};

/// One request to a FluidDB instance, described as data.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: HttpMethod,
    pub path: Path,
    pub body: Option<Value>,
    pub mime_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, QueryValue)>,
}

impl Call {
    pub fn new(method: HttpMethod, path: impl Into<Path>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            mime_type: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<Path>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<Path>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<Path>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<Path>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn head(path: impl Into<Path>) -> Self {
        Self::new(HttpMethod::Head, path)
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Send the body verbatim with this content type.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Add a request header. Custom headers replace defaults of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Client for a single FluidDB instance.
#[derive(Clone)]
pub struct FluidClient {
    instance: String,
    credentials: Option<Credentials>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for FluidClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluidClient")
            .field("instance", &self.instance)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl FluidClient {
    /// An anonymous client for `instance`, e.g. `config::SANDBOX`.
    pub fn new(instance: &str) -> Self {
        Self {
            instance: instance.trim_end_matches('/').to_string(),
            credentials: None,
            transport: Arc::new(UreqTransport::new()),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut client = Self::new(&config.instance);
        client.credentials = config.credentials.clone();
        client
    }

    /// Replace the transport used by `call`.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn set_instance(&mut self, instance: &str) {
        self.instance = instance.trim_end_matches('/').to_string();
    }

    /// Use these credentials on every following call. No request is made.
    pub fn login(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.credentials = Some(Credentials::new(username, password));
    }

    /// Go back to anonymous calls.
    pub fn logout(&mut self) {
        self.credentials = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::username)
    }

    /// Absolute URL for `path` on this instance.
    pub fn build_url(&self, path: impl Into<Path>) -> String {
        build_url(&self.instance, &path.into(), &[])
    }

    pub fn build_request(&self, call: &Call) -> Result<HttpRequest, ApiError> {
        let url = build_url(&self.instance, &call.path, &call.query);

        let mut headers = vec![("Accept".to_string(), JSON_CONTENT_TYPE.to_string())];
        if let Some(credentials) = &self.credentials {
            headers.push(("Authorization".to_string(), credentials.authorization()));
        }

        let body = match &call.body {
            Some(value) => {
                let (bytes, content_type) = encode_body(value, call.mime_type.as_deref())?;
                headers.push(("Content-Type".to_string(), content_type));
                Some(bytes)
            }
            None => None,
        };

        for (name, value) in &call.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        Ok(HttpRequest {
            method: call.method,
            url,
            headers,
            body,
        })
    }

    pub fn parse_response(
        &self,
        method: HttpMethod,
        response: HttpResponse,
    ) -> Result<(Response, Body), ApiError> {
        let HttpResponse {
            status,
            headers,
            body,
        } = response;
        let meta = Response { status, headers };
        let body = decode_body(method, meta.content_type(), body)?;
        Ok((meta, body))
    }

    /// Build, send and decode one request.
    pub fn call(&self, call: &Call) -> Result<(Response, Body), ApiError> {
        let request = self.build_request(call)?;
        debug!(
            method = %request.method,
            url = %request.url,
            content_type = request.header("content-type").unwrap_or("-"),
            "fluiddb request"
        );

        let response = self.transport.execute(request)?;
        debug!(
            status = response.status,
            content_type = response.header("content-type").unwrap_or("-"),
            "fluiddb response"
        );

        self.parse_response(call.method, response)
    }
}

/// Choose the wire form of a request body.
///
/// | mapping | MIME given | primitive | result |
/// |---------|------------|-----------|--------|
/// | yes | any | any | JSON, `application/json` |
/// | no | yes | any | verbatim, the given MIME type |
/// | no | no | yes | JSON, `application/vnd.fluiddb.value+json` |
/// | no | no | no | `InvalidUsage` |
pub fn encode_body(body: &Value, mime_type: Option<&str>) -> Result<(Vec<u8>, String), ApiError> {
    match (body.is_mapping(), mime_type, body.is_primitive()) {
        (true, _, _) => Ok((body.to_json_bytes()?, JSON_CONTENT_TYPE.to_string())),
        (false, Some(mime_type), _) => Ok((body.to_raw_bytes()?, mime_type.to_string())),
        (false, None, true) => Ok((body.to_json_bytes()?, PRIMITIVE_CONTENT_TYPE.to_string())),
        (false, None, false) => Err(ApiError::InvalidUsage(
            "cannot encode a non-primitive value without a MIME type".to_string(),
        )),
    }
}

/// Decode a response body by its content type. HEAD responses are always empty.
pub fn decode_body(
    method: HttpMethod,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> Result<Body, ApiError> {
    if method == HttpMethod::Head || body.is_empty() {
        return Ok(Body::Empty);
    }

    let media_type = content_type.map(media_type).unwrap_or_default();
    if media_type == PRIMITIVE_CONTENT_TYPE {
        let json: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Ok(Body::Value(Value::from(json)))
    } else if media_type == JSON_CONTENT_TYPE {
        let json = serde_json::from_slice(&body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Ok(Body::Json(json))
    } else {
        Ok(Body::Raw(body))
    }
}

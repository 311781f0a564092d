//! Executes an `HttpRequest` and returns the `HttpResponse`.
//!
//! # Design
//! `Transport` is the single seam where network I/O happens. The default
//! `UreqTransport` uses a blocking ureq agent with status-as-error disabled,
//! so 4xx/5xx responses come back as data for the caller to inspect.

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs exactly one HTTP round-trip per call.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! with_headers {
    ($builder:expr, $headers:expr) => {{
        let mut builder = $builder;
        for (name, value) in $headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }};
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        // GET, HEAD and DELETE builders carry no body unless forced to.
        let result = match (method, body) {
            (HttpMethod::Get, None) => with_headers!(self.agent.get(&url), &headers).call(),
            (HttpMethod::Get, Some(body)) => with_headers!(self.agent.get(&url), &headers)
                .force_send_body()
                .send(&body[..]),
            (HttpMethod::Head, None) => with_headers!(self.agent.head(&url), &headers).call(),
            (HttpMethod::Head, Some(body)) => with_headers!(self.agent.head(&url), &headers)
                .force_send_body()
                .send(&body[..]),
            (HttpMethod::Delete, None) => with_headers!(self.agent.delete(&url), &headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers!(self.agent.delete(&url), &headers)
                .force_send_body()
                .send(&body[..]),
            (HttpMethod::Post, Some(body)) => {
                with_headers!(self.agent.post(&url), &headers).send(&body[..])
            }
            (HttpMethod::Post, None) => with_headers!(self.agent.post(&url), &headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers!(self.agent.put(&url), &headers).send(&body[..])
            }
            (HttpMethod::Put, None) => with_headers!(self.agent.put(&url), &headers).send_empty(),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = if method == HttpMethod::Head {
            Vec::new()
        } else {
            response.body_mut().read_to_vec()?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

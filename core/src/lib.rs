//! Thin synchronous client for FluidDB's HTTP API.
//!
//! # Overview
//! Builds a URL from a path, attaches Basic-Authentication when logged in,
//! encodes the request body by FluidDB's value rules, sends one request and
//! decodes the response by its content type.
//!
//! # Design
//! - `FluidClient` owns the instance URL and optional credentials; there is no
//!   process-wide state, so independent clients can live on separate threads.
//! - Each call is split into `build_request` (pure), a `Transport` round-trip,
//!   and `parse_response` (pure), so the encoding rules are testable offline.
//! - `Value` is a closed set of payload shapes decided at construction; the
//!   primitive/mapping/opaque policy is a single case table in `encode_body`.
//! - Non-2xx statuses are data, never errors.
//!
//! ```no_run
//! use fluiddb_core::{config, Call, FluidClient};
//!
//! let mut client = FluidClient::new(config::SANDBOX);
//! client.login("test", "test");
//! let (response, body) = client.call(&Call::get("/users/test"))?;
//! assert_eq!(response.status, 200);
//! println!("{:?}", body.get("id"));
//! # Ok::<(), fluiddb_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod path;
pub mod transport;
pub mod types;

pub use client::{decode_body, encode_body, Call, FluidClient};
pub use config::{ClientConfig, MAIN, SANDBOX};
pub use credentials::Credentials;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Response};
pub use path::{build_url, Path, QueryValue};
pub use transport::{Transport, UreqTransport};
pub use types::{is_primitive, Body, Value};

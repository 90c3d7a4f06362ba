//! Synchronous HTTP/1.1 client core.
//!
//! # Overview
//! Requests are assembled with `RequestBuilder` into immutable `HttpRequest`
//! values, handed to `Client::new_call`, and executed with
//! `Call::execute::<T>()`, which returns an `HttpResponse<T>` whose body is
//! decoded into the caller's chosen type.
//!
//! ```no_run
//! use httpizza_core::{Client, HttpResponse};
//!
//! # fn main() -> httpizza_core::Result<()> {
//! let client = Client::new();
//! let request = client
//!     .new_request()
//!     .url("http://localhost:3000/path?query1=1&query2=2")
//!     .add_header("User-Agent", "UnitTest")
//!     .post("requestBody")
//!     .build()?;
//! let response: HttpResponse<String> = client.new_call(request).execute()?;
//! assert!(response.is_successful());
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - One blocking connection per call; no pooling, redirects, TLS or retries.
//! - The wire codec is separate from the transport, so the executor runs over
//!   TCP in production and over in-memory streams in tests.
//! - Build errors are reported before any I/O; runtime errors are returned
//!   to the caller unchanged.

pub mod body;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;

pub use body::{boxed, BoxBody, FromBody, Json, RequestBody};
pub use client::{Call, Client};
pub use config::ClientConfig;
pub use error::{HttpError, Result};
pub use http::{Headers, HttpMethod};
pub use request::{HttpRequest, RequestBuilder};
pub use response::HttpResponse;
pub use transport::{TcpTransport, Transport};

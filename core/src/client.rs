//! Synchronous call executor.
//!
//! # Design
//! `Client` holds only its configuration and a transport and carries no
//! mutable state between calls, so one instance can be shared freely. Each
//! `Call` owns exactly one `HttpRequest` and consumes itself on `execute`.
//!
//! The request is fully encoded before the transport is touched: body
//! encoding failures never open a connection. After that the exchange is
//! connect, write, flush, read head, read body, decode. Nothing is retried.

use std::io::{BufReader, Write};

use tracing::{debug, trace, warn};

use crate::body::FromBody;
use crate::codec::{self, ResponseHead};
use crate::config::ClientConfig;
use crate::error::{HttpError, Result};
use crate::request::{HttpRequest, RequestBuilder};
use crate::response::HttpResponse;
use crate::transport::{TcpTransport, Transport};

/// Entry point for building and executing requests.
#[derive(Debug, Clone)]
pub struct Client<T = TcpTransport> {
    transport: T,
    config: ClientConfig,
}

impl Client {
    /// TCP client with default configuration.
    pub fn new() -> Self {
        let config = ClientConfig::default();
        Self {
            transport: TcpTransport::from_config(&config),
            config,
        }
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: TcpTransport::from_config(&config),
            config,
        })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Client<T> {
    /// Client over a custom transport. Timeouts in `config` are the
    /// transport's business; the client only uses the parser limits.
    pub fn with_transport(transport: T, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn new_request(&self) -> RequestBuilder {
        RequestBuilder::new()
    }

    pub fn new_call(&self, request: HttpRequest) -> Call<'_, T> {
        Call { client: self, request }
    }
}

/// One request/response exchange. Created by `Client::new_call`.
pub struct Call<'c, T> {
    client: &'c Client<T>,
    request: HttpRequest,
}

impl<T: Transport> Call<'_, T> {
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Perform the exchange and decode the body into `B`.
    pub fn execute<B: FromBody>(self) -> Result<HttpResponse<B>> {
        let request = self.request;
        let wire = codec::encode_request(&request)?;
        debug!(
            method = %request.method(),
            url = %request.url(),
            bytes = wire.len(),
            "sending request"
        );

        let (head, raw_body) = match exchange(&self.client.transport, &self.client.config, &request, &wire) {
            Ok(reply) => reply,
            Err(HttpError::Transport(e)) => {
                warn!(url = %request.url(), error = %e, "transport failure");
                return Err(HttpError::Transport(e));
            }
            Err(e) => return Err(e),
        };

        let body = B::from_body(raw_body, head.headers.get("Content-Type"))?;
        Ok(HttpResponse::new(head.code, head.reason, head.headers, body))
    }
}

fn exchange<T: Transport>(
    transport: &T,
    config: &ClientConfig,
    request: &HttpRequest,
    wire: &[u8],
) -> Result<(ResponseHead, Vec<u8>)> {
    let mut conn = transport.connect(request.host(), request.port())?;
    conn.write_all(wire)?;
    conn.flush()?;

    let mut reader = BufReader::new(conn);
    let head = codec::read_response_head(&mut reader, config.max_head_bytes)?;
    debug!(code = head.code, reason = %head.reason, "received response head");
    let body = codec::read_response_body(&mut reader, request.method(), &head)?;
    trace!(bytes = body.len(), "read response body");
    Ok((head, body))
}

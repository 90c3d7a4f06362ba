//! Request values and the builder that produces them.
//!
//! # Design
//! `RequestBuilder` is consumed by value. Setters never fail immediately;
//! problems are remembered and reported by `build()`, so a chain of setters
//! reads top to bottom without intermediate `?`. The url and the method are
//! tracked separately: setting one again replaces both its value and any
//! error the earlier call left behind. Header errors stay until `build()`. A built
//! `HttpRequest` is immutable: its body sits behind an `Arc` and nothing
//! exposes `&mut` access.

use std::fmt;

use url::{Host, Url};

use crate::body::{boxed, BoxBody, RequestBody};
use crate::error::{HttpError, Result};
use crate::http::{is_token, is_valid_header_value, Headers, HttpMethod};

/// An immutable HTTP request, ready to be handed to `Client::new_call`.
#[derive(Clone)]
pub struct HttpRequest {
    method: HttpMethod,
    url: Url,
    host: String,
    port: u16,
    headers: Headers,
    body: Option<BoxBody>,
}

impl HttpRequest {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of a caller-supplied header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> Option<&dyn RequestBody> {
        self.body.as_deref()
    }

    /// Request target as it appears on the request line: `/path?query`.
    pub fn path_and_query(&self) -> String {
        let mut target = self.url.path().to_string();
        if let Some(query) = self.url.query() {
            target.push('?');
            target.push_str(query);
        }
        target
    }

    /// Value for the `Host` header. The port is only present when it is not
    /// the scheme default.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or(self.host.as_str());
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Host to connect to, without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|b| b.content_type()))
            .finish()
    }
}

/// Accumulates the parts of a request. Obtain one from `Client::new_request`
/// or `HttpRequest::builder`.
#[derive(Default)]
pub struct RequestBuilder {
    method: Option<HttpMethod>,
    url: Option<Url>,
    headers: Headers,
    body: Option<BoxBody>,
    url_error: Option<HttpError>,
    method_error: Option<HttpError>,
    header_error: Option<HttpError>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target. Only absolute `http://` URLs are accepted.
    pub fn url(mut self, url: &str) -> Self {
        match parse_url(url) {
            Ok(parsed) => {
                self.url = Some(parsed);
                self.url_error = None;
            }
            Err(e) => {
                self.url = None;
                self.url_error = Some(e);
            }
        }
        self
    }

    /// Append a header. Earlier values for the same name are kept.
    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        if !is_token(name) {
            self.fail_header(HttpError::InvalidHeader {
                name: name.to_string(),
                reason: "name is not a valid token",
            });
        } else if !is_valid_header_value(value) {
            self.fail_header(HttpError::InvalidHeader {
                name: name.to_string(),
                reason: "value contains CR, LF or NUL",
            });
        } else {
            self.headers.add(name, value);
        }
        self
    }

    pub fn get(self) -> Self {
        self.set_method(HttpMethod::Get, None)
    }

    pub fn head(self) -> Self {
        self.set_method(HttpMethod::Head, None)
    }

    pub fn delete(self) -> Self {
        self.set_method(HttpMethod::Delete, None)
    }

    pub fn post<B: RequestBody + 'static>(self, body: B) -> Self {
        self.set_method(HttpMethod::Post, Some(boxed(body)))
    }

    pub fn put<B: RequestBody + 'static>(self, body: B) -> Self {
        self.set_method(HttpMethod::Put, Some(boxed(body)))
    }

    pub fn patch<B: RequestBody + 'static>(self, body: B) -> Self {
        self.set_method(HttpMethod::Patch, Some(boxed(body)))
    }

    /// Set any method by name, with an optional body.
    pub fn method(mut self, name: &str, body: Option<BoxBody>) -> Self {
        match name.parse::<HttpMethod>() {
            Ok(method) => self.set_method(method, body),
            Err(e) => {
                self.method = None;
                self.body = None;
                self.method_error = Some(e);
                self
            }
        }
    }

    /// Validate and freeze the request.
    pub fn build(self) -> Result<HttpRequest> {
        if let Some(err) = self.url_error.or(self.method_error).or(self.header_error) {
            return Err(err);
        }
        let method = self.method.ok_or(HttpError::IncompleteRequest("method"))?;
        let url = self.url.ok_or(HttpError::IncompleteRequest("url"))?;
        let (host, port) = connect_target(&url)?;
        Ok(HttpRequest {
            method,
            url,
            host,
            port,
            headers: self.headers,
            body: self.body,
        })
    }

    fn set_method(mut self, method: HttpMethod, body: Option<BoxBody>) -> Self {
        self.method_error = if body.is_some() && !method.permits_body() {
            Some(HttpError::InvalidMethodBody {
                method: method.to_string(),
            })
        } else {
            None
        };
        self.method = Some(method);
        self.body = body;
        self
    }

    fn fail_header(&mut self, err: HttpError) {
        if self.header_error.is_none() {
            self.header_error = Some(err);
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let invalid = |reason: String| HttpError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn connect_target(url: &Url) -> Result<(String, u16)> {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => {
            return Err(HttpError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            })
        }
    };
    Ok((host, url.port_or_known_default().unwrap_or(80)))
}

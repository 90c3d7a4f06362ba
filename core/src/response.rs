//! Decoded HTTP responses.

use crate::http::Headers;

/// A response whose body has been decoded into `T`.
///
/// Built by `Call::execute`, or directly by hosts that perform their own I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse<T> {
    code: u16,
    message: String,
    headers: Headers,
    body: T,
}

impl<T> HttpResponse<T> {
    pub fn new(code: u16, message: impl Into<String>, headers: Headers, body: T) -> Self {
        Self {
            code,
            message: message.into(),
            headers,
            body,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// Reason phrase from the status line, possibly empty.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of a response header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn into_body(self) -> T {
        self.body
    }

    /// True iff the status code is in `200..300`.
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HttpResponse<U> {
        HttpResponse {
            code: self.code,
            message: self.message,
            headers: self.headers,
            body: f(self.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: u16) -> HttpResponse<String> {
        let headers: Headers = [("Content-Type", "text/plain")].into_iter().collect();
        HttpResponse::new(code, "", headers, "body".to_string())
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(!response(199).is_successful());
        assert!(response(200).is_successful());
        assert!(response(204).is_successful());
        assert!(response(299).is_successful());
        assert!(!response(300).is_successful());
        assert!(!response(404).is_successful());
    }

    #[test]
    fn headers_and_body_accessors() {
        let resp = response(200);
        assert_eq!(resp.headers().get_all("Content-Type")[0], "text/plain");
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.body(), "body");
        assert_eq!(resp.map(|b| b.len()).into_body(), 4);
    }
}

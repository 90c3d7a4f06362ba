//! Request body encoding and response body decoding.
//!
//! # Design
//! A request body is anything implementing `RequestBody`: it may declare a
//! content type and knows how to write its bytes into a sink. The executor
//! writes the body into memory before connecting, so `Content-Length` is
//! always exact and an encoding failure never leaves a half-sent request.
//!
//! The Rust type of a value doubles as its serialization hint: strings go out
//! as `text/plain; charset=utf-8`, raw bytes as `application/octet-stream`,
//! and `Json<T>` as `application/json; charset=utf-8`.
//!
//! Response bodies decode through `FromBody`, chosen by the caller's target
//! type on `Call::execute`.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HttpError, Result};

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
pub const APPLICATION_JSON_UTF8: &str = "application/json; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A request body: an optional content type plus a way to produce the bytes.
pub trait RequestBody: Send + Sync {
    /// `None` means no `Content-Type` header is sent for this body.
    fn content_type(&self) -> Option<&str>;

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()>;
}

/// Shared, type-erased request body as stored on an `HttpRequest`.
pub type BoxBody = Arc<dyn RequestBody>;

/// Erase a concrete body type, e.g. for `RequestBuilder::method`.
pub fn boxed<B: RequestBody + 'static>(body: B) -> BoxBody {
    Arc::new(body)
}

impl<B: RequestBody + ?Sized> RequestBody for Arc<B> {
    fn content_type(&self) -> Option<&str> {
        (**self).content_type()
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        (**self).write_to(sink)
    }
}

impl RequestBody for &'static str {
    fn content_type(&self) -> Option<&str> {
        Some(TEXT_PLAIN_UTF8)
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        sink.write_all(self.as_bytes())
    }
}

impl RequestBody for String {
    fn content_type(&self) -> Option<&str> {
        Some(TEXT_PLAIN_UTF8)
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        sink.write_all(self.as_bytes())
    }
}

/// Text that is either static or owned. A borrowed `&str` with a shorter
/// lifetime has to be turned into a `String` first, since built requests
/// own their bodies.
impl RequestBody for Cow<'static, str> {
    fn content_type(&self) -> Option<&str> {
        Some(TEXT_PLAIN_UTF8)
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        sink.write_all(self.as_bytes())
    }
}

impl RequestBody for Vec<u8> {
    fn content_type(&self) -> Option<&str> {
        Some(OCTET_STREAM)
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        sink.write_all(self)
    }
}

impl RequestBody for Bytes {
    fn content_type(&self) -> Option<&str> {
        Some(OCTET_STREAM)
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        sink.write_all(self)
    }
}

/// JSON wrapper, usable both as a request body and as a response target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize + Send + Sync> RequestBody for Json<T> {
    fn content_type(&self) -> Option<&str> {
        Some(APPLICATION_JSON_UTF8)
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(sink, &self.0).map_err(io::Error::from)
    }
}

/// Serialize a body into memory, returning its bytes.
pub(crate) fn encode(body: &dyn RequestBody) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    body.write_to(&mut buf).map_err(HttpError::BodyEncode)?;
    Ok(buf)
}

/// Target types a response body can be decoded into.
pub trait FromBody: Sized {
    /// `content_type` is the response's first `Content-Type` value, if any.
    fn from_body(body: Vec<u8>, content_type: Option<&str>) -> Result<Self>;
}

impl FromBody for String {
    fn from_body(body: Vec<u8>, content_type: Option<&str>) -> Result<Self> {
        let charset = content_type.and_then(charset_param);
        match charset.as_deref() {
            None => decode_utf8(body),
            Some(cs) if cs.eq_ignore_ascii_case("utf-8") || cs.eq_ignore_ascii_case("utf8") => decode_utf8(body),
            Some(cs) if cs.eq_ignore_ascii_case("us-ascii") => decode_utf8(body),
            Some(cs) if cs.eq_ignore_ascii_case("iso-8859-1") || cs.eq_ignore_ascii_case("latin1") => {
                // ISO-8859-1 maps every byte to the code point of the same value.
                Ok(body.into_iter().map(char::from).collect())
            }
            Some(cs) => Err(HttpError::BodyDecode {
                target: "String",
                reason: format!("unsupported charset `{cs}`"),
            }),
        }
    }
}

impl FromBody for Vec<u8> {
    fn from_body(body: Vec<u8>, _content_type: Option<&str>) -> Result<Self> {
        Ok(body)
    }
}

impl FromBody for Bytes {
    fn from_body(body: Vec<u8>, _content_type: Option<&str>) -> Result<Self> {
        Ok(Bytes::from(body))
    }
}

/// Discards the body.
impl FromBody for () {
    fn from_body(_body: Vec<u8>, _content_type: Option<&str>) -> Result<Self> {
        Ok(())
    }
}

impl<T: DeserializeOwned> FromBody for Json<T> {
    fn from_body(body: Vec<u8>, _content_type: Option<&str>) -> Result<Self> {
        serde_json::from_slice(&body).map(Json).map_err(|e| HttpError::BodyDecode {
            target: "JSON",
            reason: e.to_string(),
        })
    }
}

fn decode_utf8(body: Vec<u8>) -> Result<String> {
    String::from_utf8(body).map_err(|e| HttpError::BodyDecode {
        target: "String",
        reason: e.to_string(),
    })
}

/// Extract the `charset` parameter from a media type, without quotes.
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Pizza {
        name: String,
        slices: u8,
    }

    struct EmptyBody;

    impl RequestBody for EmptyBody {
        fn content_type(&self) -> Option<&str> {
            None
        }

        fn write_to(&self, _sink: &mut dyn Write) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingBody;

    impl RequestBody for FailingBody {
        fn content_type(&self) -> Option<&str> {
            Some("text/plain")
        }

        fn write_to(&self, _sink: &mut dyn Write) -> io::Result<()> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn string_bodies_default_to_utf8_text() {
        let body = "requestBody";
        assert_eq!(body.content_type(), Some(TEXT_PLAIN_UTF8));
        assert_eq!(encode(&body).unwrap().len(), 11);

        let body = String::from("héllo");
        assert_eq!(encode(&body).unwrap(), "héllo".as_bytes());
    }

    #[test]
    fn cow_bodies_are_text_either_way() {
        let borrowed: Cow<'static, str> = Cow::Borrowed("menu");
        let owned: Cow<'static, str> = Cow::Owned(format!("{} slices", 8));
        assert_eq!(borrowed.content_type(), Some(TEXT_PLAIN_UTF8));
        assert_eq!(encode(&borrowed).unwrap(), b"menu");
        assert_eq!(encode(&owned).unwrap(), b"8 slices");
    }

    #[test]
    fn byte_bodies_are_octet_streams() {
        let body = vec![0u8, 1, 2];
        assert_eq!(body.content_type(), Some(OCTET_STREAM));
        assert_eq!(encode(&Bytes::from_static(b"abc")).unwrap(), b"abc");
    }

    #[test]
    fn json_body_serializes_value() {
        let body = Json(Pizza { name: "margherita".to_string(), slices: 8 });
        assert_eq!(body.content_type(), Some(APPLICATION_JSON_UTF8));
        let bytes = encode(&body).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["name"], "margherita");
        assert_eq!(value["slices"], 8);
    }

    #[test]
    fn custom_body_without_content_type() {
        let body = boxed(EmptyBody);
        assert!(body.content_type().is_none());
        assert!(encode(&body).unwrap().is_empty());
    }

    #[test]
    fn failing_body_reports_encode_error() {
        let err = encode(&FailingBody).unwrap_err();
        assert!(matches!(err, HttpError::BodyEncode(_)));
    }

    #[test]
    fn string_target_rejects_invalid_utf8() {
        let err = String::from_body(vec![0xff, 0xfe], Some("text/plain")).unwrap_err();
        assert!(matches!(err, HttpError::BodyDecode { target: "String", .. }));
    }

    #[test]
    fn string_target_honours_latin1_charset() {
        let text = String::from_body(vec![0x63, 0x61, 0x66, 0xe9], Some("text/plain; charset=ISO-8859-1")).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn string_target_rejects_unknown_charset() {
        let err = String::from_body(b"x".to_vec(), Some("text/plain; charset=\"shift_jis\"")).unwrap_err();
        assert!(err.to_string().contains("shift_jis"));
    }

    #[test]
    fn json_target_decodes_or_fails() {
        let Json(pizza) = Json::<Pizza>::from_body(br#"{"name":"diavola","slices":6}"#.to_vec(), None).unwrap();
        assert_eq!(pizza, Pizza { name: "diavola".to_string(), slices: 6 });

        let err = Json::<Pizza>::from_body(b"not json".to_vec(), None).unwrap_err();
        assert!(matches!(err, HttpError::BodyDecode { target: "JSON", .. }));
    }
}

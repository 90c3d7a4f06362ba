//! HTTP/1.1 wire codec: request serialization and response parsing.
//!
//! # Design
//! The codec owns no connection. `encode_request` renders a whole request
//! (head and body) into memory, and the read side works on any `BufRead`, so
//! the same functions serve the TCP executor, in-memory tests and the JSON
//! test vectors.
//!
//! The executor owns `Host`, `Content-Length`, `Transfer-Encoding` and
//! `Connection`. Caller-supplied copies of the last three are not forwarded;
//! a caller `Host` replaces the computed one. The body's content type is only
//! a default: an explicit caller `Content-Type` goes out instead.
//!
//! Response heads are collected line by line under a byte budget and then
//! tokenized by `httparse`.

use std::io::{BufRead, Read};

use tracing::trace;

use crate::body;
use crate::error::{HttpError, Result};
use crate::http::{Headers, HttpMethod};
use crate::request::HttpRequest;

/// Upper bound for a single chunk-size or trailer line.
const CHUNK_LINE_LIMIT: usize = 4096;

/// Render `request` exactly as it goes on the wire.
pub fn encode_request(request: &HttpRequest) -> Result<Vec<u8>> {
    let caller_type = request.headers().contains("Content-Type");
    let (payload, body_type) = match request.body() {
        Some(body) => (Some(body::encode(body)?), body.content_type()),
        None => (None, None),
    };
    // A body that writes nothing and has no content type is treated as absent.
    let payload = payload.filter(|bytes| !bytes.is_empty() || body_type.is_some() || caller_type);

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method(), request.path_and_query());
    if !request.headers().contains("Host") {
        push_header(&mut head, "Host", &request.authority());
    }
    for (name, value) in request.headers().iter() {
        if is_executor_managed(name) {
            continue;
        }
        push_header(&mut head, name, value);
    }
    if let Some(bytes) = &payload {
        if let Some(body_type) = body_type.filter(|_| !caller_type) {
            push_header(&mut head, "Content-Type", body_type);
        }
        push_header(&mut head, "Content-Length", &bytes.len().to_string());
    }
    push_header(&mut head, "Connection", "close");
    head.push_str("\r\n");

    let mut wire = head.into_bytes();
    if let Some(bytes) = payload {
        wire.extend_from_slice(&bytes);
    }
    Ok(wire)
}

fn push_header(head: &mut String, name: &str, value: &str) {
    head.push_str(name);
    head.push_str(": ");
    head.push_str(value);
    head.push_str("\r\n");
}

fn is_executor_managed(name: &str) -> bool {
    ["Content-Length", "Transfer-Encoding", "Connection"]
        .iter()
        .any(|managed| name.eq_ignore_ascii_case(managed))
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub code: u16,
    pub reason: String,
    pub headers: Headers,
}

/// How the body following a response head is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// No body at all (HEAD request, 1xx, 204, 304).
    Empty,
    Chunked,
    Length(u64),
    /// Body runs until the server closes the connection.
    UntilClose,
}

/// Read the final response head, skipping interim `1xx` responses.
pub fn read_response_head<R: BufRead>(reader: &mut R, max_head_bytes: usize) -> Result<ResponseHead> {
    loop {
        let head = read_one_head(reader, max_head_bytes)?;
        if (100..200).contains(&head.code) && head.code != 101 {
            trace!(code = head.code, "skipping interim response");
            continue;
        }
        return Ok(head);
    }
}

fn read_one_head<R: BufRead>(reader: &mut R, max_head_bytes: usize) -> Result<ResponseHead> {
    let (raw, header_lines) = read_head_bytes(reader, max_head_bytes)?;

    let mut slots = vec![httparse::EMPTY_HEADER; header_lines];
    let mut response = httparse::Response::new(&mut slots);
    match response.parse(&raw) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => return Err(HttpError::protocol("incomplete response head")),
        Err(e) => return Err(HttpError::protocol(format!("malformed response head: {e}"))),
    }

    let code = match response.code {
        Some(code) if code >= 100 => code,
        _ => return Err(HttpError::protocol("malformed status line")),
    };
    let reason = response.reason.unwrap_or_default().to_string();
    let mut headers = Headers::new();
    for header in response.headers.iter() {
        // Header bytes outside ASCII are ISO-8859-1 per RFC 9110.
        let value: String = header.value.iter().copied().map(char::from).collect();
        headers.add(header.name, value.trim_matches([' ', '\t']));
    }
    Ok(ResponseHead { code, reason, headers })
}

/// Collect one response head up to and including its blank line. Returns
/// the raw bytes and the number of header lines seen.
fn read_head_bytes<R: BufRead>(reader: &mut R, max_head_bytes: usize) -> Result<(Vec<u8>, usize)> {
    let mut budget = max_head_bytes;
    let mut raw = read_raw_line(reader, &mut budget)?
        .ok_or_else(|| HttpError::protocol("connection closed before status line"))?;

    let mut header_lines = 0;
    loop {
        let line = read_raw_line(reader, &mut budget)?
            .ok_or_else(|| HttpError::protocol("connection closed inside response head"))?;
        let blank = matches!(line.as_slice(), b"\n" | b"\r\n");
        if line.starts_with(b" ") || line.starts_with(b"\t") {
            return Err(HttpError::protocol("obsolete line folding in response header"));
        }
        raw.extend_from_slice(&line);
        if blank {
            return Ok((raw, header_lines));
        }
        header_lines += 1;
    }
}

/// Read one LF terminated line, terminator included, charging it to
/// `budget`. Returns `None` on a clean end of stream before any byte.
fn read_raw_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let read = reader.by_ref().take(*budget as u64).read_until(b'\n', &mut buf)?;
    if read == 0 {
        if *budget == 0 {
            return Err(HttpError::protocol("line exceeds size limit"));
        }
        return Ok(None);
    }
    *budget -= read;
    if buf.last() != Some(&b'\n') {
        if *budget == 0 {
            return Err(HttpError::protocol("line exceeds size limit"));
        }
        return Err(HttpError::protocol("connection closed mid-line"));
    }
    Ok(Some(buf))
}

/// Read one CRLF (or bare LF) terminated line with the terminator stripped.
fn read_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<Option<String>> {
    let Some(mut buf) = read_raw_line(reader, budget)? else {
        return Ok(None);
    };
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(buf.into_iter().map(char::from).collect()))
}

/// Decide body framing from the request method and the response head.
pub fn framing(method: &HttpMethod, head: &ResponseHead) -> Result<Framing> {
    if *method == HttpMethod::Head || (100..200).contains(&head.code) || head.code == 204 || head.code == 304 {
        return Ok(Framing::Empty);
    }

    let codings: Vec<&str> = head
        .headers
        .get_all("Transfer-Encoding")
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if let Some(last) = codings.last() {
        return Ok(if last.eq_ignore_ascii_case("chunked") {
            Framing::Chunked
        } else {
            Framing::UntilClose
        });
    }

    let mut length: Option<u64> = None;
    for value in head.headers.get_all("Content-Length").into_iter().flat_map(|v| v.split(',')) {
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HttpError::protocol(format!("invalid Content-Length {value:?}")));
        }
        let parsed: u64 = value
            .parse()
            .map_err(|_| HttpError::protocol(format!("Content-Length out of range: {value}")))?;
        match length {
            Some(previous) if previous != parsed => {
                return Err(HttpError::protocol("conflicting Content-Length values"));
            }
            _ => length = Some(parsed),
        }
    }
    Ok(length.map_or(Framing::UntilClose, Framing::Length))
}

/// Read the body that follows `head`.
pub fn read_response_body<R: BufRead>(reader: &mut R, method: &HttpMethod, head: &ResponseHead) -> Result<Vec<u8>> {
    let framing = framing(method, head)?;
    trace!(?framing, "reading response body");
    match framing {
        Framing::Empty => Ok(Vec::new()),
        Framing::Length(len) => {
            let mut body = Vec::new();
            read_exact_len(reader, len, &mut body)?;
            Ok(body)
        }
        Framing::Chunked => read_chunked(reader),
        Framing::UntilClose => {
            let mut body = Vec::new();
            reader.read_to_end(&mut body)?;
            Ok(body)
        }
    }
}

fn read_chunk_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut budget = CHUNK_LINE_LIMIT;
    read_line(reader, &mut budget)
}

fn read_exact_len<R: BufRead>(reader: &mut R, len: u64, body: &mut Vec<u8>) -> Result<()> {
    let read = reader.by_ref().take(len).read_to_end(body)?;
    if (read as u64) < len {
        return Err(HttpError::protocol(format!(
            "body truncated: expected {len} bytes, got {read}"
        )));
    }
    Ok(())
}

fn read_chunked<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line = read_chunk_line(reader)?
            .ok_or_else(|| HttpError::protocol("connection closed before chunk size"))?;
        let size = line.split(';').next().unwrap_or_default().trim();
        if size.is_empty() || size.len() > 16 || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HttpError::protocol(format!("invalid chunk size {size:?}")));
        }
        let size = u64::from_str_radix(size, 16).map_err(|_| HttpError::protocol("chunk size out of range"))?;

        if size == 0 {
            // Trailer fields are read and dropped.
            while let Some(trailer) = read_chunk_line(reader)? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(body);
        }

        read_exact_len(reader, size, &mut body)?;
        match read_chunk_line(reader)? {
            Some(rest) if rest.is_empty() => {}
            _ => return Err(HttpError::protocol("missing CRLF after chunk data")),
        }
    }
}

//! Response sink.
//!
//! Stages write into a [`Response`] as the request walks the chain. Nothing
//! is sent while the chain runs; the host converts the finished sink into a
//! wire response once the outermost handler returns.

use std::io;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tracing::error;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::set_content_type`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A recording response sink.
///
/// Starts as `200 OK` with no headers and an empty body. Writes append.
///
/// ```rust
/// use plumber::{ContentType, Response};
/// use http::StatusCode;
///
/// let mut res = Response::new();
/// res.set_status(StatusCode::CREATED);
/// res.set_content_type(ContentType::Json);
/// res.write(br#"{"id":42}"#);
/// assert_eq!(res.status(), StatusCode::CREATED);
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any earlier value under the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.set_header("content-type", content_type.as_str());
    }

    /// Appends raw bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Appends UTF-8 text to the body.
    pub fn write_str(&mut self, text: &str) {
        self.body.extend_from_slice(text.as_bytes());
    }

    /// Converts the sink into the `http` response the host sends.
    ///
    /// A header that is not valid on the wire turns the whole response into
    /// `500 Internal Server Error`.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(Bytes::from(self.body))).unwrap_or_else(|e| {
            error!("invalid response: {e}");
            internal_error()
        })
    }
}

pub(crate) fn internal_error() -> http::Response<Full<Bytes>> {
    let mut res = http::Response::new(Full::new(Bytes::new()));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

/// Lets formatting macros and `io::copy` write into the body.
impl io::Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn writes_append_to_the_body() {
        let mut res = Response::new();
        res.write_str("1");
        res.write(b"2");
        write!(res, "{}", 3).unwrap();
        assert_eq!(res.body(), b"123");
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut res = Response::new();
        res.set_header("X-Request-Id", "a");
        res.set_header("x-request-id", "b");
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("X-REQUEST-ID"), Some("b"));
    }

    #[test]
    fn into_http_carries_status_headers_and_body() {
        let mut res = Response::new();
        res.set_status(StatusCode::ACCEPTED);
        res.set_content_type(ContentType::Text);
        res.write_str("queued");

        let http = res.into_http();
        assert_eq!(http.status(), StatusCode::ACCEPTED);
        assert_eq!(http.headers()["content-type"], "text/plain; charset=utf-8");
    }

    #[test]
    fn invalid_header_becomes_internal_error() {
        let mut res = Response::new();
        res.set_header("bad header", "x");
        assert_eq!(res.into_http().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

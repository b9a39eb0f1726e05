//! Incoming request type.
//!
//! The pipeline never inspects a request. It is carried from stage to stage
//! untouched unless a stage chooses to hand a derived one to `next`.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{Extensions, Method};

/// An incoming request.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) peer: Option<SocketAddr>,
    pub(crate) extensions: Extensions,
}

impl Request {
    /// Starts a request for `GET /`. Hosts and tests fill in the rest.
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            inner: Request {
                method: Method::GET,
                path: "/".to_owned(),
                query: None,
                headers: Vec::new(),
                body: Bytes::new(),
                peer: None,
                extensions: Extensions::new(),
            },
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn peer(&self) -> Option<SocketAddr> { self.peer }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a value attached upstream with [`Request::with_extension`].
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Returns a copy of this request carrying `value`.
    ///
    /// A stage passes the derived request to `next` to make `value` visible
    /// to every stage downstream of it:
    ///
    /// ```rust
    /// use plumber::{Handler, Request, Response};
    ///
    /// #[derive(Clone)]
    /// struct Tenant(&'static str);
    ///
    /// fn tenant(req: &Request, res: &mut Response, next: &dyn Handler) {
    ///     next.process(&req.with_extension(Tenant("acme")), res);
    /// }
    /// ```
    pub fn with_extension<T: Clone + Send + Sync + 'static>(&self, value: T) -> Request {
        let mut derived = self.clone();
        derived.extensions.insert(value);
        derived
    }
}

/// Fluent builder for [`Request`]. Obtain via [`Request::builder()`].
pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.inner.method = method;
        self
    }

    /// Sets the path. A `?query` suffix is split off into [`Request::query`].
    pub fn path(mut self, target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => {
                self.inner.path = path.to_owned();
                self.inner.query = Some(query.to_owned());
            }
            None => {
                self.inner.path = target.to_owned();
                self.inner.query = None;
            }
        }
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn peer(mut self, peer: SocketAddr) -> Self {
        self.inner.peer = Some(peer);
        self
    }

    pub fn build(self) -> Request {
        self.inner
    }
}

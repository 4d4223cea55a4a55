use std::fmt;

use crate::http::headers::Headers;

/// HTTP request methods.
///
/// The registered methods get their own variant. Any other method made of
/// uppercase ASCII letters is kept as an extension method; the engine does
/// not judge whether a handler supports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other all-uppercase token, e.g. `PURGE`
    Extension(String),
}

impl Method {
    /// Parses an HTTP method.
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string is a non-empty run of uppercase ASCII
    /// letters, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use courier::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Some(Method::GET));
    /// assert_eq!(Method::parse("PURGE"), Some(Method::Extension("PURGE".into())));
    /// assert_eq!(Method::parse("get"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_uppercase()) {
            return None;
        }

        Some(match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Extension(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Extension(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first line of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    /// Path and query exactly as sent, e.g. `/search?q=rust`
    pub target: String,
    /// Version digits; always `"1.1"` for a parsed request
    pub version: String,
}

/// A fully parsed HTTP request.
///
/// Only produced once parsing reached its terminal state, so the value is
/// never partially filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub line: RequestLine,
    /// Header fields, names and values lower-cased
    pub headers: Headers,
    /// Body bytes, de-chunked when the request used chunked framing
    pub body: Vec<u8>,
    /// Trailer fields of a chunked body; empty otherwise
    pub trailers: Headers,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    headers: Headers,
    body: Vec<u8>,
    trailers: Headers,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            headers: Headers::new(),
            body: Vec::new(),
            trailers: Headers::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.set(key, value);
        self
    }

    pub fn trailer(mut self, key: &str, value: &str) -> Self {
        self.trailers.set(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            line: RequestLine {
                method: self.method.ok_or("method missing")?,
                target: self.target.ok_or("target missing")?,
                version: "1.1".to_string(),
            },
            headers: self.headers,
            body: self.body,
            trailers: self.trailers,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    pub fn method(&self) -> &Method {
        &self.line.method
    }

    pub fn target(&self) -> &str {
        &self.line.target
    }

    /// Retrieves a header value by name, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Whether the body arrived with chunked transfer coding.
    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding") == Some("chunked")
    }
}

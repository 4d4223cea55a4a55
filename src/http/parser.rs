use std::fmt;

use crate::http::headers::{CRLF, HeaderError, Headers, find_crlf};
use crate::http::limits::Limits;
use crate::http::request::{Method, Request, RequestLine};

const HTTP_VERSION_DIGITS: &str = "1.1";

/// Longest chunk-size line accepted, extensions included.
const MAX_CHUNK_LINE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MalformedRequestLine(String),
    InvalidMethod(String),
    UnsupportedVersion(String),
    Header(HeaderError),
    MissingContentLength,
    InvalidContentLength(String),
    UnsupportedTransferEncoding(String),
    /// Both `transfer-encoding` and `content-length` were sent.
    AmbiguousFraming,
    InvalidChunkSize(String),
    /// Chunk data not followed by CRLF.
    MalformedChunk,
    HeadersTooLarge { size: usize, limit: usize },
    BodyTooLarge { size: usize, limit: usize },
    /// `parse` called after the request completed.
    ParseAfterDone,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedRequestLine(reason) => {
                write!(f, "malformed request line: {}", reason)
            }
            ParseError::InvalidMethod(method) => {
                write!(f, "invalid method {:?}: expected uppercase letters", method)
            }
            ParseError::UnsupportedVersion(version) => write!(
                f,
                "unsupported HTTP version {:?}: expected HTTP/{}",
                version, HTTP_VERSION_DIGITS
            ),
            ParseError::Header(e) => write!(f, "bad request: {}", e),
            ParseError::MissingContentLength => write!(f, "missing content-length"),
            ParseError::InvalidContentLength(value) => {
                write!(f, "invalid content-length: {:?}", value)
            }
            ParseError::UnsupportedTransferEncoding(value) => {
                write!(f, "unsupported transfer-encoding: {:?}", value)
            }
            ParseError::AmbiguousFraming => {
                write!(f, "both transfer-encoding and content-length present")
            }
            ParseError::InvalidChunkSize(line) => write!(f, "invalid chunk size: {:?}", line),
            ParseError::MalformedChunk => write!(f, "chunk data not terminated by CRLF"),
            ParseError::HeadersTooLarge { size, limit } => {
                write!(f, "header section too large: {} > {}", size, limit)
            }
            ParseError::BodyTooLarge { size, limit } => {
                write!(f, "body too large: {} > {}", size, limit)
            }
            ParseError::ParseAfterDone => write!(f, "cannot parse beyond done"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Header(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeaderError> for ParseError {
    fn from(e: HeaderError) -> Self {
        ParseError::Header(e)
    }
}

/// Where the parser is within the request.
///
/// ```text
/// Init -> Headers -+-> Done
///                  +-> Body -> Done
///                  +-> ChunkSize -> ChunkData -> ChunkDataEnd -> ChunkSize ...
///                          |
///                          +-> Trailers -> Done    (zero-size chunk)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Init,
    Headers,
    Body,
    ChunkSize,
    ChunkData { remaining: usize },
    ChunkDataEnd,
    Trailers,
    Done,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseState::Init => f.write_str("request line"),
            ParseState::Headers => f.write_str("headers"),
            ParseState::Body => f.write_str("body"),
            ParseState::ChunkSize => f.write_str("chunk size"),
            ParseState::ChunkData { remaining } => write!(f, "chunk data ({} left)", remaining),
            ParseState::ChunkDataEnd => f.write_str("chunk data end"),
            ParseState::Trailers => f.write_str("trailers"),
            ParseState::Done => f.write_str("done"),
        }
    }
}

/// Incremental request parser.
///
/// Feed it the unconsumed tail of the read buffer; it returns how many bytes
/// it took. Bytes it did not take must be offered again, together with
/// whatever arrives next.
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    line: Option<RequestLine>,
    headers: Headers,
    body: Vec<u8>,
    trailers: Headers,
    head_len: usize,
    limits: Limits,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            state: ParseState::Init,
            line: None,
            headers: Headers::new(),
            body: Vec::new(),
            trailers: Headers::new(),
            head_len: 0,
            limits,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes as much of `data` as the current state allows, moving
    /// through states until the request is done or more input is needed.
    ///
    /// Returns the number of bytes consumed; zero means "read more".
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if self.is_done() {
            return Err(ParseError::ParseAfterDone);
        }

        let mut total = 0;
        while !self.is_done() {
            let before = self.state;
            let consumed = self.parse_single(&data[total..])?;
            total += consumed;
            if consumed == 0 && self.state == before {
                break;
            }
        }

        Ok(total)
    }

    /// The finished request, or `None` while parsing is still in progress.
    pub fn into_request(self) -> Option<Request> {
        if !self.is_done() {
            return None;
        }

        Some(Request {
            line: self.line?,
            headers: self.headers,
            body: self.body,
            trailers: self.trailers,
        })
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParseState::Init => {
                let Some((line, consumed)) = parse_request_line(data)? else {
                    self.check_head_size(data.len())?;
                    return Ok(0);
                };
                self.head_len += consumed;
                self.check_head_size(0)?;

                self.line = Some(line);
                self.state = ParseState::Headers;
                Ok(consumed)
            }

            ParseState::Headers => {
                let (consumed, done) = self.parse_field_section(data, false)?;
                if done {
                    self.state = self.body_state()?;
                }
                Ok(consumed)
            }

            ParseState::Body => {
                let expected = parse_content_length(self.headers.get("content-length"))?;
                self.check_body_size(expected)?;

                let needed = expected.saturating_sub(self.body.len()).min(data.len());
                self.body.extend_from_slice(&data[..needed]);

                if self.body.len() == expected {
                    self.state = ParseState::Done;
                }
                Ok(needed)
            }

            ParseState::ChunkSize => {
                let Some(line_end) = find_crlf(data) else {
                    // A trailing CR may still complete a line of exactly MAX_CHUNK_LINE.
                    if data.len() > MAX_CHUNK_LINE + 1 {
                        return Err(chunk_line_too_long(data));
                    }
                    return Ok(0);
                };
                if line_end > MAX_CHUNK_LINE {
                    return Err(chunk_line_too_long(data));
                }

                let size = parse_chunk_size(&data[..line_end])?;
                if size == 0 {
                    self.state = ParseState::Trailers;
                } else {
                    self.check_body_size(self.body.len().saturating_add(size))?;
                    self.state = ParseState::ChunkData { remaining: size };
                }
                Ok(line_end + CRLF.len())
            }

            ParseState::ChunkData { remaining } => {
                let take = remaining.min(data.len());
                self.body.extend_from_slice(&data[..take]);

                self.state = match remaining - take {
                    0 => ParseState::ChunkDataEnd,
                    left => ParseState::ChunkData { remaining: left },
                };
                Ok(take)
            }

            ParseState::ChunkDataEnd => {
                if data.len() < CRLF.len() {
                    return Ok(0);
                }
                if &data[..CRLF.len()] != CRLF {
                    return Err(ParseError::MalformedChunk);
                }
                self.state = ParseState::ChunkSize;
                Ok(CRLF.len())
            }

            ParseState::Trailers => {
                let (consumed, done) = self.parse_field_section(data, true)?;
                if done {
                    self.state = ParseState::Done;
                }
                Ok(consumed)
            }

            ParseState::Done => Err(ParseError::ParseAfterDone),
        }
    }

    /// Runs the per-field loop over a header or trailer section. Returns the
    /// bytes consumed and whether the terminating blank line was reached.
    fn parse_field_section(
        &mut self,
        data: &[u8],
        trailers: bool,
    ) -> Result<(usize, bool), ParseError> {
        let mut consumed = 0;
        loop {
            let table = if trailers {
                &mut self.trailers
            } else {
                &mut self.headers
            };
            let (n, done) = table.parse_field(&data[consumed..])?;

            if n == 0 && !done {
                self.check_head_size(data.len() - consumed)?;
                return Ok((consumed, false));
            }

            consumed += n;
            self.head_len += n;
            self.check_head_size(0)?;

            if done {
                return Ok((consumed, true));
            }
        }
    }

    /// Chooses how the body is framed once the header section is complete.
    fn body_state(&self) -> Result<ParseState, ParseError> {
        let content_length = self.headers.get("content-length").filter(|v| !v.is_empty());

        if let Some(coding) = self.headers.get("transfer-encoding") {
            if coding != "chunked" {
                return Err(ParseError::UnsupportedTransferEncoding(coding.to_string()));
            }
            if content_length.is_some() {
                return Err(ParseError::AmbiguousFraming);
            }
            return Ok(ParseState::ChunkSize);
        }

        Ok(match content_length {
            Some(_) => ParseState::Body,
            None => ParseState::Done,
        })
    }

    fn check_head_size(&self, pending: usize) -> Result<(), ParseError> {
        let size = self.head_len.saturating_add(pending);
        if size > self.limits.max_header_bytes {
            return Err(ParseError::HeadersTooLarge {
                size,
                limit: self.limits.max_header_bytes,
            });
        }
        Ok(())
    }

    fn check_body_size(&self, size: usize) -> Result<(), ParseError> {
        if size > self.limits.max_body_bytes {
            return Err(ParseError::BodyTooLarge {
                size,
                limit: self.limits.max_body_bytes,
            });
        }
        Ok(())
    }
}

/// Parses `METHOD SP TARGET SP HTTP/1.1 CRLF` from the front of `data`.
///
/// `Ok(None)` means the line is not complete yet.
fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(line_end) = find_crlf(data) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[..line_end])
        .map_err(|_| ParseError::MalformedRequestLine("not valid UTF-8".to_string()))?;

    let parts: Vec<&str> = line.split_ascii_whitespace().collect();
    let &[method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine(format!(
            "expected 3 parts, got {}",
            parts.len()
        )));
    };

    let method = Method::parse(method).ok_or_else(|| ParseError::InvalidMethod(method.to_string()))?;

    let digits = version
        .strip_prefix("HTTP/")
        .ok_or_else(|| ParseError::MalformedRequestLine(format!("bad protocol {:?}", version)))?;
    if digits != HTTP_VERSION_DIGITS {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    let request_line = RequestLine {
        method,
        target: target.to_string(),
        version: digits.to_string(),
    };
    Ok(Some((request_line, line_end + CRLF.len())))
}

/// Validates a `content-length` value: present, non-empty, decimal digits only.
pub(crate) fn parse_content_length(value: Option<&str>) -> Result<usize, ParseError> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingContentLength)?;

    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength(value.to_string()));
    }
    value
        .parse()
        .map_err(|_| ParseError::InvalidContentLength(value.to_string()))
}

fn chunk_line_too_long(data: &[u8]) -> ParseError {
    ParseError::InvalidChunkSize(String::from_utf8_lossy(&data[..MAX_CHUNK_LINE]).into_owned())
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let invalid = || ParseError::InvalidChunkSize(String::from_utf8_lossy(line).into_owned());

    let line = std::str::from_utf8(line).map_err(|_| invalid())?;
    let size = line.split(';').next().unwrap_or(line).trim();

    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    usize::from_str_radix(size, 16).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let mut parser = RequestParser::new();
        let consumed = parser.parse(req).unwrap();

        assert_eq!(consumed, req.len());
        let parsed = parser.into_request().unwrap();
        assert_eq!(parsed.target(), "/");
        assert_eq!(parsed.header("host"), Some("example.com"));
    }

    #[test]
    fn request_line_waits_for_crlf() {
        assert_eq!(parse_request_line(b"GET / HTTP/1.1").unwrap(), None);
        assert_eq!(parse_request_line(b"GET / HTTP/1.1\r").unwrap(), None);
    }

    #[test]
    fn request_line_rejects_wrong_part_count() {
        let err = parse_request_line(b"GET /\r\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine(_)));

        let err = parse_request_line(b"GET / extra HTTP/1.1\r\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine(_)));
    }

    #[test]
    fn chunk_size_ignores_extensions() {
        assert_eq!(parse_chunk_size(b"1a").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"A;name=value").unwrap(), 10);
        assert!(parse_chunk_size(b"").is_err());
        assert!(parse_chunk_size(b"+5").is_err());
        assert!(parse_chunk_size(b"zz").is_err());
    }

    #[test]
    fn content_length_values() {
        assert_eq!(parse_content_length(Some("42")).unwrap(), 42);
        assert_eq!(
            parse_content_length(None).unwrap_err(),
            ParseError::MissingContentLength
        );
        assert!(matches!(
            parse_content_length(Some("-1")).unwrap_err(),
            ParseError::InvalidContentLength(_)
        ));
        assert!(matches!(
            parse_content_length(Some("5, 5")).unwrap_err(),
            ParseError::InvalidContentLength(_)
        ));
    }
}

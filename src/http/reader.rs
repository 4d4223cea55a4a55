//! Reads one complete request off a transport.

use std::fmt;
use std::time::Duration;

use tokio::io::AsyncRead;
use tracing::trace;

use crate::http::buffer::ReadBuffer;
use crate::http::limits::Limits;
use crate::http::parser::{ParseError, ParseState, RequestParser, parse_content_length};
use crate::http::request::Request;
use crate::http::response::StatusCode;

#[derive(Debug)]
pub enum RequestError {
    /// The bytes received are not a valid request.
    Parse(ParseError),
    /// The peer closed the stream before the request was complete.
    Incomplete { state: ParseState, bytes_read: usize },
    /// The body does not match the declared `content-length`.
    BodyLengthMismatch { expected: usize, actual: usize },
    TimedOut(Duration),
    Io(std::io::Error),
}

impl RequestError {
    /// Status of the error response sent back to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Parse(ParseError::HeadersTooLarge { .. }) => {
                StatusCode::RequestHeaderFieldsTooLarge
            }
            RequestError::Parse(ParseError::BodyTooLarge { .. }) => StatusCode::PayloadTooLarge,
            RequestError::TimedOut(_) => StatusCode::RequestTimeout,
            _ => StatusCode::BadRequest,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Parse(e) => write!(f, "unable to parse request: {}", e),
            RequestError::Incomplete { state, bytes_read } => write!(
                f,
                "incomplete request: stream ended in {} state after {} bytes",
                state, bytes_read
            ),
            RequestError::BodyLengthMismatch { expected, actual } => write!(
                f,
                "body length and content-length mismatch: expected {}, got {}",
                expected, actual
            ),
            RequestError::TimedOut(after) => {
                write!(f, "request not received within {:?}", after)
            }
            RequestError::Io(e) => write!(f, "read failed: {}", e),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Parse(e) => Some(e),
            RequestError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for RequestError {
    fn from(e: ParseError) -> Self {
        RequestError::Parse(e)
    }
}

impl From<std::io::Error> for RequestError {
    fn from(e: std::io::Error) -> Self {
        RequestError::Io(e)
    }
}

/// Reads from `reader` until one request is parsed.
///
/// Bytes that arrive after the end of the request stay unread by the parser
/// and are dropped with the buffer.
pub async fn read_request<R>(reader: &mut R, limits: &Limits) -> Result<Request, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = ReadBuffer::new();
    let mut parser = RequestParser::with_limits(limits.clone());

    loop {
        let consumed = parser.parse(buffer.unconsumed())?;
        buffer.consume(consumed);

        if parser.is_done() {
            break;
        }

        let n = buffer.fill_from(reader).await?;
        trace!(bytes = n, state = %parser.state(), buffered = buffer.len(), "read from transport");

        if n == 0 {
            return Err(RequestError::Incomplete {
                state: parser.state(),
                bytes_read: buffer.total_read(),
            });
        }
    }

    let request = parser.into_request().ok_or(RequestError::Incomplete {
        state: ParseState::Done,
        bytes_read: buffer.total_read(),
    })?;

    // Body must be exactly as long as declared.
    if !request.is_chunked() {
        if let Some(declared) = request.header("content-length").filter(|v| !v.is_empty()) {
            let expected = parse_content_length(Some(declared))?;
            if request.body.len() != expected {
                return Err(RequestError::BodyLengthMismatch {
                    expected,
                    actual: request.body.len(),
                });
            }
        }
    }

    Ok(request)
}

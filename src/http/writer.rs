use std::fmt;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::{CRLF, Headers};
use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// How far a response has been written.
///
/// ```text
/// Init -> StatusWritten -> HeadersWritten -+-> BodyWritten          (write_body)
///                                          +-> Chunking -> ... -+
///                                          |                    +-> BodyWritten
///                                          +--------------------+   (terminator / trailers)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Init,
    StatusWritten,
    HeadersWritten,
    /// At least one chunk written, final chunk still pending
    Chunking,
    BodyWritten,
}

impl fmt::Display for WriteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteState::Init => "init",
            WriteState::StatusWritten => "status written",
            WriteState::HeadersWritten => "headers written",
            WriteState::Chunking => "chunking",
            WriteState::BodyWritten => "body written",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum WriteError {
    /// A write was attempted in a state that does not allow it. Nothing was
    /// written.
    OutOfOrder {
        operation: &'static str,
        state: WriteState,
    },
    Io(std::io::Error),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::OutOfOrder { operation, state } => {
                write!(f, "cannot write {} in {} state", operation, state)
            }
            WriteError::Io(e) => write!(f, "write failed: {}", e),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Io(e) => Some(e),
            WriteError::OutOfOrder { .. } => None,
        }
    }
}

impl From<std::io::Error> for WriteError {
    fn from(e: std::io::Error) -> Self {
        WriteError::Io(e)
    }
}

/// Serializes one response onto a transport, in wire order.
///
/// Each section can be written once, in order: status line, headers, then
/// either a fixed body or a sequence of chunks closed by the terminator or
/// by trailers. The state advances as soon as a write is attempted, so a
/// failed write cannot be retried on the same writer.
pub struct ResponseWriter<W> {
    inner: W,
    state: WriteState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            state: WriteState::Init,
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        self.expect("status line", &[WriteState::Init])?;

        let line = format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        );
        self.state = WriteState::StatusWritten;
        self.inner.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Writes every field as `name: value\r\n`, then the blank line.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriteError> {
        self.expect("headers", &[WriteState::StatusWritten])?;

        let mut buf = Vec::new();
        headers.write_section(&mut buf);
        self.state = WriteState::HeadersWritten;
        self.inner.write_all(&buf).await?;
        Ok(())
    }

    /// Writes a fixed-length body. Returns the number of bytes written.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, WriteError> {
        self.expect("body", &[WriteState::HeadersWritten])?;

        self.state = WriteState::BodyWritten;
        self.inner.write_all(body).await?;
        Ok(body.len())
    }

    /// Writes one chunk as `<hex-size>\r\n<data>\r\n`. Returns the data length.
    ///
    /// An empty `data` writes nothing: a zero-size chunk would end the body.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.expect("chunk", &[WriteState::HeadersWritten, WriteState::Chunking])?;

        self.state = WriteState::Chunking;
        if data.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::with_capacity(data.len() + 16);
        buf.extend_from_slice(format!("{:x}", data.len()).as_bytes());
        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(data);
        buf.extend_from_slice(CRLF);
        self.inner.write_all(&buf).await?;
        Ok(data.len())
    }

    /// Ends a chunked body without trailers: `0\r\n\r\n`.
    pub async fn write_chunked_terminator(&mut self) -> Result<(), WriteError> {
        self.expect(
            "chunked terminator",
            &[WriteState::HeadersWritten, WriteState::Chunking],
        )?;

        self.state = WriteState::BodyWritten;
        self.inner.write_all(b"0\r\n\r\n").await?;
        Ok(())
    }

    /// Ends a chunked body with trailer fields: the zero-size chunk, one
    /// `name: value\r\n` line per field, then the blank line.
    ///
    /// Takes the place of [`ResponseWriter::write_chunked_terminator`], whose
    /// blank line would otherwise close the message before the trailers.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), WriteError> {
        self.expect("trailers", &[WriteState::HeadersWritten, WriteState::Chunking])?;

        let mut buf = b"0\r\n".to_vec();
        trailers.write_section(&mut buf);
        self.state = WriteState::BodyWritten;
        self.inner.write_all(&buf).await?;
        Ok(())
    }

    /// Writes status line, headers and body of a buffered response.
    pub async fn write_response(&mut self, response: &Response) -> Result<(), WriteError> {
        self.write_status_line(response.status).await?;
        self.write_headers(&response.headers).await?;
        self.write_body(&response.body).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), WriteError> {
        self.inner.flush().await?;
        Ok(())
    }

    fn expect(&self, operation: &'static str, allowed: &[WriteState]) -> Result<(), WriteError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WriteError::OutOfOrder {
                operation,
                state: self.state,
            })
        }
    }
}

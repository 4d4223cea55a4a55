//! HTTP/1.1 message engine.
//!
//! Requests are parsed incrementally from a byte stream and responses are
//! serialized back onto the same stream, without any HTTP library.
//!
//! # Architecture
//!
//! - **`headers`**: ordered, case-insensitive field table with line-at-a-time parsing
//! - **`request`**: request line and request representation
//! - **`parser`**: the request parsing state machine
//! - **`buffer`**: the growable staging buffer between socket and parser
//! - **`reader`**: reads one complete request off a transport
//! - **`limits`**: size and time caps applied while reading
//! - **`response`**: status codes and buffered responses
//! - **`writer`**: the response writing state machine
//! - **`handler`**: the application callback
//! - **`connection`**: drives one request/response exchange per socket
//!
//! # Connection State Machine
//!
//! Each client connection serves exactly one exchange:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Read and parse one request
//!        └──────┬──────┘
//!               │ Request parsed          Malformed / incomplete
//!               ▼                                   │
//!        ┌──────────────────┐             ┌─────────▼────────┐
//!        │   Responding     │ ── error ─▶ │    Rejecting     │ ← Error response
//!        └──────┬───────────┘  (nothing   └─────────┬────────┘
//!               │              written)             │
//!               ▼                                   ▼
//!        ┌──────────────────────────────────────────────┐
//!        │                    Closed                    │
//!        └──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use courier::http::connection::Connection;
//! use courier::http::limits::Limits;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:42069").await?;
//!     let handler = Arc::new(MyHandler);
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let conn = Connection::new(socket, handler.clone(), Limits::default());
//!         tokio::spawn(async move {
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod buffer;
pub mod connection;
pub mod handler;
pub mod headers;
pub mod limits;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;

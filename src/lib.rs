//! Courier - HTTP/1.1 over raw TCP
//!
//! Core library: request parsing, response writing and the connection
//! server that drives both.

pub mod config;
pub mod http;
pub mod server;

//! TCP listener lifecycle: bind, accept, spawn, close.

pub mod listener;

pub use listener::Server;

//! gzhttpd - single-route static responder
//!
//! Serves one pre-compressed HTML page over HTTP/1.1, one connection at a time.

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod storage;

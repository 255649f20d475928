//! HTTP/1.1 request-line handling for the single-route responder.
//!
//! - **`parser`**: reads the method and path out of a raw byte buffer
//! - **`request`**: the parsed request
//! - **`response`**: response value and builder; `Content-Length` is derived
//! - **`responder`**: route decision and asset loading
//! - **`writer`**: serializes a response into one buffer and writes it out
//! - **`connection`**: per-connection state machine
//!
//! # Connection State Machine
//!
//! One connection is served at a time:
//!
//! ```text
//!        ┌─────────────┐
//!        │    Idle     │ ← listener waits in accept()
//!        └──────┬──────┘
//!               │ accepted
//!               ▼
//!        ┌─────────────┐
//!        │   Reading   │ ← single read, up to 64 KiB
//!        └──────┬──────┘
//!               │ parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← route, load asset, log request
//!        └──────┬───────────┘
//!               │ response ready (or ignored)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← log response, send it
//!        └──────┬───────────┘
//!               ▼
//!        ┌─────────────┐
//!        │   Closed    │ ← every path ends here exactly once
//!        └─────────────┘
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod responder;
pub mod response;
pub mod writer;

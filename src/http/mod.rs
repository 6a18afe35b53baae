//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.1 subset: one request per connection, only
//! the request line is read, and only `GET /` is answered.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Tokenizes the request line out of a raw byte buffer
//! - **`request`**: Parsed request and routing
//! - **`response`**: JSON payload, status codes, and response assembly
//! - **`writer`**: Serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  Accepted   │ ← Read the request line
//!        └──────┬──────┘
//!               │ Bytes received (or EOF / timeout)
//!               ▼
//!        ┌──────────────────┐
//!        │     Parsed       │ ← Route, read the sensor
//!        └──────┬───────────┘
//!               ├─ GET / ──────────► Responding ─┐ 200 or 503 written
//!               └─ anything else ──► Rejected ───┤ nothing written
//!                                                ▼
//!                                             Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tempserve::http::connection::{Connection, ConnectionLimits};
//!
//! let (socket, _addr) = listener.accept().await?;
//! let outcome = Connection::new(socket, &sensor, &clock, ConnectionLimits::default())
//!     .run()
//!     .await?;
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

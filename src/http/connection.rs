use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::clock::Clock;
use crate::http::parser::{has_request_line, parse_request};
use crate::http::request::{ParsedRequest, Route};
use crate::http::response::build_response;
use crate::http::writer::ResponseWriter;
use crate::sensor::{OneWireBus, TemperatureSensor};

const READ_CHUNK_SIZE: usize = 256;

/// Bounds on how much and how long a connection reads before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    pub buffer_size: usize,
    pub read_timeout: Duration,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            read_timeout: Duration::from_secs(5),
        }
    }
}

pub enum ConnectionState {
    Accepted,
    Parsed(ParsedRequest),
    Responding(ResponseWriter),
    Rejected,
    Closed,
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A full response was written
    Served,
    /// Malformed or unsupported request; nothing was written
    Rejected,
    /// Writing the response failed part way
    SendFailed,
}

/// One client connection, from accept to close.
///
/// `run` consumes the connection, so the stream is shut down and dropped
/// exactly once whichever branch is taken.
pub struct Connection<'a, S, B, C> {
    stream: S,
    sensor: &'a TemperatureSensor<B>,
    clock: &'a C,
    limits: ConnectionLimits,
    state: ConnectionState,
}

impl<'a, S, B, C> Connection<'a, S, B, C>
where
    S: AsyncRead + AsyncWrite + Unpin,
    B: OneWireBus,
    C: Clock,
{
    pub fn new(
        stream: S,
        sensor: &'a TemperatureSensor<B>,
        clock: &'a C,
        limits: ConnectionLimits,
    ) -> Self {
        Self {
            stream,
            sensor,
            clock,
            limits,
            state: ConnectionState::Accepted,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<Outcome> {
        let mut outcome = Outcome::Rejected;

        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Accepted => {
                    let buf = self.read_request().await?;
                    self.state = ConnectionState::Parsed(parse_request(&buf));
                }

                ConnectionState::Parsed(request) => {
                    self.state = Self::dispatch(self.sensor, self.clock, request).await?;
                }

                ConnectionState::Responding(mut writer) => {
                    outcome = match writer.write_to_stream(&mut self.stream).await {
                        Ok(()) => Outcome::Served,
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                written = writer.written(),
                                total = writer.len(),
                                "Failed to send response"
                            );
                            Outcome::SendFailed
                        }
                    };
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Rejected => {
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    // Peer may already be gone; dropping the stream closes it regardless.
                    if let Err(e) = self.stream.shutdown().await {
                        tracing::trace!(error = %e, "shutdown after response failed");
                    }
                    break;
                }
            }
        }

        Ok(outcome)
    }

    async fn dispatch(
        sensor: &TemperatureSensor<B>,
        clock: &C,
        request: ParsedRequest,
    ) -> anyhow::Result<ConnectionState> {
        if !request.valid {
            tracing::debug!("Malformed request line, closing without response");
            return Ok(ConnectionState::Rejected);
        }

        match request.route() {
            Route::Temperature => {
                let reading = sensor.read_once().await;
                let now = clock.now();
                match build_response(&request, Some(&reading), &now)? {
                    Some(bytes) => Ok(ConnectionState::Responding(ResponseWriter::new(bytes))),
                    None => Ok(ConnectionState::Rejected),
                }
            }
            Route::Unsupported => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    "Unsupported route, closing without response"
                );
                Ok(ConnectionState::Rejected)
            }
        }
    }

    /// Reads until the request line is complete, the peer stops sending,
    /// the buffer is full, or the read timeout expires.
    async fn read_request(&mut self) -> anyhow::Result<Vec<u8>> {
        let capacity = self.limits.buffer_size;
        let deadline = tokio::time::Instant::now() + self.limits.read_timeout;
        let mut buf = Vec::with_capacity(capacity);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while buf.len() < capacity && !has_request_line(&buf) {
            let want = (capacity - buf.len()).min(READ_CHUNK_SIZE);
            match tokio::time::timeout_at(deadline, self.stream.read(&mut chunk[..want])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    tracing::debug!(received = buf.len(), "Timed out waiting for request line");
                    break;
                }
            }
        }

        Ok(buf)
    }
}

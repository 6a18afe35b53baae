use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::format_timestamp;
use crate::http::request::{ParsedRequest, Route};
use crate::http::writer::serialize_response;
use crate::sensor::SensorReading;

/// Message sent alongside a successful reading
pub const SUCCESS_MESSAGE: &str = "Success";
/// Message sent when no reading could be taken
pub const ERROR_MESSAGE: &str = "Failed to read temperature sensor";

/// HTTP status codes the server answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 503 Service Unavailable
    ServiceUnavailable,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tempserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::ServiceUnavailable.as_u16(), 503);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadStatus {
    Success,
    Error,
}

/// JSON body of every response.
///
/// Field order is the serialization order. `temperature` is present exactly
/// when `status` is `success`; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsePayload {
    status: PayloadStatus,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    message: &'static str,
}

impl ResponsePayload {
    pub fn success(timestamp: String, temperature: f64) -> Self {
        Self {
            status: PayloadStatus::Success,
            timestamp,
            temperature: Some(temperature),
            message: SUCCESS_MESSAGE,
        }
    }

    pub fn error(timestamp: String) -> Self {
        Self {
            status: PayloadStatus::Error,
            timestamp,
            temperature: None,
            message: ERROR_MESSAGE,
        }
    }

    /// Maps a reading onto a payload; a missing or non-finite reading counts
    /// as a failure.
    pub fn from_reading(reading: Option<&SensorReading>, now: &DateTime<Utc>) -> Self {
        let timestamp = format_timestamp(now);
        match reading
            .and_then(SensorReading::raw_value)
            .filter(|celsius| celsius.is_finite())
        {
            Some(celsius) => Self::success(timestamp, celsius),
            None => Self::error(timestamp),
        }
    }

    pub fn status(&self) -> PayloadStatus {
        self.status
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn message(&self) -> &str {
        self.message
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            PayloadStatus::Success => StatusCode::Ok,
            PayloadStatus::Error => StatusCode::ServiceUnavailable,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// A complete HTTP response ready to be sent to a client.
///
/// Headers keep insertion order so the wire output is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in the order they are written
    pub headers: Vec<(String, String)>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Looks up a header by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Wraps a payload in the fixed JSON headers.
    pub fn json(payload: &ResponsePayload) -> serde_json::Result<Self> {
        Ok(ResponseBuilder::new(payload.status_code())
            .header("Content-Type", "application/json")
            .header("Connection", "close")
            .body(payload.to_json()?)
            .build())
    }
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header, replacing an earlier one with the same name in place.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(existing) => existing.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Renders the wire bytes for a request, or `None` when nothing may be sent.
///
/// Unsupported or malformed requests get no response at all. For the
/// temperature route a successful reading yields 200, anything else 503.
pub fn build_response(
    request: &ParsedRequest,
    reading: Option<&SensorReading>,
    now: &DateTime<Utc>,
) -> serde_json::Result<Option<Vec<u8>>> {
    if request.route() != Route::Temperature {
        return Ok(None);
    }

    let payload = ResponsePayload::from_reading(reading, now);
    let response = Response::json(&payload)?;
    Ok(Some(serialize_response(&response)))
}

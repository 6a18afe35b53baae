/// Where a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /`: read the sensor and answer with JSON
    Temperature,
    /// Anything else, including malformed requests: close without answering
    Unsupported,
}

/// The request line of a client request, as far as the server cares.
///
/// Headers and body are never looked at. `valid` is false when the request
/// line did not yield both a method and a path token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Method token, verbatim (e.g. "GET")
    pub method: String,
    /// Path token, verbatim: no percent-decoding, query string kept
    pub path: String,
    pub valid: bool,
}

impl ParsedRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            valid: true,
        }
    }

    /// A request whose line could not be tokenized.
    pub fn malformed() -> Self {
        Self::default()
    }

    /// Exact-match routing against the single supported endpoint.
    pub fn route(&self) -> Route {
        if self.valid && self.method == "GET" && self.path == "/" {
            Route::Temperature
        } else {
            Route::Unsupported
        }
    }
}

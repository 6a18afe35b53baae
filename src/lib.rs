//! tempserve - DS18x20 thermometer over HTTP
//!
//! Answers `GET /` with the current temperature as JSON, one connection at
//! a time, reading the sensor fresh for every request.

pub mod clock;
pub mod config;
pub mod http;
pub mod sensor;
pub mod server;

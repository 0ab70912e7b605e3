//! HTTP session and transport error handling.

mod client;
mod error;

pub use client::HttpClient;
pub use error::RequestError;

//! Outbound HTTP plumbing
//!
//! Script code enqueues requests from the main thread; a worker thread drains
//! the request queue through a [`Transport`] and stages completions on the
//! response queue, which the main thread drains on every logic tick.

mod client;
mod queue;
mod shutdown;
mod worker;

pub use client::{Transport, UreqTransport};
pub use queue::Network;
pub use shutdown::ShutdownSignal;
pub use worker::Worker;

use std::collections::BTreeMap;

pub type RequestId = u64;
pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post { body: String, content_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub id: RequestId,
    pub method: Method,
    /// Scheme and authority, e.g. `https://example.com:8080`
    pub scheme: String,
    pub path: String,
    pub headers: Headers,
}

impl HttpRequest {
    pub fn url(&self) -> String {
        format!("{}{}", self.scheme, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub headers: Headers,
}

/// Outcome of a queued request; `response` is `None` when no HTTP exchange took place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub id: RequestId,
    pub response: Option<HttpResponse>,
}

impl Completion {
    pub fn success(&self) -> bool {
        self.response.is_some()
    }
}

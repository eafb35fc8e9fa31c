use std::time::Duration;

use tracing::debug;

use super::{Headers, HttpRequest, HttpResponse, Method};

/// Performs one HTTP exchange; failures are reported as `None`
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Option<HttpResponse>;
}

/// Blocking transport backed by a `ureq` agent
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(connect_timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = config.into();
        Self { agent }
    }

    fn call(&self, request: &HttpRequest) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let url = request.url();
        let headers = normalized_headers(&request.headers);
        match &request.method {
            Method::Get => {
                let mut builder = self.agent.get(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            Method::Post { body, content_type } => {
                let mut builder = self.agent.post(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder
                    .header("Content-Type", content_type.as_str())
                    .send(body.as_str())
            }
        }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let mut response = match self.call(request) {
            Ok(response) => response,
            Err(e) => {
                debug!("Request {} to {} failed: {}", request.id, request.url(), e);
                return None;
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = match response.body_mut().read_to_string() {
            Ok(body) => body,
            Err(e) => {
                debug!("Reading body of request {} failed: {}", request.id, e);
                return None;
            }
        };

        Some(HttpResponse {
            status,
            body,
            headers,
        })
    }
}

/// Caller headers with any `Connection` header replaced by `Connection: close`
pub(crate) fn normalized_headers(headers: &Headers) -> Headers {
    let mut normalized: Headers = headers
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("connection"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    normalized.insert("Connection".to_string(), "close".to_string());
    normalized
}

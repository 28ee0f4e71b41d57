//! Transports and the default blocking session.
//!
//! # Design
//! `Transport` is the only seam between an eater and the network. Anything
//! that can turn an `HttpRequest` into an `HttpResponse` qualifies; failures
//! must be reported as either a timeout or something else, since that is the
//! distinction `HttpEater` surfaces to its callers.
//!
//! `Session` is the stock implementation over a `ureq::Agent`. The agent
//! pools connections, so one session is meant to be shared (behind an
//! `Arc`) by every eater talking to the same service.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use thiserror::Error;
use tracing::{debug, warn};
use ureq::typestate::{WithBody, WithoutBody};
use ureq::ResponseExt;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Failure reported by a `Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        TransportError::Other(Box::new(err))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Executes HTTP requests on behalf of an eater.
///
/// Responses with any status code, including 4xx and 5xx, are returned as
/// `Ok`; interpreting them is the eater's job.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Largest response body a `Session` reads unless configured otherwise.
pub const DEFAULT_BODY_LIMIT: u64 = 64 * 1024 * 1024;

/// Credentials and defaults applied to every request a `Session` sends.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub auth: Option<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Maximum body size in bytes; `DEFAULT_BODY_LIMIT` when unset.
    pub body_limit: Option<u64>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP Basic credentials.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = Some(bytes);
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("auth", &self.auth.as_ref().map(|(user, _)| (user, "<redacted>")))
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

/// Blocking HTTP session backed by `ureq`.
#[derive(Clone)]
pub struct Session {
    agent: ureq::Agent,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self { agent, config }
    }

    pub fn auth(&self) -> Option<(&str, &str)> {
        self.config
            .auth
            .as_ref()
            .map(|(user, pass)| (user.as_str(), pass.as_str()))
    }

    /// Default headers sent with every request.
    pub fn headers(&self) -> &[(String, String)] {
        &self.config.headers
    }

    /// Case-insensitive lookup of a default header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.config
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Session defaults overlaid with the request's own headers. A request
    /// header replaces a default of the same name.
    fn merged_headers(&self, request: &HttpRequest) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.config.headers.len() + request.headers.len() + 1);
        if let Some((user, pass)) = &self.config.auth {
            let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            headers.push(("authorization".to_string(), format!("Basic {token}")));
        }
        for (name, value) in self.config.headers.iter().chain(request.headers.iter()) {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }

    fn decorate<B>(&self, mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
        for (name, value) in self.merged_headers(request) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (key, value) in &request.query {
            builder = builder.query(key, value);
        }
        builder
    }

    fn dispatch(&self, request: &HttpRequest) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let url = request.url.as_str();
        match request.method {
            HttpMethod::Get => call_or_send(self.decorate(self.agent.get(url), request), request),
            HttpMethod::Delete => call_or_send(self.decorate(self.agent.delete(url), request), request),
            HttpMethod::Head => call_or_send(self.decorate(self.agent.head(url), request), request),
            HttpMethod::Post => send_body(self.decorate(self.agent.post(url), request), request),
            HttpMethod::Put => send_body(self.decorate(self.agent.put(url), request), request),
            HttpMethod::Patch => send_body(self.decorate(self.agent.patch(url), request), request),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// GET, DELETE and HEAD still carry the request model when there is one.
fn call_or_send(
    builder: ureq::RequestBuilder<WithoutBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match &request.body {
        Some(_) => send_body(builder.force_send_body(), request),
        None => builder.call(),
    }
}

fn send_body(
    builder: ureq::RequestBuilder<WithBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match &request.body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(timeout) => TransportError::Timeout(format!("{timeout:?}")),
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            TransportError::Timeout(io.to_string())
        }
        other => TransportError::other(other),
    }
}

impl Transport for Session {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let mut response = self.dispatch(request).map_err(classify)?;

        let status = response.status();
        let url = response.get_uri().to_string();
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
        let body = if request.method == HttpMethod::Head {
            Vec::new()
        } else {
            let limit = self.config.body_limit.unwrap_or(DEFAULT_BODY_LIMIT);
            match response.body_mut().with_config().limit(limit).read_to_vec() {
                Ok(body) => body,
                // The status line already says what went wrong.
                Err(err) if status.as_u16() >= 400 => {
                    warn!(status = status.as_u16(), error = %err, "error response body unreadable");
                    Vec::new()
                }
                Err(err) => return Err(classify(err)),
            }
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            url,
            headers,
            body,
        })
    }
}

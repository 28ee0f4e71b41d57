//! Declarative HTTP API clients.
//!
//! # Design
//! An `Eater` describes one API endpoint: its request model, its response
//! model, a URL template and an HTTP method. The trait's provided methods are
//! the extension points (URL formatting, request options, content handling,
//! session creation); an eater overrides only the ones it needs.
//!
//! `HttpEater` is one configured call of an eater. Construction resolves the
//! request model and the URL once, so both are fixed for the lifetime of the
//! value. Invoking it sends the request through its `Transport` and turns the
//! outcome into either a validated response model or an `EaterError`. Calls
//! never mutate the client, so the same `HttpEater` can be called again and
//! each call is classified on its own.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::content::ContentRegistry;
use crate::error::{DataError, EaterError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::model::{Model, RequestSource};
use crate::session::{Session, SessionConfig, Transport, TransportError};
use crate::url::UrlTemplate;

/// Definition of a typed HTTP JSON endpoint.
///
/// `Response` and `URL` have no defaults, so an eater that forgets either
/// does not compile. Eaters that send no payload use
/// [`NoRequest`](crate::model::NoRequest) as their `Request`.
pub trait Eater: Sized {
    type Request: Model;
    type Response: Model;

    /// URL template, see [`UrlTemplate`].
    const URL: &'static str;

    const METHOD: HttpMethod = HttpMethod::Get;

    /// Name used in error messages.
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    /// Resolve the URL for `request_model`. Called once, at construction.
    fn format_url(&self, request_model: Option<&Self::Request>) -> Result<String, EaterError> {
        let primitive = request_model.map(|model| model.to_primitive()).transpose()?;
        UrlTemplate::parse(Self::URL)?.render(primitive.as_ref())
    }

    /// Options for one call. The default sends the request model as a JSON
    /// body and passes the call's overrides through untouched.
    fn request_options(
        &self,
        request_model: Option<&Self::Request>,
        call: CallOptions,
    ) -> Result<RequestOptions, EaterError> {
        let json = request_model.map(|model| model.to_primitive()).transpose()?;
        Ok(RequestOptions {
            method: call.method,
            url: call.url,
            session: call.session,
            headers: call.headers,
            query: call.query,
            json,
        })
    }

    /// Content types this eater can turn into a `Response`.
    fn content_handlers(&self) -> ContentRegistry<Self::Response> {
        ContentRegistry::json()
    }

    /// Turn a raw response into the response model.
    fn create_response_model(
        &self,
        response: &HttpResponse,
        _request_model: Option<&Self::Request>,
    ) -> Result<Self::Response, EaterError> {
        if response.is_error() {
            return Err(EaterError::Unexpected {
                status: response.status,
                reason: response.reason.clone(),
                url: response.url.clone(),
            });
        }
        self.content_handlers().parse(response, &self.name())
    }

    /// Build the session used when none is injected.
    fn create_session(&self, config: &SessionConfig) -> Result<Arc<dyn Transport>, EaterError> {
        Ok(Arc::new(Session::new(config.clone())))
    }
}

/// Construction options for `HttpEater`.
#[derive(Clone, Default)]
pub struct EaterOptions {
    /// Reused as is when set; `config` is then ignored.
    pub session: Option<Arc<dyn Transport>>,
    pub config: SessionConfig,
}

impl EaterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(mut self, session: Arc<dyn Transport>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config = self.config.auth(username, password);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.header(name, value);
        self
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }
}

impl fmt::Debug for EaterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EaterOptions")
            .field("session", &self.session.as_ref().map(|_| "<injected>"))
            .field("config", &self.config)
            .finish()
    }
}

/// Per-call overrides and extra transport options.
#[derive(Clone, Default)]
pub struct CallOptions {
    pub method: Option<HttpMethod>,
    pub url: Option<String>,
    pub session: Option<Arc<dyn Transport>>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn session(mut self, session: Arc<dyn Transport>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Fully resolved options for one call, produced by
/// [`Eater::request_options`]. `None` overrides fall back to the client's
/// own method, URL and session.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub url: Option<String>,
    pub session: Option<Arc<dyn Transport>>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
}

/// A configured, callable eater.
#[derive(Clone)]
pub struct HttpEater<E: Eater> {
    eater: E,
    request_model: Option<E::Request>,
    url: String,
    method: HttpMethod,
    session: Arc<dyn Transport>,
}

impl<E: Eater> HttpEater<E> {
    /// Build the request model from `source`, resolve the URL and pick the
    /// session. Validation errors from the request model come back as
    /// `EaterError::Data`.
    pub fn new(eater: E, source: RequestSource<E::Request>, options: EaterOptions) -> Result<Self, EaterError> {
        let request_model = source.into_model()?;
        let url = eater.format_url(request_model.as_ref())?;
        let session = match options.session {
            Some(session) => session,
            None => eater.create_session(&options.config)?,
        };
        debug!(eater = %eater.name(), %url, "eater ready");

        Ok(Self {
            eater,
            request_model,
            url,
            method: E::METHOD,
            session,
        })
    }

    /// Use a pre-built request model.
    pub fn from_model(eater: E, request_model: E::Request) -> Result<Self, EaterError> {
        Self::new(eater, RequestSource::Model(request_model), EaterOptions::default())
    }

    /// Build the request model from a JSON object of field values.
    pub fn from_fields(eater: E, fields: Value) -> Result<Self, EaterError> {
        match fields {
            Value::Object(map) => Self::new(eater, RequestSource::Fields(map), EaterOptions::default()),
            other => Err(DataError::field("", format!("request fields must be a JSON object, got {other}")).into()),
        }
    }

    /// No fields at all. Eaters with a request schema still build a model,
    /// from an empty set of fields.
    pub fn without_request(eater: E) -> Result<Self, EaterError> {
        Self::new(eater, RequestSource::Empty, EaterOptions::default())
    }

    pub fn eater(&self) -> &E {
        &self.eater
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn request_model(&self) -> Option<&E::Request> {
        self.request_model.as_ref()
    }

    pub fn session(&self) -> &Arc<dyn Transport> {
        &self.session
    }

    /// Perform the request.
    pub fn call(&self) -> Result<E::Response, EaterError> {
        self.call_with(CallOptions::default())
    }

    /// Perform the request with per-call overrides.
    #[tracing::instrument(skip_all, fields(eater = %self.eater.name()))]
    pub fn call_with(&self, call: CallOptions) -> Result<E::Response, EaterError> {
        let options = self.eater.request_options(self.request_model.as_ref(), call)?;
        let method = options.method.unwrap_or(self.method);
        let url = options.url.unwrap_or_else(|| self.url.clone());
        let session = options.session.unwrap_or_else(|| Arc::clone(&self.session));

        let mut request = HttpRequest::new(method, url);
        request.headers = options.headers;
        request.query = options.query;
        if let Some(json) = options.json {
            let body = serde_json::to_string(&json).map_err(|e| EaterError::Request(e.to_string()))?;
            if request.header("content-type").is_none() {
                request
                    .headers
                    .push(("content-type".to_string(), "application/json".to_string()));
            }
            request.body = Some(body);
        }

        debug!(method = method.as_str(), url = %request.url, "calling");
        match session.send(&request) {
            Ok(response) => {
                debug!(status = response.status, "response received");
                self.eater
                    .create_response_model(&response, self.request_model.as_ref())
            }
            Err(TransportError::Timeout(detail)) => {
                warn!(url = %request.url, %detail, "request timed out");
                Err(EaterError::Timeout {
                    eater: self.eater.name(),
                    method,
                    url: request.url,
                })
            }
            Err(source) => {
                warn!(url = %request.url, error = %source, "transport failure");
                Err(EaterError::Connect {
                    url: request.url,
                    source,
                })
            }
        }
    }
}

impl<E: Eater> fmt::Debug for HttpEater<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEater")
            .field("eater", &self.eater.name())
            .field("method", &self.method)
            .field("url", &self.url)
            .field("request_model", &self.request_model)
            .finish_non_exhaustive()
    }
}

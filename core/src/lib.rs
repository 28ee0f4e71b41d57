//! Typed HTTP JSON API clients.
//!
//! # Overview
//! Declare an endpoint once as an [`Eater`]: the request model it sends, the
//! response model it expects, a URL template and an HTTP method. Wrapping it
//! in an [`HttpEater`] builds the request, resolves the URL, and gives back a
//! value whose `call` performs the request and returns a validated response
//! model or a typed [`EaterError`].
//!
//! ```no_run
//! use eater::{Eater, HttpEater, Model};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Person {
//!     name: String,
//! }
//!
//! impl Model for Person {}
//!
//! struct GetPerson;
//!
//! impl Eater for GetPerson {
//!     type Request = Person;
//!     type Response = Person;
//!     const URL: &'static str = "http://example.com/person/{request_model.name}/";
//! }
//!
//! let api = HttpEater::from_fields(GetPerson, serde_json::json!({"name": "John"}))?;
//! assert_eq!(api.url(), "http://example.com/person/John/");
//! let person = api.call()?;
//! # Ok::<(), eater::EaterError>(())
//! ```
//!
//! # Design
//! - Network I/O sits behind the [`Transport`] trait; [`Session`] is the
//!   blocking `ureq` implementation and can be shared across eaters.
//! - Timeouts, other transport failures and HTTP errors map to distinct
//!   [`EaterError`] variants. Validation failures stay [`DataError`]s.
//! - Response bodies are parsed through a [`ContentRegistry`] keyed by
//!   content type. JSON is registered by default.

pub mod client;
pub mod content;
pub mod error;
pub mod http;
pub mod model;
pub mod session;
pub mod url;

pub use client::{CallOptions, Eater, EaterOptions, HttpEater, RequestOptions};
pub use content::{ContentParser, ContentRegistry, APPLICATION_JSON};
pub use error::{DataError, EaterError, FieldError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use model::{Model, NoRequest, RequestSource};
pub use session::{Session, SessionConfig, Transport, TransportError};
pub use url::UrlTemplate;

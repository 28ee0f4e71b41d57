//! Content-type dispatch for response bodies.
//!
//! # Design
//! Each response content type maps to a parser that turns the raw
//! `HttpResponse` into the eater's response model. The stock registry only
//! knows `application/json`; eaters that talk to other formats register
//! their own parser instead of rewriting the whole response path.

use std::collections::HashMap;
use std::fmt;

use crate::error::EaterError;
use crate::http::HttpResponse;
use crate::model::Model;

pub const APPLICATION_JSON: &str = "application/json";

/// Parser for one content type.
pub type ContentParser<R> = fn(&HttpResponse) -> Result<R, EaterError>;

/// Content types an eater knows how to turn into its response model.
pub struct ContentRegistry<R> {
    parsers: HashMap<String, ContentParser<R>>,
}

impl<R> ContentRegistry<R> {
    /// A registry that accepts nothing.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Add or replace the parser for `content_type`.
    pub fn register(mut self, content_type: &str, parser: ContentParser<R>) -> Self {
        self.parsers.insert(essence(content_type), parser);
        self
    }

    pub fn supports(&self, content_type: &str) -> bool {
        self.parsers.contains_key(&essence(content_type))
    }

    /// Parse `response` with the parser registered for its content type.
    /// `eater` names the caller in the error when none is registered.
    pub fn parse(&self, response: &HttpResponse, eater: &str) -> Result<R, EaterError> {
        let content_type = response.content_type().unwrap_or_default();
        match self.parsers.get(&essence(content_type)) {
            Some(parser) => parser(response),
            None => Err(EaterError::NotImplemented {
                content_type: content_type.to_string(),
                eater: eater.to_string(),
            }),
        }
    }
}

impl<R: Model> ContentRegistry<R> {
    /// The default registry: JSON only.
    pub fn json() -> Self {
        Self::empty().register(APPLICATION_JSON, parse_json::<R>)
    }
}

impl<R> fmt::Debug for ContentRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ContentRegistry").field("types", &types).finish()
    }
}

/// Decode a JSON body and build a validated model from it.
pub fn parse_json<R: Model>(response: &HttpResponse) -> Result<R, EaterError> {
    let raw = response.json().map_err(|e| EaterError::UnexpectedResponse {
        url: response.url.clone(),
        message: format!("body is not valid JSON: {e}"),
    })?;
    Ok(R::from_raw(raw, true)?)
}

/// `"Application/JSON; charset=utf-8"` -> `"application/json"`.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        text: String,
    }

    impl Model for Greeting {
        fn validate(&self) -> Result<(), DataError> {
            if self.text.is_empty() {
                return Err(DataError::field("text", "required"));
            }
            Ok(())
        }
    }

    fn response(content_type: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            reason: "OK".to_string(),
            url: "http://example.com/".to_string(),
            headers: content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn parse_text(response: &HttpResponse) -> Result<Greeting, EaterError> {
        Ok(Greeting {
            text: response.text().into_owned(),
        })
    }

    #[test]
    fn json_is_parsed_and_validated() {
        let registry = ContentRegistry::<Greeting>::json();
        let greeting = registry
            .parse(&response(Some("application/json"), r#"{"text":"hi"}"#), "Hello")
            .unwrap();
        assert_eq!(greeting.text, "hi");

        let err = registry
            .parse(&response(Some("application/json"), r#"{"text":""}"#), "Hello")
            .unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn charset_parameter_is_ignored() {
        let registry = ContentRegistry::<Greeting>::json();
        assert!(registry.supports("application/json; charset=utf-8"));
        assert!(registry.supports("Application/JSON"));
    }

    #[test]
    fn unregistered_type_is_not_implemented() {
        let registry = ContentRegistry::<Greeting>::json();
        let err = registry
            .parse(&response(Some("text/plain"), "Hello world"), "Hello")
            .unwrap_err();
        match err {
            EaterError::NotImplemented { content_type, eater } => {
                assert_eq!(content_type, "text/plain");
                assert_eq!(eater, "Hello");
            }
            other => panic!("expected NotImplemented, got {other:?}"),
        }
    }

    #[test]
    fn missing_content_type_is_not_implemented() {
        let registry = ContentRegistry::<Greeting>::json();
        let err = registry.parse(&response(None, "{}"), "Hello").unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn binary_body_with_unregistered_type_is_not_implemented() {
        let registry = ContentRegistry::<Greeting>::json();
        let mut resp = response(Some("application/octet-stream"), "");
        resp.body = vec![0xff, 0xfe, 0x00, 0x81];
        let err = registry.parse(&resp, "Hello").unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn invalid_json_is_an_unexpected_response() {
        let registry = ContentRegistry::<Greeting>::json();
        let err = registry
            .parse(&response(Some("application/json"), "not json"), "Hello")
            .unwrap_err();
        assert!(matches!(err, EaterError::UnexpectedResponse { .. }));
    }

    #[test]
    fn custom_parsers_can_be_registered() {
        let registry = ContentRegistry::<Greeting>::json().register("text/plain", parse_text);
        let greeting = registry
            .parse(&response(Some("text/plain"), "Hello world"), "Hello")
            .unwrap();
        assert_eq!(greeting.text, "Hello world");
    }
}

//! URL templates resolved against the request model.
//!
//! A template is a URL with `{request_model.field}` placeholders. Nested
//! fields use further dots (`{request_model.owner.name}`). Literal braces
//! are written `{{` and `}}`.

use serde_json::Value;

use crate::error::EaterError;

const BINDING: &str = "request_model";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Vec<String>),
}

/// A parsed URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, EaterError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(template_error(template, "unbalanced '{'")),
                            Some(c) => name.push(c),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(parse_placeholder(template, name.trim())?));
                }
                '}' => return Err(template_error(template, "single '}' encountered")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether any placeholder refers to the request model.
    pub fn has_placeholders(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Field(_)))
    }

    /// Substitute the request model's fields. `request_model` is the
    /// model's primitive JSON form, or `None` when the eater has no request.
    pub fn render(&self, request_model: Option<&Value>) -> Result<String, EaterError> {
        let mut url = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Field(path) => {
                    let model = request_model.ok_or_else(|| {
                        template_error(&self.source, "template refers to request_model but there is no request")
                    })?;
                    let value = lookup(model, path).ok_or_else(|| {
                        template_error(&self.source, &format!("request_model has no field '{}'", path.join(".")))
                    })?;
                    url.push_str(&scalar(&self.source, path, value)?);
                }
            }
        }
        Ok(url)
    }
}

fn parse_placeholder(template: &str, name: &str) -> Result<Vec<String>, EaterError> {
    let mut parts = name.split('.');
    if parts.next() != Some(BINDING) {
        return Err(template_error(
            template,
            &format!("placeholder '{{{name}}}' must start with '{BINDING}.'"),
        ));
    }
    let path: Vec<String> = parts.map(str::to_string).collect();
    if path.is_empty() || path.iter().any(String::is_empty) {
        return Err(template_error(template, &format!("placeholder '{{{name}}}' names no field")));
    }
    Ok(path)
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key.as_str()))
}

fn scalar(template: &str, path: &[String], value: &Value) -> Result<String, EaterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(template_error(
            template,
            &format!("field '{}' is not a scalar", path.join(".")),
        )),
    }
}

fn template_error(template: &str, message: &str) -> EaterError {
    EaterError::Template {
        template: template.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_request_model_fields() {
        let template = UrlTemplate::parse("http://example.com/person/{request_model.name}/").unwrap();
        let url = template.render(Some(&json!({"name": "John"}))).unwrap();
        assert_eq!(url, "http://example.com/person/John/");
    }

    #[test]
    fn numbers_render_without_quotes() {
        let template = UrlTemplate::parse("http://example.com/person/{request_model.pk}/").unwrap();
        assert_eq!(
            template.render(Some(&json!({"pk": 1, "name": "John"}))).unwrap(),
            "http://example.com/person/1/"
        );
    }

    #[test]
    fn nested_fields_follow_dots() {
        let template = UrlTemplate::parse("/repos/{request_model.owner.login}/{request_model.repo}").unwrap();
        let url = template
            .render(Some(&json!({"owner": {"login": "alex"}, "repo": "eater"})))
            .unwrap();
        assert_eq!(url, "/repos/alex/eater");
    }

    #[test]
    fn plain_url_renders_without_request() {
        let template = UrlTemplate::parse("http://example.com").unwrap();
        assert!(!template.has_placeholders());
        assert_eq!(template.render(None).unwrap(), "http://example.com");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let template = UrlTemplate::parse("http://example.com/{{raw}}").unwrap();
        assert_eq!(template.render(None).unwrap(), "http://example.com/{raw}");
    }

    #[test]
    fn source_text_is_kept() {
        let source = "http://example.com/{{raw}}/{request_model.name}";
        assert_eq!(UrlTemplate::parse(source).unwrap().as_str(), source);
    }

    #[test]
    fn placeholder_without_request_is_an_error() {
        let template = UrlTemplate::parse("http://example.com/{request_model.name}").unwrap();
        assert!(matches!(template.render(None), Err(EaterError::Template { .. })));
    }

    #[test]
    fn unknown_field_is_an_error() {
        let template = UrlTemplate::parse("http://example.com/{request_model.age}").unwrap();
        let err = template.render(Some(&json!({"name": "John"}))).unwrap_err();
        assert!(err.to_string().contains("no field 'age'"));
    }

    #[test]
    fn non_scalar_fields_are_rejected() {
        let template = UrlTemplate::parse("/{request_model.owner}").unwrap();
        assert!(template.render(Some(&json!({"owner": {"login": "alex"}}))).is_err());
        assert!(template.render(Some(&json!({"owner": null}))).is_err());
    }

    #[test]
    fn malformed_templates_fail_to_parse() {
        assert!(UrlTemplate::parse("http://example.com/{request_model.name").is_err());
        assert!(UrlTemplate::parse("http://example.com/}").is_err());
        assert!(UrlTemplate::parse("http://example.com/{name}").is_err());
        assert!(UrlTemplate::parse("http://example.com/{request_model}").is_err());
    }
}

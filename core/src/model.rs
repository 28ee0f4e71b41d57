//! Request and response models.
//!
//! # Design
//! A model is any serde type. Building one from raw JSON first runs serde's
//! type conversion, then, when asked, the model's own `validate` hook for
//! constraints serde cannot express (lengths, ranges). Both failure kinds
//! surface as `DataError` so callers see a single validation type.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DataError;

/// A typed request or response shape.
pub trait Model: Serialize + DeserializeOwned + Clone + Debug {
    /// `false` only for `NoRequest`, the marker for eaters without a
    /// request schema.
    const DECLARED: bool = true;

    /// Constraint checks run after conversion.
    fn validate(&self) -> Result<(), DataError> {
        Ok(())
    }

    /// Convert raw JSON into the model, validating it when `validate` is
    /// set.
    fn from_raw(raw: Value, validate: bool) -> Result<Self, DataError> {
        let model: Self = serde_json::from_value(raw)?;
        if validate {
            model.validate()?;
        }
        Ok(model)
    }

    /// Serialize back to plain JSON values.
    fn to_primitive(&self) -> Result<Value, DataError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Request schema for eaters that send no payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoRequest;

impl Model for NoRequest {
    const DECLARED: bool = false;
}

/// Where a client's request instance comes from.
#[derive(Debug, Clone)]
pub enum RequestSource<R> {
    /// A pre-built instance, used as is.
    Model(R),
    /// Raw field values converted through the request schema.
    Fields(Map<String, Value>),
    /// No fields at all; equivalent to an empty `Fields` map.
    Empty,
}

impl<R: Model> RequestSource<R> {
    /// Resolve to a request instance. Eaters without a request schema
    /// always get `None`.
    pub fn into_model(self) -> Result<Option<R>, DataError> {
        if !R::DECLARED {
            return Ok(None);
        }
        match self {
            RequestSource::Model(model) => Ok(Some(model)),
            RequestSource::Fields(fields) => R::from_raw(Value::Object(fields), false).map(Some),
            RequestSource::Empty => R::from_raw(Value::Object(Map::new()), false).map(Some),
        }
    }
}

impl<R> From<Map<String, Value>> for RequestSource<R> {
    fn from(fields: Map<String, Value>) -> Self {
        RequestSource::Fields(fields)
    }
}

/// Validation helper: record an error unless `value` has at least `min`
/// characters.
pub fn min_length(errors: &mut DataError, field: &str, value: &str, min: usize) {
    if value.chars().count() < min {
        errors.push(
            field,
            format!("String value is too short. Expected at least {min} characters."),
        );
    }
}

/// Validation helper: record an error unless `value` has at most `max`
/// characters.
pub fn max_length(errors: &mut DataError, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(
            field,
            format!("String value is too long. Expected at most {max} characters."),
        );
    }
}

//! Filling field values by name.
//!
//! Values are written to `/V` of every top-level field whose name matches.
//! Button fields take a name value and get `/AS` set to the same state so
//! viewers show the new state without regenerating appearances. Other
//! fields only get `/V`; the AcroForm's `/NeedAppearances` is set so a
//! viewer rebuilds their appearance streams.
//!
//! See ISO 32000-1:2008, Section 12.7.4 - Field Types.

use super::acroform_mut;
use super::scraper::{scrape_fields, FieldAnomaly, FieldType};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{decode_text_string, Object};
use indexmap::IndexMap;
use serde::Serialize;

/// Result of [`fill_fields`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillOutcome {
    /// Names that received a value, in `/Fields` order
    pub filled: Vec<String>,
    /// Requested names that matched no field
    pub missing: Vec<String>,
    /// `/Fields` entries skipped while looking up names
    pub anomalies: Vec<FieldAnomaly>,
}

/// Set `/V` on every field named in `values`.
///
/// A name that occurs on several fields fills all of them.
pub fn fill_fields(doc: &mut Document, values: &IndexMap<String, Object>) -> Result<FillOutcome> {
    let scraped = scrape_fields(doc)?;
    let mut outcome = FillOutcome {
        anomalies: scraped.anomalies,
        ..FillOutcome::default()
    };

    for field in &scraped.fields {
        let value = match values.get(&field.name) {
            Some(value) => value,
            None => continue,
        };
        let dict = match doc.resolve_mut(field.handle)? {
            Object::Dictionary(dict) => dict,
            _ => continue,
        };
        match (&field.field_type, value) {
            (Some(FieldType::Button), Object::String(state)) => {
                let state = Object::Name(decode_text_string(state));
                dict.insert("V", state.clone());
                dict.insert("AS", state);
            },
            (Some(FieldType::Button), Object::Name(_)) => {
                dict.insert("V", value.clone());
                dict.insert("AS", value.clone());
            },
            _ => {
                dict.insert("V", value.clone());
            },
        }
        outcome.filled.push(field.name.clone());
    }

    outcome.missing = values
        .keys()
        .filter(|name| !outcome.filled.contains(*name))
        .cloned()
        .collect();

    if !outcome.filled.is_empty() {
        if let Some(acroform) = acroform_mut(doc)? {
            acroform.insert("NeedAppearances", Object::Boolean(true));
        }
    }
    for name in &outcome.missing {
        log::warn!("Document {}: no field named '{}'", doc.id(), name);
    }
    log::info!("Document {}: filled {} fields", doc.id(), outcome.filled.len());
    Ok(outcome)
}

/// Convert a JSON value to a field value.
///
/// Strings become text strings, numbers become integers or reals, `null`
/// becomes a null object and arrays are converted element-wise. JSON
/// objects have no field-value form and yield `None`.
pub fn value_from_json(value: &serde_json::Value) -> Option<Object> {
    use serde_json::Value;

    match value {
        Value::Null => Some(Object::Null),
        Value::Bool(b) => Some(Object::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(Object::Integer)
            .or_else(|| n.as_f64().map(Object::Real)),
        Value::String(s) => Some(Object::text(s)),
        Value::Array(items) => items.iter().map(value_from_json).collect::<Option<Vec<_>>>().map(Object::Array),
        Value::Object(_) => None,
    }
}

/// Convert a JSON object of `name: value` pairs.
pub fn values_from_json(context: &serde_json::Value) -> Result<IndexMap<String, Object>> {
    let entries = context
        .as_object()
        .ok_or_else(|| Error::InvalidContext("expected a JSON object of field values".to_string()))?;
    entries
        .iter()
        .map(|(name, value)| {
            value_from_json(value)
                .map(|object| (name.clone(), object))
                .ok_or_else(|| Error::InvalidContext(format!("value for '{}' is a JSON object", name)))
        })
        .collect()
}

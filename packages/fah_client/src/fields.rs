//! Field-by-field materialization of typed messages from a payload tree.
//!
//! Each typed message declares its fields once, in its `FromFields` impl, by
//! naming the converter for every field. Errors carry the dotted path of the
//! failing field and the raw value.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::net::IpAddr;

use crate::convert::{self, SlotStatus};
use crate::error::{FormatError, MaterializeError};

/// A structured value that can be read from an object node.
pub trait FromFields: Sized {
    fn from_fields(fields: &Fields<'_>) -> Result<Self, MaterializeError>;
}

/// Read-only view of one object node plus its path from the message root.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    /// View `value` as an object located at `path`.
    pub fn at(value: &'a Value, path: impl Into<String>) -> Result<Self, MaterializeError> {
        let path = path.into();
        match value {
            Value::Object(map) => Ok(Self { map, path }),
            other => Err(MaterializeError {
                field: if path.is_empty() { "<root>".into() } else { path },
                raw: other.to_string(),
                source: convert::unexpected("object", other),
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Present and not `null`.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    /// Field names present in this node.
    pub fn names(&self) -> impl Iterator<Item = &'a str> {
        self.map.keys().map(String::as_str)
    }

    pub fn field_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    fn fail(&self, name: &str, raw: &Value, source: FormatError) -> MaterializeError {
        MaterializeError {
            field: self.field_path(name),
            raw: raw.to_string(),
            source,
        }
    }

    fn convert<T>(
        &self,
        name: &str,
        f: impl FnOnce(&'a Value) -> Result<T, FormatError>,
    ) -> Result<Option<T>, MaterializeError> {
        self.get(name)
            .map(|raw| f(raw).map_err(|e| self.fail(name, raw, e)))
            .transpose()
    }

    fn text<'v>(raw: &'v Value) -> Result<&'v str, FormatError> {
        raw.as_str().ok_or_else(|| convert::unexpected("string", raw))
    }

    /// Strings pass through; numbers and bools are rendered. Missing is `""`.
    pub fn string(&self, name: &str) -> Result<String, MaterializeError> {
        self.convert(name, |raw| match raw {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(convert::unexpected("string", other)),
        })
        .map(Option::unwrap_or_default)
    }

    pub fn integer(&self, name: &str) -> Result<i64, MaterializeError> {
        self.convert(name, convert::integer)
            .map(Option::unwrap_or_default)
    }

    pub fn float(&self, name: &str) -> Result<f64, MaterializeError> {
        self.convert(name, convert::float)
            .map(Option::unwrap_or_default)
    }

    pub fn boolean(&self, name: &str) -> Result<bool, MaterializeError> {
        self.convert(name, convert::boolean)
            .map(Option::unwrap_or_default)
    }

    pub fn epoch_timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>, MaterializeError> {
        self.convert(name, |raw| convert::epoch_timestamp(convert::integer(raw)?))
            .map(Option::flatten)
    }

    pub fn duration(&self, name: &str) -> Result<Option<Duration>, MaterializeError> {
        self.convert(name, |raw| convert::duration_secs(convert::integer(raw)?))
    }

    pub fn calendar_timestamp(
        &self,
        name: &str,
    ) -> Result<Option<DateTime<Utc>>, MaterializeError> {
        self.convert(name, |raw| convert::calendar_timestamp(Self::text(raw)?))
            .map(Option::flatten)
    }

    pub fn network_address(&self, name: &str) -> Result<Option<IpAddr>, MaterializeError> {
        self.convert(name, |raw| convert::network_address(Self::text(raw)?))
    }

    pub fn status(&self, name: &str) -> Result<Option<SlotStatus>, MaterializeError> {
        self.convert(name, |raw| convert::status(Self::text(raw)?))
    }

    pub fn percent(&self, name: &str) -> Result<Option<f64>, MaterializeError> {
        self.convert(name, |raw| match raw {
            Value::Number(_) => convert::float(raw),
            other => convert::percent(Self::text(other)?),
        })
    }

    /// Recurse into a nested object field.
    pub fn nested<T: FromFields>(&self, name: &str) -> Result<Option<T>, MaterializeError> {
        match self.get(name) {
            Some(raw) => T::from_fields(&Fields::at(raw, self.field_path(name))?).map(Some),
            None => Ok(None),
        }
    }

    /// Recurse into an array-of-objects field. Missing is empty.
    pub fn repeated<T: FromFields>(&self, name: &str) -> Result<Vec<T>, MaterializeError> {
        match self.get(name) {
            Some(raw) => repeated_at(raw, &self.field_path(name)),
            None => Ok(Vec::new()),
        }
    }
}

/// Materialize every element of an array node located at `path`.
pub fn repeated_at<T: FromFields>(value: &Value, path: &str) -> Result<Vec<T>, MaterializeError> {
    let items = value.as_array().ok_or_else(|| MaterializeError {
        field: path.to_string(),
        raw: value.to_string(),
        source: convert::unexpected("array", value),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| T::from_fields(&Fields::at(item, format!("{path}[{i}]"))?))
        .collect()
}

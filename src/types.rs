use std::collections::HashMap;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or bound as query parameters.
///
/// ```rust
/// use sql_ops::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Map a JSON scalar onto the closest row value; arrays and objects stay JSON.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n
                    .as_f64()
                    .map_or_else(|| RowValues::JSON(value.clone()), RowValues::Float),
            },
            JsonValue::String(s) => RowValues::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => RowValues::JSON(value.clone()),
        }
    }
}

macro_rules! impl_row_value_from {
    ($($ty:ty => |$v:ident| $body:expr),+ $(,)?) => {
        $(
            impl From<$ty> for RowValues {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

impl_row_value_from! {
    i64 => |v| RowValues::Int(v),
    i32 => |v| RowValues::Int(i64::from(v)),
    u32 => |v| RowValues::Int(i64::from(v)),
    f64 => |v| RowValues::Float(v),
    bool => |v| RowValues::Bool(v),
    String => |v| RowValues::Text(v),
    &str => |v| RowValues::Text(v.to_owned()),
    &String => |v| RowValues::Text(v.clone()),
    NaiveDateTime => |v| RowValues::Timestamp(v),
    JsonValue => |v| RowValues::JSON(v),
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// A single binding supplied for one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Bound as one value.
    Scalar(RowValues),
    /// Expanded into one placeholder per element (`IN (...)` lists).
    List(Vec<RowValues>),
    /// Substituted into the SQL text after validation. Used for `GROUP BY` / `ORDER BY`
    /// clauses, which cannot take bound parameters.
    Inline(Vec<String>),
}

impl ParamValue {
    /// Inline identifier text, e.g. `ParamValue::inline(["name desc"])`.
    pub fn inline<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamValue::Inline(parts.into_iter().map(Into::into).collect())
    }

    fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Array(items) => {
                ParamValue::List(items.iter().map(RowValues::from_json).collect())
            }
            other => ParamValue::Scalar(RowValues::from_json(other)),
        }
    }
}

macro_rules! impl_param_value_from_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::Scalar(value.into())
                }
            }
        )+
    };
}

impl_param_value_from_scalar!(
    RowValues,
    i64,
    i32,
    u32,
    f64,
    bool,
    String,
    &str,
    &String,
    NaiveDateTime,
    JsonValue,
);

impl<T: Into<RowValues>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        ParamValue::Scalar(value.into())
    }
}

impl<T: Into<RowValues>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RowValues>, const N: usize> From<[T; N]> for ParamValue {
    fn from(values: [T; N]) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// The parameters produced by a declared operation for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Ordered values for `?` / `?N` templates.
    Positional(Vec<ParamValue>),
    /// Keyed values for `:name` templates.
    Named(HashMap<String, ParamValue>),
}

impl ParamSource {
    /// An empty positional source, for templates without placeholders.
    #[must_use]
    pub fn none() -> Self {
        ParamSource::Positional(Vec::new())
    }

    /// Number of top-level bindings supplied.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ParamSource::Positional(values) => values.len(),
            ParamSource::Named(map) => map.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a source from JSON: objects become named sources, arrays positional ones,
    /// `null` an empty source and any other scalar a one-element positional source.
    /// Nested arrays are list bindings.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use sql_ops::prelude::*;
    ///
    /// let source = ParamSource::from_json(&json!({"cnt": 5, "name": ["a", "b"]}));
    /// assert_eq!(source.len(), 2);
    /// ```
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => ParamSource::Named(
                map.iter()
                    .map(|(key, v)| (key.clone(), ParamValue::from_json(v)))
                    .collect(),
            ),
            JsonValue::Array(items) => {
                ParamSource::Positional(items.iter().map(ParamValue::from_json).collect())
            }
            JsonValue::Null => ParamSource::none(),
            scalar => ParamSource::Positional(vec![ParamValue::from_json(scalar)]),
        }
    }
}

impl Default for ParamSource {
    fn default() -> Self {
        ParamSource::none()
    }
}

impl From<()> for ParamSource {
    fn from((): ()) -> Self {
        ParamSource::none()
    }
}

impl From<Vec<ParamValue>> for ParamSource {
    fn from(values: Vec<ParamValue>) -> Self {
        ParamSource::Positional(values)
    }
}

impl From<HashMap<String, ParamValue>> for ParamSource {
    fn from(map: HashMap<String, ParamValue>) -> Self {
        ParamSource::Named(map)
    }
}

/// How `Select` / `SelectMany` shape each returned row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RowShape {
    /// Column name to value.
    #[default]
    Map,
    /// Values in column order.
    Tuple,
}

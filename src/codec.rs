//! Categorical encoding shared by training and inference. Known categories
//! are coded `1..=n` in sorted order; `0` means unseen or missing.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InputValidationError;

pub const UNKNOWN_CODE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl FeatureColumn {
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Numeric,
        }
    }

    pub fn categorical(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Categorical,
        }
    }

    /// Name of the column as it appears in the feature vector.
    pub fn feature_name(&self) -> String {
        match self.kind {
            ColumnKind::Numeric => self.name.clone(),
            ColumnKind::Categorical => format!("{}_encoded", self.name),
        }
    }
}

/// Ordered column layout of one predictor's feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<FeatureColumn>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(FeatureColumn::feature_name).collect()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|column| column.kind == ColumnKind::Numeric)
            .map(|column| column.name.as_str())
    }

    /// Build the feature vector for `input`. Absent values encode as 0.
    pub fn encode(&self, codec: &FeatureCodec, input: &FeatureInput) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| match column.kind {
                ColumnKind::Numeric => input.number(&column.name).unwrap_or(0.0),
                ColumnKind::Categorical => match input.category(&column.name) {
                    Some(value) => f64::from(codec.encode(&column.name, &value)),
                    None => f64::from(UNKNOWN_CODE),
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Categorical form of the value. Integral numbers render without a
    /// fractional part so that `10` and `"10"` fall in the same category.
    pub fn as_category(&self) -> String {
        match self {
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A flat, string-keyed student feature mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureInput(BTreeMap<String, FeatureValue>);

impl FeatureInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<FeatureValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn insert_opt(&mut self, key: &str, value: Option<f64>) {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.insert(key, value);
        }
    }

    /// Inserts a categorical value, skipping empty strings.
    pub fn insert_category(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.insert(key, value);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FeatureValue> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(FeatureValue::as_number)
    }

    pub fn category(&self, key: &str) -> Option<String> {
        self.0.get(key).map(FeatureValue::as_category)
    }

    /// Parse an inference request body. Nulls are treated as absent keys;
    /// nested values, booleans and non-finite numbers are rejected.
    pub fn from_json(value: &Value) -> Result<Self, InputValidationError> {
        let Value::Object(map) = value else {
            return Err(InputValidationError::NotAnObject);
        };

        let mut input = Self::new();
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Number(number) => {
                    let number = number
                        .as_f64()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| InputValidationError::NonFinite { key: key.clone() })?;
                    input.insert(key, number);
                }
                Value::String(text) => input.insert(key, text.as_str()),
                Value::Bool(_) => {
                    return Err(InputValidationError::UnsupportedValue {
                        key: key.clone(),
                        kind: "boolean",
                    })
                }
                Value::Array(_) => {
                    return Err(InputValidationError::UnsupportedValue {
                        key: key.clone(),
                        kind: "array",
                    })
                }
                Value::Object(_) => {
                    return Err(InputValidationError::UnsupportedValue {
                        key: key.clone(),
                        kind: "object",
                    })
                }
            }
        }
        Ok(input)
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for FeatureInput {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Sorted vocabulary of one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    pub fn encode(&self, value: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
            .and_then(|index| u32::try_from(index + 1).ok())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodecBuilder {
    vocabulary: BTreeMap<String, BTreeSet<String>>,
}

impl CodecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add observed values of `column` to its vocabulary. Empty strings are
    /// treated as missing and never become a category.
    pub fn fit<I, S>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.vocabulary.entry(column.to_string()).or_default();
        for value in values {
            let value = value.as_ref();
            if !value.is_empty() {
                entry.insert(value.to_string());
            }
        }
        self
    }

    pub fn build(self) -> FeatureCodec {
        let encoders = self
            .vocabulary
            .into_iter()
            .map(|(column, classes)| {
                (
                    column,
                    CategoryEncoder {
                        classes: classes.into_iter().collect(),
                    },
                )
            })
            .collect();
        FeatureCodec { encoders }
    }
}

/// Frozen per-column categorical encoders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCodec {
    encoders: BTreeMap<String, CategoryEncoder>,
}

impl FeatureCodec {
    /// Code for `value` in `column`, or [`UNKNOWN_CODE`] when the column or
    /// the value was not seen during fitting.
    pub fn encode(&self, column: &str, value: &str) -> u32 {
        match self.encoders.get(column).and_then(|encoder| encoder.encode(value)) {
            Some(code) => code,
            None => {
                tracing::debug!(column, value, "unseen category encoded as unknown");
                UNKNOWN_CODE
            }
        }
    }
}

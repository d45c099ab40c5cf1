//! Terminal evaluation outcomes.
//!
//! A [`Decision`] is immutable once built: it pairs a [`Category`] with a
//! mandatory rationale and free-form metadata. Construction refuses an empty
//! rationale and stamps a `timestamp` into the metadata when the caller did
//! not supply one. Deserialization goes through the same checks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Metadata key holding the RFC 3339 creation time of a decision.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Metadata key naming the rule (or `fallback`) that produced a decision.
pub const SOURCE_KEY: &str = "decision_source";

/// Outcome category of a triage evaluation.
///
/// Serializes as the lowercase name. Deserialization accepts whatever
/// [`FromStr`] accepts: any case, plus the legacy names `pass`, `flag` and
/// `discard`. The default is the conservative `Review`, used when no rule
/// is decisive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Category {
    /// The subject meets all criteria and moves on.
    Proceed,
    /// The subject needs human judgment.
    #[default]
    Review,
    /// The subject definitively fails and is dropped.
    Reject,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Proceed => "proceed",
            Category::Review => "review",
            Category::Reject => "reject",
        }
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, Category::Proceed)
    }

    pub fn requires_review(&self) -> bool {
        matches!(self, Category::Review)
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Category::Reject)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proceed" | "pass" => Ok(Category::Proceed),
            "review" | "flag" => Ok(Category::Review),
            "reject" | "discard" => Ok(Category::Reject),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Immutable verdict with category, rationale and supporting metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DecisionFields")]
pub struct Decision {
    category: Category,
    rationale: String,
    metadata: Map<String, Value>,
}

#[derive(Deserialize)]
struct DecisionFields {
    category: Category,
    rationale: String,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl TryFrom<DecisionFields> for Decision {
    type Error = ValidationError;

    fn try_from(fields: DecisionFields) -> Result<Self, Self::Error> {
        Decision::new(fields.category, fields.rationale, fields.metadata)
    }
}

impl Decision {
    /// Build a decision.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyRationale` if the rationale is blank.
    pub fn new(
        category: Category,
        rationale: impl Into<String>,
        mut metadata: Map<String, Value>,
    ) -> Result<Self, ValidationError> {
        let rationale = rationale.into();
        if rationale.trim().is_empty() {
            return Err(ValidationError::EmptyRationale);
        }
        if !metadata.contains_key(TIMESTAMP_KEY) {
            metadata.insert(
                TIMESTAMP_KEY.to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
        Ok(Self {
            category,
            rationale,
            metadata,
        })
    }

    pub fn proceed(rationale: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Category::Proceed, rationale, Map::new())
    }

    pub fn review(rationale: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Category::Review, rationale, Map::new())
    }

    pub fn reject(rationale: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Category::Reject, rationale, Map::new())
    }

    /// Add a metadata entry (builder pattern). Replaces an existing key.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Name of the rule that produced this decision, if recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }

    /// Parsed `timestamp` metadata, `None` when absent or unparseable.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.metadata
            .get(TIMESTAMP_KEY)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// `{category, rationale, metadata}` projection.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "category": self.category.as_str(),
            "rationale": self.rationale,
            "metadata": self.metadata,
        })
    }

    /// Inverse of [`Decision::to_value`]. Re-runs the construction checks.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Decision({}: {})",
            self.category.as_str().to_ascii_uppercase(),
            self.rationale
        )
    }
}

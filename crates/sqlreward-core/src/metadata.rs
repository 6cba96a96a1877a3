//! Per-question metadata that drives validation mode and policy choice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Declared complexity of the reference query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Complexity {
    /// Single-table lookups and filters.
    Simple,
    /// Joins or aggregation.
    Moderate,
    /// Multi-join, grouped or nested queries.
    Complex,
}

/// Phrasing style of the natural-language question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Style {
    /// Underspecified; result order carries no meaning.
    Vague,
    /// Conversational phrasing.
    Colloquial,
    /// Direct instructions that pin the query down.
    Imperative,
}

/// Error returned when a metadata label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {field} label: '{value}'")]
pub struct UnknownLabel {
    field: &'static str,
    value: String,
}

impl FromStr for Complexity {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            _ => Err(UnknownLabel {
                field: "complexity",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Style {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vague" => Ok(Self::Vague),
            "colloquial" => Ok(Self::Colloquial),
            "imperative" => Ok(Self::Imperative),
            _ => Err(UnknownLabel {
                field: "style",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Metadata attached to a reference query.
///
/// Unknown or malformed labels deserialize to `None` rather than failing, so a
/// dataset with new labels still evaluates under the default policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Declared complexity.
    #[serde(default, alias = "sql_complexity", deserialize_with = "lenient")]
    pub complexity: Option<Complexity>,
    /// Question style.
    #[serde(default, alias = "question_style", deserialize_with = "lenient")]
    pub style: Option<Style>,
    /// Database identifier.
    #[serde(default)]
    pub db_id: Option<String>,
}

impl QueryMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the complexity.
    #[must_use]
    pub const fn complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Sets the style.
    #[must_use]
    pub const fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Sets the database identifier.
    #[must_use]
    pub fn db_id(mut self, db_id: impl Into<String>) -> Self {
        self.db_id = Some(db_id.into());
        self
    }

    /// Returns whether the complexity is declared as complex.
    #[must_use]
    pub fn is_complex(&self) -> bool {
        self.complexity == Some(Complexity::Complex)
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}

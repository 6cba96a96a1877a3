//! Choice of equivalence strategy.

use std::fmt;

use serde::Serialize;

use crate::metadata::{Complexity, QueryMetadata, Style};

/// How candidate and reference queries are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Normalized text of the whole statement must match.
    Exact,
    /// Every clause of every SELECT block must match.
    Structural,
    /// Both queries run against a live database and their rows must match.
    Execution,
}

impl Strategy {
    /// Returns the strategy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Structural => "structural",
            Self::Execution => "execution",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects the comparison strategy for one question.
///
/// A live connection always wins. Without one, simple or imperatively
/// phrased questions have a single expected shape and are compared exactly;
/// everything else, including missing labels, is compared structurally.
#[must_use]
pub fn select_strategy(metadata: &QueryMetadata, connection_available: bool) -> Strategy {
    if connection_available {
        return Strategy::Execution;
    }
    match (metadata.complexity, metadata.style) {
        (Some(Complexity::Simple), _) | (_, Some(Style::Imperative)) => Strategy::Exact,
        _ => Strategy::Structural,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLEXITIES: [Option<Complexity>; 4] = [
        None,
        Some(Complexity::Simple),
        Some(Complexity::Moderate),
        Some(Complexity::Complex),
    ];

    const STYLES: [Option<Style>; 4] = [
        None,
        Some(Style::Vague),
        Some(Style::Colloquial),
        Some(Style::Imperative),
    ];

    fn metadata(complexity: Option<Complexity>, style: Option<Style>) -> QueryMetadata {
        QueryMetadata {
            complexity,
            style,
            db_id: None,
        }
    }

    #[test]
    fn test_every_combination_has_a_strategy() {
        for complexity in COMPLEXITIES {
            for style in STYLES {
                let m = metadata(complexity, style);
                assert_eq!(select_strategy(&m, true), Strategy::Execution);

                let expected = if complexity == Some(Complexity::Simple)
                    || style == Some(Style::Imperative)
                {
                    Strategy::Exact
                } else {
                    Strategy::Structural
                };
                assert_eq!(select_strategy(&m, false), expected, "{complexity:?}/{style:?}");
                assert_eq!(select_strategy(&m, false), select_strategy(&m, false));
            }
        }
    }

    #[test]
    fn test_missing_labels_are_structural() {
        assert_eq!(
            select_strategy(&QueryMetadata::new(), false),
            Strategy::Structural
        );
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::Exact.to_string(), "exact");
        assert_eq!(Strategy::Execution.as_str(), "execution");
    }
}

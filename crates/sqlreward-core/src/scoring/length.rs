//! Response-length scoring.

use serde::{Deserialize, Serialize};

/// Character counts of the parts of an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthInput {
    /// Length of the reasoning section.
    pub think_len: u32,
    /// Length of the answer section, SQL included.
    pub answer_len: u32,
    /// Length of the SQL inside the answer, trimmed.
    pub sql_len: u32,
}

impl LengthInput {
    /// Creates a length input from counts.
    #[must_use]
    pub const fn new(think_len: u32, answer_len: u32, sql_len: u32) -> Self {
        Self {
            think_len,
            answer_len,
            sql_len,
        }
    }

    /// Counts the characters of each part.
    #[must_use]
    pub fn from_parts(think: &str, answer: &str, sql: &str) -> Self {
        let count = |s: &str| u32::try_from(s.chars().count()).unwrap_or(u32::MAX);
        Self::new(count(think), count(answer), count(sql.trim()))
    }
}

/// Length budget of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthConfig {
    /// Reasoning plus answer length that earns the full budget share.
    pub max_length: u32,
}

impl LengthConfig {
    /// The default budget of 512 characters.
    pub const DEFAULT: Self = Self::new(512);

    /// Creates a length budget.
    #[must_use]
    pub const fn new(max_length: u32) -> Self {
        Self { max_length }
    }
}

impl Default for LengthConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Scores response length as `0.5 * min(total / max_length, 1) + sql / answer`.
///
/// `total` is the reasoning plus answer length. The second term is the share
/// of the answer taken by SQL, zero for an empty answer. The result lies in
/// `[0, 1.5]`.
#[must_use]
pub fn score_length(config: &LengthConfig, input: &LengthInput) -> f64 {
    let total = input.think_len.saturating_add(input.answer_len);
    let budget_share = if config.max_length == 0 || total > config.max_length {
        1.0
    } else {
        f64::from(total) / f64::from(config.max_length)
    };
    let sql_share = if input.answer_len == 0 {
        0.0
    } else {
        (f64::from(input.sql_len) / f64::from(input.answer_len)).min(1.0)
    };
    0.5f64.mul_add(budget_share, sql_share)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_within_budget() {
        let input = LengthInput::new(156, 100, 50);
        // 0.5 * 256 / 512 + 50 / 100
        assert!(close(score_length(&LengthConfig::DEFAULT, &input), 0.75));
    }

    #[test]
    fn test_over_budget_saturates() {
        let input = LengthInput::new(900, 100, 100);
        assert!(close(score_length(&LengthConfig::DEFAULT, &input), 1.5));
        assert!(close(score_length(&LengthConfig::new(0), &input), 1.5));
    }

    #[test]
    fn test_empty_answer() {
        let input = LengthInput::new(128, 0, 0);
        assert!(close(score_length(&LengthConfig::DEFAULT, &input), 0.125));
    }

    #[test]
    fn test_from_parts_counts_characters() {
        let input = LengthInput::from_parts("é😀", "```sql SELECT 1 ```", "  SELECT 1 ");
        assert_eq!(input, LengthInput::new(2, 19, 8));
    }
}

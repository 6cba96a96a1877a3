//! Score aggregation.
//!
//! An evaluation passes through three gates in order: Format, Validity and
//! Equivalence. A passed gate adds its reward; a failed gate adds its penalty
//! and stops aggregation. Explanation credit is added once the Equivalence
//! gate has been reached, and length credit once it has passed. The sum is
//! then capped, rescaled, clamped and rounded according to [`ScoringConfig`].

mod explanation;
mod length;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use explanation::{score_explanation, ExplanationConfig, ExplanationInput};
pub use length::{score_length, LengthConfig, LengthInput};

/// A contribution to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// The answer had the expected shape.
    Format,
    /// The SQL parsed and fit the schema.
    Validity,
    /// The SQL was equivalent to the reference.
    Equivalence,
    /// Quality of the accompanying explanation.
    Explanation,
    /// Response length relative to a budget.
    Length,
}

/// A pass/fail checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    /// Answer format.
    Format,
    /// Syntax and schema.
    Validity,
    /// Equivalence with the reference.
    Equivalence,
}

impl Gate {
    /// Gates in evaluation order.
    pub const ALL: [Self; 3] = [Self::Format, Self::Validity, Self::Equivalence];

    /// Returns the breakdown component the gate contributes to.
    #[must_use]
    pub const fn component(&self) -> Component {
        match self {
            Self::Format => Component::Format,
            Self::Validity => Component::Validity,
            Self::Equivalence => Component::Equivalence,
        }
    }
}

/// Points a gate contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateWeights {
    /// Added when the gate passes.
    pub on_pass: f64,
    /// Added when the gate fails; usually zero or negative.
    pub on_fail: f64,
}

impl GateWeights {
    /// Creates gate weights.
    #[must_use]
    pub const fn new(on_pass: f64, on_fail: f64) -> Self {
        Self { on_pass, on_fail }
    }
}

/// Linear rescale of the raw sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rescale {
    /// Raw value mapped to `to`.
    pub from: f64,
    /// Target ceiling.
    pub to: f64,
}

/// Weights, caps and bounds of the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Format gate weights.
    pub format: GateWeights,
    /// Validity gate weights.
    pub validity: GateWeights,
    /// Equivalence gate weights.
    pub equivalence: GateWeights,
    /// Upper bound of the explanation credit.
    pub explanation_max: f64,
    /// Length budget; length is not scored without one.
    pub length: Option<LengthConfig>,
    /// Cap on the raw sum when the format gate failed.
    pub format_cap: Option<f64>,
    /// Cap on the raw sum when the validity gate failed.
    pub validity_cap: Option<f64>,
    /// Rescale applied after caps.
    pub rescale: Option<Rescale>,
    /// Lowest final score.
    pub min_score: f64,
    /// Highest final score.
    pub max_score: f64,
    /// Decimal places kept in the final score.
    pub round_decimals: Option<u32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::graded()
    }
}

impl ScoringConfig {
    /// A 0 to 10 scale: rewards only, caps on early failures, rescaled from
    /// 8 raw points and rounded to one decimal.
    #[must_use]
    pub const fn graded() -> Self {
        Self {
            format: GateWeights::new(2.0, 0.0),
            validity: GateWeights::new(3.0, 0.0),
            equivalence: GateWeights::new(3.0, 0.0),
            explanation_max: 2.0,
            length: None,
            format_cap: Some(0.8),
            validity_cap: Some(2.4),
            rescale: Some(Rescale { from: 8.0, to: 10.0 }),
            min_score: 0.0,
            max_score: 10.0,
            round_decimals: Some(1),
        }
    }

    /// A signed scale: each gate adds or subtracts its weight, and a passed
    /// Equivalence gate earns length credit within a 512 character budget.
    #[must_use]
    pub const fn progressive() -> Self {
        Self {
            format: GateWeights::new(1.0, -1.0),
            validity: GateWeights::new(2.0, -2.0),
            equivalence: GateWeights::new(3.0, -3.0),
            explanation_max: 0.5,
            length: Some(LengthConfig::DEFAULT),
            format_cap: None,
            validity_cap: None,
            rescale: None,
            min_score: -6.0,
            max_score: 6.5,
            round_decimals: None,
        }
    }

    /// Sets the weights of one gate.
    #[must_use]
    pub const fn gate(mut self, gate: Gate, weights: GateWeights) -> Self {
        match gate {
            Gate::Format => self.format = weights,
            Gate::Validity => self.validity = weights,
            Gate::Equivalence => self.equivalence = weights,
        }
        self
    }

    /// Sets the upper bound of the explanation credit.
    #[must_use]
    pub const fn explanation_max(mut self, max: f64) -> Self {
        self.explanation_max = max;
        self
    }

    /// Sets the length budget, or disables length scoring with `None`.
    #[must_use]
    pub const fn length(mut self, length: Option<LengthConfig>) -> Self {
        self.length = length;
        self
    }

    /// Sets the caps applied after a format or validity failure.
    #[must_use]
    pub const fn caps(mut self, format: Option<f64>, validity: Option<f64>) -> Self {
        self.format_cap = format;
        self.validity_cap = validity;
        self
    }

    /// Sets the final score range.
    #[must_use]
    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.min_score = min;
        self.max_score = max;
        self
    }

    /// Returns the weights of a gate.
    #[must_use]
    pub const fn weights(&self, gate: Gate) -> GateWeights {
        match gate {
            Gate::Format => self.format,
            Gate::Validity => self.validity,
            Gate::Equivalence => self.equivalence,
        }
    }

    const fn cap(&self, gate: Gate) -> Option<f64> {
        match gate {
            Gate::Format => self.format_cap,
            Gate::Validity => self.validity_cap,
            Gate::Equivalence => None,
        }
    }
}

/// Per-component contributions.
pub type ScoreBreakdown = BTreeMap<Component, f64>;

/// The outcome of aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalScore {
    /// Contributions before caps and rescale.
    pub breakdown: ScoreBreakdown,
    /// The bounded final score.
    pub score: f64,
    /// The gate that stopped aggregation, if any.
    pub failed_gate: Option<Gate>,
}

/// Accumulates gate results for one evaluation.
#[derive(Debug)]
pub struct ScoreCard<'a> {
    config: &'a ScoringConfig,
    breakdown: ScoreBreakdown,
    failed: Option<Gate>,
    reached_equivalence: bool,
}

impl<'a> ScoreCard<'a> {
    /// Starts an empty score card.
    #[must_use]
    pub const fn new(config: &'a ScoringConfig) -> Self {
        Self {
            config,
            breakdown: BTreeMap::new(),
            failed: None,
            reached_equivalence: false,
        }
    }

    /// Records a gate result and returns whether aggregation continues.
    ///
    /// Results recorded after a failed gate are ignored.
    pub fn record(&mut self, gate: Gate, passed: bool) -> bool {
        if self.failed.is_some() {
            return false;
        }
        let weights = self.config.weights(gate);
        let points = if passed { weights.on_pass } else { weights.on_fail };
        self.breakdown.insert(gate.component(), points);
        if gate == Gate::Equivalence {
            self.reached_equivalence = true;
        }
        if !passed {
            debug!(?gate, points, "Gate failed");
            self.failed = Some(gate);
        }
        passed
    }

    /// Adds explanation credit, clamped to `[0, explanation_max]`.
    ///
    /// Ignored unless the Equivalence gate has been recorded.
    pub fn add_explanation(&mut self, credit: f64) {
        if !self.reached_equivalence {
            return;
        }
        let credit = credit.clamp(0.0, self.config.explanation_max.max(0.0));
        self.breakdown.insert(Component::Explanation, credit);
    }

    /// Adds length credit for the response.
    ///
    /// Ignored unless the Equivalence gate passed and a length budget is
    /// configured.
    pub fn add_length(&mut self, input: &LengthInput) {
        if !self.reached_equivalence || self.failed.is_some() {
            return;
        }
        let Some(length) = &self.config.length else {
            return;
        };
        self.breakdown
            .insert(Component::Length, score_length(length, input));
    }

    /// Returns the gate that stopped aggregation, if any.
    #[must_use]
    pub const fn failed_gate(&self) -> Option<Gate> {
        self.failed
    }

    /// Sums the breakdown and applies caps, rescale, clamp and rounding.
    #[must_use]
    pub fn finish(self) -> FinalScore {
        let config = self.config;
        let raw: f64 = self.breakdown.values().sum();

        let mut score = raw;
        for gate in Gate::ALL {
            if self.failed == Some(gate) {
                if let Some(cap) = config.cap(gate) {
                    score = score.min(cap);
                }
            }
        }
        if let Some(rescale) = config.rescale {
            if rescale.from > 0.0 {
                score *= rescale.to / rescale.from;
            }
        }
        // An inverted range resolves to `max_score`.
        score = score.max(config.min_score).min(config.max_score);
        if let Some(decimals) = config.round_decimals {
            let factor = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
            score = (score * factor).round() / factor;
        }

        debug!(raw, score, failed_gate = ?self.failed, "Aggregated score");
        FinalScore {
            breakdown: self.breakdown,
            score,
            failed_gate: self.failed,
        }
    }
}

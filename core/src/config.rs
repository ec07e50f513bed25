//! Engine configuration — scoring weights, baselines and triage thresholds.
//!
//! Configuration is a value passed into constructors. Nothing reads it
//! from a global, and nothing mutates a live scorer's weights: a different
//! weighting means a different scorer.

use crate::{
    error::{EngineError, EngineResult},
    types::Money,
    triage::PaymentStrategy,
};
use serde::{Deserialize, Serialize};

/// Allowed drift of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

pub const DEFAULT_TYPICAL_BILL_AMOUNT: Money = 200.0;
pub const DEFAULT_MINIMUM_PAYMENT_THRESHOLD: Money = 25.0;

// ── Priority weights ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriorityFactors {
    pub immediate_consequence_weight: f64,
    pub financial_impact_weight:      f64,
    pub recovery_difficulty_weight:   f64,
    pub due_date_weight:              f64,
    pub amount_weight:                f64,
}

impl Default for PriorityFactors {
    fn default() -> Self {
        Self {
            immediate_consequence_weight: 0.40,
            financial_impact_weight:      0.25,
            recovery_difficulty_weight:   0.20,
            due_date_weight:              0.10,
            amount_weight:                0.05,
        }
    }
}

impl PriorityFactors {
    /// Build and validate in one step.
    pub fn new(
        immediate_consequence_weight: f64,
        financial_impact_weight: f64,
        recovery_difficulty_weight: f64,
        due_date_weight: f64,
        amount_weight: f64,
    ) -> EngineResult<Self> {
        let factors = Self {
            immediate_consequence_weight,
            financial_impact_weight,
            recovery_difficulty_weight,
            due_date_weight,
            amount_weight,
        };
        factors.validate()?;
        Ok(factors)
    }

    pub fn sum(&self) -> f64 {
        self.immediate_consequence_weight
            + self.financial_impact_weight
            + self.recovery_difficulty_weight
            + self.due_date_weight
            + self.amount_weight
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("immediate_consequence_weight", self.immediate_consequence_weight),
            ("financial_impact_weight", self.financial_impact_weight),
            ("recovery_difficulty_weight", self.recovery_difficulty_weight),
            ("due_date_weight", self.due_date_weight),
            ("amount_weight", self.amount_weight),
        ]
    }

    /// Weights must be non-negative and sum to 1.0 within tolerance.
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in self.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::NegativeWeight { name, value });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::InvalidWeights { sum });
        }
        Ok(())
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub factors:             PriorityFactors,
    /// Baseline the amount sub-score compares balances against.
    pub typical_bill_amount: Money,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            factors: PriorityFactors::default(),
            typical_bill_amount: DEFAULT_TYPICAL_BILL_AMOUNT,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.factors.validate()?;
        if !self.typical_bill_amount.is_finite() || self.typical_bill_amount <= 0.0 {
            return Err(EngineError::InvalidBaseline { value: self.typical_bill_amount });
        }
        Ok(())
    }
}

// ── Triage ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriageConfig {
    /// Below this, a partial payment is not worth sending.
    pub minimum_payment_threshold: Money,
    pub default_strategy:          PaymentStrategy,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            minimum_payment_threshold: DEFAULT_MINIMUM_PAYMENT_THRESHOLD,
            default_strategy: PaymentStrategy::Balanced,
        }
    }
}

impl TriageConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.minimum_payment_threshold.is_finite() || self.minimum_payment_threshold < 0.0 {
            return Err(EngineError::InvalidThreshold { value: self.minimum_payment_threshold });
        }
        Ok(())
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub triage:  TriageConfig,
}

impl EngineConfig {
    /// Load from a JSON file. Missing keys take their defaults; the result
    /// is validated before it is returned.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        log::info!(
            "config: loaded {path} (weights sum {:.2}, typical bill ${:.2})",
            config.scoring.factors.sum(),
            config.scoring.typical_bill_amount
        );
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.scoring.validate()?;
        self.triage.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_valid() {
        let f = PriorityFactors::default();
        assert!((f.sum() - 1.0).abs() < 1e-9);
        assert!(f.validate().is_ok());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn weight_sum_outside_tolerance_is_rejected() {
        let half = PriorityFactors::new(0.2, 0.1, 0.1, 0.05, 0.05);
        assert!(matches!(half, Err(EngineError::InvalidWeights { .. })));

        let heavy = PriorityFactors::new(0.6, 0.4, 0.3, 0.1, 0.1);
        assert!(matches!(heavy, Err(EngineError::InvalidWeights { .. })));
    }

    #[test]
    fn weight_sum_inside_tolerance_is_accepted() {
        assert!(PriorityFactors::new(0.405, 0.25, 0.20, 0.10, 0.05).is_ok());
        assert!(PriorityFactors::new(0.395, 0.25, 0.20, 0.10, 0.05).is_ok());
    }

    #[test]
    fn negative_weight_is_rejected_even_when_sum_is_one() {
        let r = PriorityFactors::new(1.1, -0.1, 0.0, 0.0, 0.0);
        assert!(matches!(r, Err(EngineError::NegativeWeight { name: "financial_impact_weight", .. })));
    }

    #[test]
    fn non_positive_baseline_is_rejected() {
        let cfg = ScoringConfig { typical_bill_amount: 0.0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidBaseline { .. })));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "triage": { "minimum_payment_threshold": 40 } }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.triage.minimum_payment_threshold, 40.0);
        assert_eq!(cfg.triage.default_strategy, PaymentStrategy::Balanced);
        assert_eq!(cfg.scoring, ScoringConfig::default());
    }
}

//! Consequence model — the real-world harm that follows non-payment.
//!
//! A `Consequence` carries the metadata every kind shares (severity,
//! urgency, recoverability) plus a `ConsequenceKind` payload specific to
//! the harm. The kind is serialized as a flattened `type` tag so a stored
//! consequence reads as one flat JSON object.
//!
//! RULE: scoring dispatches on `ConsequenceKind` with exhaustive matches.
//! Adding a kind means the compiler points at every formula that must
//! decide how to treat it.

use crate::types::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Urgency tier ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsequenceUrgency {
    Immediate,  // ≤ 7 days
    ShortTerm,  // 8–30 days
    MediumTerm, // 31–90 days
    LongTerm,   // > 90 days
}

impl ConsequenceUrgency {
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d <= 7 => Self::Immediate,
            d if d <= 30 => Self::ShortTerm,
            d if d <= 90 => Self::MediumTerm,
            _ => Self::LongTerm,
        }
    }

    /// Bonus added by the generic immediate-consequence formula.
    pub fn generic_bonus(&self) -> f64 {
        match self {
            Self::Immediate => 20.0,
            Self::ShortTerm => 15.0,
            Self::MediumTerm => 10.0,
            Self::LongTerm => 5.0,
        }
    }
}

// ── Discriminant ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsequenceType {
    Shutoff,
    Eviction,
    Foreclosure,
    Repossession,
    LicenseSuspension,
    CreditDamage,
    LateFees,
    Garnishment,
    ServiceLoss,
}

// ── Variant payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UtilityType {
    Electric,
    Gas,
    Water,
    Internet,
    Phone,
    Trash,
}

impl UtilityType {
    /// Utilities whose loss threatens health or habitability.
    pub fn is_essential(&self) -> bool {
        matches!(self, Self::Electric | Self::Gas | Self::Water)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShutoffDetails {
    pub utility_type:      Option<UtilityType>,
    pub shutoff_date:      Option<DateTime<Utc>>,
    pub reconnection_fee:  Option<Money>,
    pub grace_period_days: Option<i64>,
    pub winter_moratorium: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HousingLossDetails {
    pub notice_date:  Option<DateTime<Utc>>,
    pub court_date:   Option<DateTime<Utc>>,
    pub legal_fees:   Option<Money>,
    pub moving_costs: Option<Money>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepossessionDetails {
    pub vehicle_value:          Option<Money>,
    pub deficiency_balance:     Option<Money>,
    pub redemption_period_days: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SuspensionType {
    #[default]
    Other,
    DriversLicense,
    VehicleRegistration,
    ProfessionalLicense,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LicenseSuspensionDetails {
    pub suspension_type:  SuspensionType,
    pub reinstatement_fee: Option<Money>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BorrowingImpact {
    #[default]
    Minor,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CreditDamageDetails {
    pub estimated_score_drop: Option<f64>,
    pub years_on_report:      Option<f64>,
    pub impact_on_borrowing:  BorrowingImpact,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingFrequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LateFeeDetails {
    pub late_fee_amount:       Option<Money>,
    pub is_compounding:        bool,
    pub compounding_frequency: Option<CompoundingFrequency>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GarnishmentDetails {
    /// Share of each paycheck withheld, 0–1.
    pub wage_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceLossDetails {
    pub service_name: Option<String>,
}

/// Per-kind payload. The serde tag doubles as the `type` discriminant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsequenceKind {
    Shutoff(ShutoffDetails),
    Eviction(HousingLossDetails),
    Foreclosure(HousingLossDetails),
    Repossession(RepossessionDetails),
    LicenseSuspension(LicenseSuspensionDetails),
    CreditDamage(CreditDamageDetails),
    LateFees(LateFeeDetails),
    Garnishment(GarnishmentDetails),
    ServiceLoss(ServiceLossDetails),
}

impl ConsequenceKind {
    pub fn consequence_type(&self) -> ConsequenceType {
        match self {
            Self::Shutoff(_)           => ConsequenceType::Shutoff,
            Self::Eviction(_)          => ConsequenceType::Eviction,
            Self::Foreclosure(_)       => ConsequenceType::Foreclosure,
            Self::Repossession(_)      => ConsequenceType::Repossession,
            Self::LicenseSuspension(_) => ConsequenceType::LicenseSuspension,
            Self::CreditDamage(_)      => ConsequenceType::CreditDamage,
            Self::LateFees(_)          => ConsequenceType::LateFees,
            Self::Garnishment(_)       => ConsequenceType::Garnishment,
            Self::ServiceLoss(_)       => ConsequenceType::ServiceLoss,
        }
    }

    /// A concrete calendar date the harm is scheduled for, if the creditor gave one.
    pub fn scheduled_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Shutoff(d) => d.shutoff_date,
            Self::Eviction(d) | Self::Foreclosure(d) => d.court_date,
            Self::Repossession(_)
            | Self::LicenseSuspension(_)
            | Self::CreditDamage(_)
            | Self::LateFees(_)
            | Self::Garnishment(_)
            | Self::ServiceLoss(_) => None,
        }
    }

    fn default_description(&self) -> &'static str {
        match self {
            Self::Shutoff(_)           => "Service shutoff",
            Self::Eviction(_)          => "Eviction",
            Self::Foreclosure(_)       => "Foreclosure",
            Self::Repossession(_)      => "Vehicle repossession",
            Self::LicenseSuspension(_) => "License suspension",
            Self::CreditDamage(_)      => "Credit score damage",
            Self::LateFees(_)          => "Late fees",
            Self::Garnishment(_)       => "Wage garnishment",
            Self::ServiceLoss(_)       => "Loss of service",
        }
    }
}

// ── Consequence ──────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consequence {
    pub urgency:     ConsequenceUrgency,
    /// 0–100. Clamped on construction and again by every reader.
    pub severity:    f64,
    #[serde(default)]
    pub description: String,
    /// Days until the consequence occurs.
    #[serde(default)]
    pub estimated_days: Option<i64>,
    #[serde(default = "default_true")]
    pub preventable: bool,
    #[serde(default = "default_true")]
    pub recoverable: bool,
    #[serde(default)]
    pub recovery_cost: Option<Money>,
    #[serde(default)]
    pub recovery_time_months: Option<f64>,
    #[serde(flatten)]
    pub kind: ConsequenceKind,
}

impl Consequence {
    /// A preventable, recoverable consequence with no timing yet.
    /// Urgency starts at LONG_TERM until `in_days` pins it.
    pub fn new(kind: ConsequenceKind, severity: f64) -> Self {
        let description = kind.default_description().to_string();
        Self {
            urgency: ConsequenceUrgency::LongTerm,
            severity: severity.clamp(0.0, 100.0),
            description,
            estimated_days: None,
            preventable: true,
            recoverable: true,
            recovery_cost: None,
            recovery_time_months: None,
            kind,
        }
    }

    pub fn shutoff(utility: UtilityType, severity: f64) -> Self {
        Self::new(
            ConsequenceKind::Shutoff(ShutoffDetails {
                utility_type: Some(utility),
                ..Default::default()
            }),
            severity,
        )
    }

    /// Set the estimated days until it happens; urgency follows.
    pub fn in_days(mut self, days: i64) -> Self {
        self.estimated_days = Some(days);
        self.urgency = ConsequenceUrgency::from_days(days);
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_recovery(mut self, cost: Money, months: f64) -> Self {
        self.recovery_cost = Some(cost);
        self.recovery_time_months = Some(months);
        self
    }

    pub fn unrecoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }

    pub fn unpreventable(mut self) -> Self {
        self.preventable = false;
        self
    }

    pub fn consequence_type(&self) -> ConsequenceType {
        self.kind.consequence_type()
    }

    pub fn severity(&self) -> f64 {
        if self.severity.is_finite() {
            self.severity.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_tiers_follow_day_boundaries() {
        assert_eq!(ConsequenceUrgency::from_days(0), ConsequenceUrgency::Immediate);
        assert_eq!(ConsequenceUrgency::from_days(7), ConsequenceUrgency::Immediate);
        assert_eq!(ConsequenceUrgency::from_days(8), ConsequenceUrgency::ShortTerm);
        assert_eq!(ConsequenceUrgency::from_days(30), ConsequenceUrgency::ShortTerm);
        assert_eq!(ConsequenceUrgency::from_days(31), ConsequenceUrgency::MediumTerm);
        assert_eq!(ConsequenceUrgency::from_days(90), ConsequenceUrgency::MediumTerm);
        assert_eq!(ConsequenceUrgency::from_days(91), ConsequenceUrgency::LongTerm);
    }

    #[test]
    fn severity_is_clamped() {
        let c = Consequence::shutoff(UtilityType::Electric, 140.0);
        assert_eq!(c.severity(), 100.0);

        let mut c = Consequence::shutoff(UtilityType::Gas, 10.0);
        c.severity = f64::NAN;
        assert_eq!(c.severity(), 0.0, "NaN severity must read as zero");
    }

    #[test]
    fn serializes_as_flat_tagged_object() {
        let c = Consequence::shutoff(UtilityType::Water, 80.0).in_days(5);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "SHUTOFF");
        assert_eq!(json["utility_type"], "water");
        assert_eq!(json["urgency"], "IMMEDIATE");

        let back: Consequence = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{ "type": "LATE_FEES", "urgency": "SHORT_TERM", "severity": 30 }"#;
        let c: Consequence = serde_json::from_str(json).unwrap();
        assert!(c.preventable && c.recoverable);
        assert_eq!(c.consequence_type(), ConsequenceType::LateFees);
        match c.kind {
            ConsequenceKind::LateFees(d) => {
                assert!(!d.is_compounding);
                assert!(d.late_fee_amount.is_none());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}

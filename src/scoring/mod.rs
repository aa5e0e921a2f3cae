//! Health Scoring
//!
//! Converts a [`NutrientProfile`] into a 0-100 health score, a verdict and
//! generated explanation/recommendation text.
//!
//! Calories, sugar, fat and sodium earn 0-10 negative points each from their
//! share of the daily reference; protein and fiber earn 0-7.5 positive
//! points each. Score = 100 - negative + positive, clamped to 0..=100 and
//! rounded half to even. Unknown nutrients count as zero.

pub mod narrative;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::nutrition::{Nutrient, NutrientProfile};

/// Minimum score for [`Verdict::Healthy`]
pub const SCORE_HEALTHY: u8 = 70;
/// Minimum score for [`Verdict::Moderate`]
pub const SCORE_MODERATE: u8 = 40;

/// Upper bound (inclusive, % of reference) -> negative points
const NEGATIVE_BUCKETS: [(f64, u32); 5] = [(5.0, 0), (15.0, 2), (25.0, 4), (40.0, 6), (60.0, 8)];
/// Points above the last negative bucket
const NEGATIVE_MAX: u32 = 10;

/// Lower bound (inclusive, % of reference) -> positive points
const POSITIVE_BUCKETS: [(f64, f64); 4] = [(30.0, 7.5), (20.0, 5.0), (10.0, 3.0), (5.0, 1.5)];

/// Three-tier health verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Healthy Choice")]
    Healthy,
    #[serde(rename = "Consume in Moderation")]
    Moderate,
    #[serde(rename = "Limit Consumption")]
    Limit,
}

impl Verdict {
    /// Verdict for a final score; boundary scores belong to the higher tier
    pub fn from_score(score: u8) -> Self {
        if score >= SCORE_HEALTHY {
            Verdict::Healthy
        } else if score >= SCORE_MODERATE {
            Verdict::Moderate
        } else {
            Verdict::Limit
        }
    }

    /// Display label, also the stored form
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Healthy => "Healthy Choice",
            Verdict::Moderate => "Consume in Moderation",
            Verdict::Limit => "Limit Consumption",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Error for verdict labels that are not one of the three tiers
#[derive(Debug, thiserror::Error)]
#[error("unknown verdict '{0}'")]
pub struct UnknownVerdict(pub String);

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Healthy Choice" => Ok(Verdict::Healthy),
            "Consume in Moderation" => Ok(Verdict::Moderate),
            "Limit Consumption" => Ok(Verdict::Limit),
            other => Err(UnknownVerdict(other.to_string())),
        }
    }
}

/// Negative points per nutrient (each 0-10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NegativePoints {
    pub calories: u32,
    pub sugar: u32,
    pub fat: u32,
    pub sodium: u32,
    /// Sum, 0-40
    pub total: u32,
}

impl NegativePoints {
    /// Points in ranking order (calories, sugar, fat, sodium)
    pub fn by_nutrient(&self) -> [(Nutrient, u32); 4] {
        [
            (Nutrient::Calories, self.calories),
            (Nutrient::Sugar, self.sugar),
            (Nutrient::Fat, self.fat),
            (Nutrient::Sodium, self.sodium),
        ]
    }
}

/// Positive points per nutrient (each 0-7.5)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositivePoints {
    pub protein: f64,
    pub fiber: f64,
    /// Sum, 0-15
    pub total: f64,
}

impl PositivePoints {
    pub fn by_nutrient(&self) -> [(Nutrient, f64); 2] {
        [(Nutrient::Protein, self.protein), (Nutrient::Fiber, self.fiber)]
    }
}

/// How the score was reached; not persisted
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub negative: NegativePoints,
    pub positive: PositivePoints,
}

/// Score, verdict and generated text for one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    pub health_score: u8,
    pub verdict: Verdict,
    pub explanation: String,
    pub recommendation: String,
    pub breakdown: ScoreBreakdown,
}

/// Value as a percentage of the nutrient's daily reference
pub fn percent_of_reference(nutrient: Nutrient, value: f64) -> f64 {
    value / nutrient.daily_reference() * 100.0
}

/// Six-bucket step function for calories, sugar, fat and sodium
pub fn negative_points(percent: f64) -> u32 {
    NEGATIVE_BUCKETS
        .iter()
        .find(|(upper, _)| percent <= *upper)
        .map(|(_, points)| *points)
        .unwrap_or(NEGATIVE_MAX)
}

/// Four-bucket step function for protein and fiber
pub fn positive_points(percent: f64) -> f64 {
    POSITIVE_BUCKETS
        .iter()
        .find(|(lower, _)| percent >= *lower)
        .map(|(_, points)| *points)
        .unwrap_or(0.0)
}

/// Negative and positive points for a profile
pub fn breakdown(profile: &NutrientProfile) -> ScoreBreakdown {
    let neg = |n: Nutrient| negative_points(percent_of_reference(n, profile.amount(n)));
    let pos = |n: Nutrient| positive_points(percent_of_reference(n, profile.amount(n)));

    let negative = NegativePoints {
        calories: neg(Nutrient::Calories),
        sugar: neg(Nutrient::Sugar),
        fat: neg(Nutrient::Fat),
        sodium: neg(Nutrient::Sodium),
        total: 0,
    };
    let negative = NegativePoints {
        total: negative.by_nutrient().iter().map(|(_, p)| p).sum(),
        ..negative
    };

    let protein = pos(Nutrient::Protein);
    let fiber = pos(Nutrient::Fiber);

    ScoreBreakdown {
        negative,
        positive: PositivePoints {
            protein,
            fiber,
            total: protein + fiber,
        },
    }
}

/// Final 0-100 score from a breakdown
pub fn final_score(breakdown: &ScoreBreakdown) -> u8 {
    let raw = 100.0 - breakdown.negative.total as f64 + breakdown.positive.total;
    raw.clamp(0.0, 100.0).round_ties_even() as u8
}

/// Score a nutrient profile. Total over every profile, including all-unknown.
pub fn score(profile: &NutrientProfile) -> ScoreBundle {
    let breakdown = breakdown(profile);
    let health_score = final_score(&breakdown);
    let verdict = Verdict::from_score(health_score);

    ScoreBundle {
        health_score,
        verdict,
        explanation: narrative::explain(profile, &breakdown),
        recommendation: narrative::recommend(verdict, profile),
        breakdown,
    }
}

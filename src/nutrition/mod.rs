//! Nutrient Model
//!
//! The six nutrient keys read from a label, their units, plausibility ranges
//! and the profile that carries one optional value per key.

pub mod extractor;
pub mod product_name;

pub use extractor::extract_nutrients;
pub use product_name::extract_product_name;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A nutrient tracked on the label
///
/// Order and keys are a stable contract for stored records and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Calories,
    Sugar,
    Fat,
    Sodium,
    Protein,
    Fiber,
}

impl Nutrient {
    /// All nutrients in contract order
    pub const ALL: [Nutrient; 6] = [
        Nutrient::Calories,
        Nutrient::Sugar,
        Nutrient::Fat,
        Nutrient::Sodium,
        Nutrient::Protein,
        Nutrient::Fiber,
    ];

    /// Storage and serialization key
    pub fn key(&self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Sugar => "sugar",
            Nutrient::Fat => "fat",
            Nutrient::Sodium => "sodium",
            Nutrient::Protein => "protein",
            Nutrient::Fiber => "fiber",
        }
    }

    /// Normalized unit for this nutrient
    pub fn unit(&self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            Nutrient::Sodium => "mg",
            _ => "g",
        }
    }

    /// Hard plausibility range (inclusive) in the normalized unit
    pub fn plausible_range(&self) -> (f64, f64) {
        match self {
            Nutrient::Calories => (0.0, 2000.0),
            Nutrient::Sugar | Nutrient::Fat | Nutrient::Protein => (0.0, 200.0),
            Nutrient::Fiber => (0.0, 100.0),
            Nutrient::Sodium => (0.0, 10000.0),
        }
    }

    /// Daily reference value in the normalized unit
    pub fn daily_reference(&self) -> f64 {
        match self {
            Nutrient::Calories => 2000.0,
            Nutrient::Sugar => 50.0,
            Nutrient::Fat => 65.0,
            Nutrient::Sodium => 2300.0,
            Nutrient::Protein => 50.0,
            Nutrient::Fiber => 28.0,
        }
    }

    /// Whether more of this nutrient improves the score
    pub fn is_beneficial(&self) -> bool {
        matches!(self, Nutrient::Protein | Nutrient::Fiber)
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Nutrient values read from a label; `None` means not found
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories: Option<f64>,
    pub sugar: Option<f64>,
    pub fat: Option<f64>,
    pub sodium: Option<f64>,
    pub protein: Option<f64>,
    pub fiber: Option<f64>,
}

impl NutrientProfile {
    /// Profile with every nutrient unknown
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Value for a nutrient
    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Sugar => self.sugar,
            Nutrient::Fat => self.fat,
            Nutrient::Sodium => self.sodium,
            Nutrient::Protein => self.protein,
            Nutrient::Fiber => self.fiber,
        }
    }

    /// Value for a nutrient, unknown counted as zero
    pub fn amount(&self, nutrient: Nutrient) -> f64 {
        self.get(nutrient).unwrap_or(0.0)
    }

    /// Replace the value for a nutrient
    pub fn set(&mut self, nutrient: Nutrient, value: Option<f64>) {
        let slot = match nutrient {
            Nutrient::Calories => &mut self.calories,
            Nutrient::Sugar => &mut self.sugar,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Sodium => &mut self.sodium,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fiber => &mut self.fiber,
        };
        *slot = value;
    }

    /// Iterate `(nutrient, value)` pairs in contract order
    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, Option<f64>)> + '_ {
        Nutrient::ALL.iter().map(move |n| (*n, self.get(*n)))
    }

    /// Number of nutrients with a known value
    pub fn known_count(&self) -> usize {
        self.iter().filter(|(_, v)| v.is_some()).count()
    }

    /// Bound every known value into its plausibility range
    pub fn clamped(mut self) -> Self {
        for nutrient in Nutrient::ALL {
            if let Some(value) = self.get(nutrient) {
                let (low, high) = nutrient.plausible_range();
                self.set(nutrient, Some(value.clamp(low, high)));
            }
        }
        self
    }

    /// Merge two passes: `self` wins where known, `fallback` fills the gaps
    pub fn merged_with(&self, fallback: &NutrientProfile) -> NutrientProfile {
        let mut merged = NutrientProfile::unknown();
        for nutrient in Nutrient::ALL {
            merged.set(nutrient, self.get(nutrient).or(fallback.get(nutrient)));
        }
        merged
    }
}

/// Format an amount the way it is shown in explanations and reports
///
/// Whole numbers keep one decimal place (`450.0`), everything else uses the
/// shortest representation that round-trips.
pub fn format_amount(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_profile_has_every_key() {
        let profile = NutrientProfile::unknown();
        assert_eq!(profile.iter().count(), 6);
        assert_eq!(profile.known_count(), 0);
        assert_eq!(profile.amount(Nutrient::Sodium), 0.0);
    }

    #[test]
    fn test_clamp_bounds_values() {
        let profile = NutrientProfile {
            calories: Some(3500.0),
            sugar: Some(-4.0),
            fiber: Some(140.0),
            sodium: Some(12000.0),
            ..Default::default()
        }
        .clamped();

        assert_eq!(profile.calories, Some(2000.0));
        assert_eq!(profile.sugar, Some(0.0));
        assert_eq!(profile.fiber, Some(100.0));
        assert_eq!(profile.sodium, Some(10000.0));
        assert_eq!(profile.fat, None);
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let once = NutrientProfile {
            calories: Some(9999.0),
            sugar: Some(12.5),
            fat: Some(250.0),
            sodium: Some(450.0),
            protein: None,
            fiber: Some(3.0),
        }
        .clamped();

        assert_eq!(once.clamped(), once);
    }

    #[test]
    fn test_merge_primary_wins_when_present() {
        let primary = NutrientProfile {
            calories: Some(200.0),
            sugar: None,
            ..Default::default()
        };
        let fallback = NutrientProfile {
            calories: Some(150.0),
            sugar: Some(10.0),
            ..Default::default()
        };

        let merged = primary.merged_with(&fallback);
        assert_eq!(merged.calories, Some(200.0));
        assert_eq!(merged.sugar, Some(10.0));
        assert_eq!(merged.fat, None);
    }

    #[test]
    fn test_nutrient_units() {
        assert_eq!(Nutrient::Calories.unit(), "kcal");
        assert_eq!(Nutrient::Sodium.unit(), "mg");
        assert_eq!(Nutrient::Fiber.unit(), "g");
        assert!(Nutrient::Protein.is_beneficial());
        assert!(!Nutrient::Sugar.is_beneficial());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(450.0), "450.0");
        assert_eq!(format_amount(12.5), "12.5");
        assert_eq!(format_amount(0.0), "0.0");
    }
}

//! Side-by-side comparison of saved analyses

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::nutrition::Nutrient;
use crate::storage::{AnalysisRecord, AnalysisStore};

/// Fewest records a comparison accepts
pub const MIN_COMPARED: usize = 2;

#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("need at least 2 products to compare, got {0}")]
    TooFew(usize),

    #[error("analyses not found: {0:?}")]
    Missing(Vec<i64>),

    #[error("failed to load analyses: {0:#}")]
    Storage(anyhow::Error),
}

/// How one record's nutrient value ranks against the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientStanding {
    /// Ties for the best value
    Best,
    /// Known but not the best
    Worse,
    /// Not read from the label
    Unknown,
}

/// One record with its comparison markers
#[derive(Debug, Clone, Serialize)]
pub struct ComparedProduct {
    #[serde(flatten)]
    pub record: AnalysisRecord,
    pub is_winner: bool,
    pub standings: BTreeMap<Nutrient, NutrientStanding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    /// Highest health score among the records
    pub best_score: u8,
    /// Best value per nutrient; unknown counts as 0 when ranking
    pub best_values: BTreeMap<Nutrient, f64>,
    pub products: Vec<ComparedProduct>,
}

impl Comparison {
    /// Records holding the highest score
    pub fn winners(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.products
            .iter()
            .filter(|p| p.is_winner)
            .map(|p| &p.record)
    }
}

/// Compare records: winners hold the top score, and per nutrient the lowest
/// value is best except for protein and fiber where the highest is best
pub fn compare(records: Vec<AnalysisRecord>) -> Result<Comparison, ComparisonError> {
    if records.len() < MIN_COMPARED {
        return Err(ComparisonError::TooFew(records.len()));
    }

    let best_score = records
        .iter()
        .map(|r| r.health_score)
        .max()
        .unwrap_or_default();

    let best_values: BTreeMap<Nutrient, f64> = Nutrient::ALL
        .iter()
        .map(|&nutrient| {
            let amounts = records.iter().map(|r| r.nutrients.amount(nutrient));
            let best = if nutrient.is_beneficial() {
                amounts.fold(f64::NEG_INFINITY, f64::max)
            } else {
                amounts.fold(f64::INFINITY, f64::min)
            };
            (nutrient, best)
        })
        .collect();

    let products = records
        .into_iter()
        .map(|record| {
            let standings = Nutrient::ALL
                .iter()
                .map(|&nutrient| {
                    let standing = match record.nutrients.get(nutrient) {
                        None => NutrientStanding::Unknown,
                        Some(value) if value == best_values[&nutrient] => NutrientStanding::Best,
                        Some(_) => NutrientStanding::Worse,
                    };
                    (nutrient, standing)
                })
                .collect();
            ComparedProduct {
                is_winner: record.health_score == best_score,
                record,
                standings,
            }
        })
        .collect();

    Ok(Comparison {
        best_score,
        best_values,
        products,
    })
}

/// Load the requested analyses and compare them
pub fn compare_ids(store: &dyn AnalysisStore, ids: &[i64]) -> Result<Comparison, ComparisonError> {
    let records = store.get_many(ids).map_err(ComparisonError::Storage)?;

    let missing: Vec<i64> = ids
        .iter()
        .copied()
        .filter(|id| !records.iter().any(|r| r.id == *id))
        .collect();
    if !missing.is_empty() {
        return Err(ComparisonError::Missing(missing));
    }

    compare(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::NutrientProfile;
    use crate::scoring::Verdict;
    use crate::storage::{Database, NewAnalysis};
    use chrono::Utc;

    fn new_analysis(name: &str, score: u8, nutrients: NutrientProfile) -> NewAnalysis {
        NewAnalysis {
            product_name: name.to_string(),
            image_path: format!("{}.png", name),
            nutrients,
            health_score: score,
            verdict: Verdict::from_score(score),
            explanation: String::new(),
            recommendation: String::new(),
            raw_ocr_text: String::new(),
            created_at: Utc::now(),
        }
    }

    fn record(id: i64, score: u8, nutrients: NutrientProfile) -> AnalysisRecord {
        AnalysisRecord::from_new(id, new_analysis(&format!("p{}", id), score, nutrients))
    }

    #[test]
    fn test_requires_two_records() {
        let result = compare(vec![record(1, 80, NutrientProfile::unknown())]);
        assert!(matches!(result, Err(ComparisonError::TooFew(1))));
    }

    #[test]
    fn test_winners_share_top_score() {
        let comparison = compare(vec![
            record(1, 80, NutrientProfile::unknown()),
            record(2, 65, NutrientProfile::unknown()),
            record(3, 80, NutrientProfile::unknown()),
        ])
        .unwrap();

        assert_eq!(comparison.best_score, 80);
        let winners: Vec<i64> = comparison.winners().map(|r| r.id).collect();
        assert_eq!(winners, vec![1, 3]);
    }

    #[test]
    fn test_best_nutrient_direction() {
        let lean = NutrientProfile {
            sugar: Some(4.0),
            protein: Some(12.0),
            ..NutrientProfile::unknown()
        };
        let sweet = NutrientProfile {
            sugar: Some(30.0),
            protein: Some(2.0),
            fiber: Some(3.0),
            ..NutrientProfile::unknown()
        };
        let comparison = compare(vec![record(1, 90, lean), record(2, 50, sweet)]).unwrap();

        assert_eq!(comparison.best_values[&Nutrient::Sugar], 4.0);
        assert_eq!(comparison.best_values[&Nutrient::Protein], 12.0);
        assert_eq!(comparison.best_values[&Nutrient::Fiber], 3.0);

        let first = &comparison.products[0].standings;
        let second = &comparison.products[1].standings;
        assert_eq!(first[&Nutrient::Sugar], NutrientStanding::Best);
        assert_eq!(second[&Nutrient::Sugar], NutrientStanding::Worse);
        assert_eq!(first[&Nutrient::Protein], NutrientStanding::Best);
        assert_eq!(first[&Nutrient::Fiber], NutrientStanding::Unknown);
        assert_eq!(second[&Nutrient::Fiber], NutrientStanding::Best);
    }

    #[test]
    fn test_unknown_counts_as_zero_but_is_never_best() {
        let known = NutrientProfile {
            fat: Some(5.0),
            ..NutrientProfile::unknown()
        };
        let comparison =
            compare(vec![record(1, 70, known), record(2, 70, NutrientProfile::unknown())]).unwrap();

        assert_eq!(comparison.best_values[&Nutrient::Fat], 0.0);
        assert_eq!(comparison.products[0].standings[&Nutrient::Fat], NutrientStanding::Worse);
        assert_eq!(comparison.products[1].standings[&Nutrient::Fat], NutrientStanding::Unknown);
    }

    #[test]
    fn test_json_keys_follow_nutrient_order() {
        let comparison = compare(vec![
            record(1, 70, NutrientProfile::unknown()),
            record(2, 60, NutrientProfile::unknown()),
        ])
        .unwrap();

        let json = serde_json::to_string(&comparison).unwrap();
        let positions: Vec<usize> = Nutrient::ALL
            .iter()
            .map(|n| json.find(&format!("\"{}\":", n.key())).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_compare_ids_reports_missing() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .insert(&new_analysis("oats", 75, NutrientProfile::unknown()))
            .unwrap();

        match compare_ids(&db, &[id, 404]) {
            Err(ComparisonError::Missing(missing)) => assert_eq!(missing, vec![404]),
            other => panic!("expected missing ids, got {:?}", other.map(|c| c.best_score)),
        }
    }

    #[test]
    fn test_compare_ids() {
        let db = Database::open_in_memory().unwrap();
        let a = db
            .insert(&new_analysis("a", 60, NutrientProfile::unknown()))
            .unwrap();
        let b = db
            .insert(&new_analysis("b", 85, NutrientProfile::unknown()))
            .unwrap();

        let comparison = compare_ids(&db, &[a, b]).unwrap();
        let winners: Vec<&str> = comparison
            .winners()
            .map(|r| r.product_name.as_str())
            .collect();
        assert_eq!(winners, vec!["b"]);
    }
}

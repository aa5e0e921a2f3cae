//! Explanation and recommendation text
//!
//! Both texts come from fixed rule tables evaluated in order, so the same
//! profile always produces the same sentences in the same order.

use super::{percent_of_reference, ScoreBreakdown, Verdict};
use crate::nutrition::{format_amount, Nutrient, NutrientProfile};

/// A sentence emitted for one scored nutrient when `applies(points)` holds
struct SentenceRule {
    applies: fn(f64) -> bool,
    render: fn(Nutrient, &NutrientProfile) -> String,
}

/// Checked per negative contributor; the first matching rule wins
const NEGATIVE_RULES: [SentenceRule; 2] = [
    SentenceRule {
        applies: is_high_contribution,
        render: high_sentence,
    },
    SentenceRule {
        applies: is_moderate_contribution,
        render: moderate_sentence,
    },
];

const POSITIVE_RULES: [SentenceRule; 1] = [SentenceRule {
    applies: is_good_contribution,
    render: good_sentence,
}];

const FALLBACK_EXPLANATION: &str = "Nutrient levels are within acceptable ranges.";

fn is_high_contribution(points: f64) -> bool {
    points >= 6.0
}

fn is_moderate_contribution(points: f64) -> bool {
    points >= 4.0
}

fn is_good_contribution(points: f64) -> bool {
    points >= 5.0
}

fn high_sentence(nutrient: Nutrient, profile: &NutrientProfile) -> String {
    let value = profile.amount(nutrient);
    let percent = percent_of_reference(nutrient, value).round_ties_even();
    format!(
        "High {} ({}{}, {}% of daily value) negatively impacts the health score.",
        nutrient,
        format_amount(value),
        nutrient.unit(),
        percent
    )
}

fn moderate_sentence(nutrient: Nutrient, profile: &NutrientProfile) -> String {
    format!(
        "Moderate {} level ({}{}) contributes to a lower score.",
        nutrient,
        format_amount(profile.amount(nutrient)),
        nutrient.unit()
    )
}

fn good_sentence(nutrient: Nutrient, profile: &NutrientProfile) -> String {
    format!(
        "Good {} content ({}{}) positively contributes to the score.",
        nutrient,
        format_amount(profile.amount(nutrient)),
        nutrient.unit()
    )
}

fn first_sentence(
    rules: &[SentenceRule],
    nutrient: Nutrient,
    points: f64,
    profile: &NutrientProfile,
) -> Option<String> {
    rules
        .iter()
        .find(|rule| (rule.applies)(points))
        .map(|rule| (rule.render)(nutrient, profile))
}

/// Explain the score: negatives ranked by severity, then positives
pub fn explain(profile: &NutrientProfile, breakdown: &ScoreBreakdown) -> String {
    let mut ranked = breakdown.negative.by_nutrient();
    // Stable: ties keep calories, sugar, fat, sodium order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let negatives = ranked.iter().filter_map(|(n, points)| {
        first_sentence(&NEGATIVE_RULES, *n, *points as f64, profile)
    });
    let positives = breakdown
        .positive
        .by_nutrient()
        .into_iter()
        .filter_map(|(n, points)| first_sentence(&POSITIVE_RULES, n, points, profile));

    let parts: Vec<String> = negatives.chain(positives).collect();
    if parts.is_empty() {
        FALLBACK_EXPLANATION.to_string()
    } else {
        parts.join(" ")
    }
}

/// A fixed advisory appended when `applies(profile)` holds
struct Advisory {
    applies: fn(&NutrientProfile) -> bool,
    text: &'static str,
}

/// Checked in order, independent of the verdict
const ADVISORIES: [Advisory; 5] = [
    Advisory {
        applies: is_sugar_high,
        text: "Consider lower-sugar alternatives to reduce added sugar intake.",
    },
    Advisory {
        applies: is_sodium_high,
        text: "High sodium content — watch your total daily sodium intake.",
    },
    Advisory {
        applies: is_fat_high,
        text: "Significant fat content — balance with lower-fat meals.",
    },
    Advisory {
        applies: is_protein_low,
        text: "Low in protein — pair with protein-rich foods.",
    },
    Advisory {
        applies: is_fiber_low,
        text: "Low in fiber — consider adding whole grains, fruits, or vegetables.",
    },
];

/// Share of the daily reference above which a limiting nutrient is flagged
const HIGH_SHARE: f64 = 0.25;
/// Share of the daily reference below which a beneficial nutrient is flagged
const LOW_SHARE: f64 = 0.05;

fn exceeds_share(profile: &NutrientProfile, nutrient: Nutrient) -> bool {
    profile.amount(nutrient) > nutrient.daily_reference() * HIGH_SHARE
}

/// Unknown values are not reported as low
fn below_share(profile: &NutrientProfile, nutrient: Nutrient) -> bool {
    profile
        .get(nutrient)
        .is_some_and(|value| value < nutrient.daily_reference() * LOW_SHARE)
}

fn is_sugar_high(profile: &NutrientProfile) -> bool {
    exceeds_share(profile, Nutrient::Sugar)
}

fn is_sodium_high(profile: &NutrientProfile) -> bool {
    exceeds_share(profile, Nutrient::Sodium)
}

fn is_fat_high(profile: &NutrientProfile) -> bool {
    exceeds_share(profile, Nutrient::Fat)
}

fn is_protein_low(profile: &NutrientProfile) -> bool {
    below_share(profile, Nutrient::Protein)
}

fn is_fiber_low(profile: &NutrientProfile) -> bool {
    below_share(profile, Nutrient::Fiber)
}

fn opening(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Healthy => {
            "This product has a balanced nutritional profile and can be part of a healthy diet."
        }
        Verdict::Moderate => {
            "This product is acceptable in moderate quantities as part of a balanced diet."
        }
        Verdict::Limit => {
            "This product should be consumed sparingly due to its nutritional profile."
        }
    }
}

/// Verdict opening followed by every advisory that applies
pub fn recommend(verdict: Verdict, profile: &NutrientProfile) -> String {
    std::iter::once(opening(verdict))
        .chain(
            ADVISORIES
                .iter()
                .filter(|advisory| (advisory.applies)(profile))
                .map(|advisory| advisory.text),
        )
        .collect::<Vec<_>>()
        .join(" ")
}

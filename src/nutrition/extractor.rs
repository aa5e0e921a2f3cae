//! Nutrient extraction from OCR text
//!
//! Turns a noisy OCR transcription into a [`NutrientProfile`]. The text is
//! lowercased and glyph-corrected, each nutrient is read with an ordered list
//! of patterns (first match wins), then units are normalized and values are
//! clamped into plausible ranges.
//!
//! Glyph correction runs in two phases: `o` becomes `0` everywhere so numbers
//! like `2O0` parse, then a fixed patch list restores the label words that
//! substitution breaks. Words outside the patch list stay corrupted
//! (`nutriti0n`, `carb0hydrate`, `kil0j0ule`); patterns are written against
//! the corrected text with that in mind.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::{Nutrient, NutrientProfile};

/// Single-character OCR confusions, applied in order after lowercasing
const GLYPH_FIXES: [(char, char); 3] = [('|', 'l'), ('O', '0'), ('o', '0')];

/// Words restored after the global `o` -> `0` pass
const TOKEN_REPAIRS: [(&str, &str); 4] = [
    ("s0dium", "sodium"),
    ("pr0tein", "protein"),
    ("cal0ries", "calories"),
    ("t0tal", "total"),
];

/// kJ -> kcal
const KJ_TO_KCAL: f64 = 0.239006;

/// Sodium readings below this are assumed to be grams when a gram unit is shown
const SODIUM_GRAM_THRESHOLD: f64 = 10.0;

/// Ordered patterns for one nutrient; label-first forms precede value-first forms
struct NutrientRule {
    nutrient: Nutrient,
    patterns: Vec<Regex>,
}

impl NutrientRule {
    fn new(nutrient: Nutrient, patterns: &[&str]) -> Self {
        Self {
            nutrient,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("nutrient pattern must compile"))
                .collect(),
        }
    }

    /// Walk the patterns in priority order and stop at the first usable value
    fn apply(&self, text: &str) -> Option<f64> {
        for (index, pattern) in self.patterns.iter().enumerate() {
            match capture_value(pattern, text) {
                Capture::Found(value) => {
                    trace!("{} matched pattern #{}: {}", self.nutrient, index, value);
                    return Some(value);
                }
                Capture::Unparsable(raw) => {
                    trace!("{} pattern #{} captured non-numeric '{}'", self.nutrient, index, raw);
                }
                Capture::NotFound => {}
            }
        }
        None
    }
}

/// Outcome of a single pattern against the text
enum Capture<'t> {
    Found(f64),
    Unparsable(&'t str),
    NotFound,
}

fn capture_value<'t>(pattern: &Regex, text: &'t str) -> Capture<'t> {
    let Some(caps) = pattern.captures(text) else {
        return Capture::NotFound;
    };
    let Some(group) = caps.iter().skip(1).flatten().next() else {
        return Capture::NotFound;
    };
    match ascii_digits(group.as_str()).and_then(|raw| raw.parse::<f64>().ok()) {
        Some(value) => Capture::Found(value),
        None => Capture::Unparsable(group.as_str()),
    }
}

static DECIMAL_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Nd}$").expect("decimal digit pattern must compile"));

fn is_decimal_digit(c: char) -> bool {
    c.is_ascii_digit() || DECIMAL_DIGIT.is_match(c.encode_utf8(&mut [0u8; 4]))
}

/// Value of a Unicode decimal digit (`٢` -> 2, `１` -> 1)
///
/// Decimal digits are assigned in contiguous runs of ten starting at zero, so
/// the value is the offset from the start of the run modulo ten.
fn decimal_digit_value(c: char) -> Option<u32> {
    if c.is_ascii_digit() {
        return c.to_digit(10);
    }
    if !is_decimal_digit(c) {
        return None;
    }

    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    Some((c as u32 - start) % 10)
}

/// Rewrite a captured number with ASCII digits
fn ascii_digits(raw: &str) -> Option<String> {
    raw.chars()
        .map(|c| match c {
            '.' => Some('.'),
            _ => decimal_digit_value(c).and_then(|d| char::from_digit(d, 10)),
        })
        .collect()
}

static NUTRIENT_RULES: Lazy<Vec<NutrientRule>> = Lazy::new(|| {
    vec![
        NutrientRule::new(
            Nutrient::Calories,
            &[
                r"(?:calories|energy|cal|kcal|kilocal)[:\s]*(\d+\.?\d*)",
                r"(\d+\.?\d*)\s*(?:kcal|cal|calories)",
                r"(?:energy)\s*[:=]?\s*(\d+\.?\d*)\s*(?:kcal)?",
            ],
        ),
        NutrientRule::new(
            Nutrient::Sugar,
            &[
                r"(?:sugar|sugars|total sugar|total sugars)[:\s]*(\d+\.?\d*)\s*(?:g|gm|grams)?",
                r"(\d+\.?\d*)\s*(?:g|gm)\s*(?:sugar|sugars)",
            ],
        ),
        NutrientRule::new(
            Nutrient::Fat,
            &[
                r"(?:total fat|fat|fats)[:\s]*(\d+\.?\d*)\s*(?:g|gm|grams)?",
                r"(\d+\.?\d*)\s*(?:g|gm)\s*(?:fat|fats)",
            ],
        ),
        NutrientRule::new(
            Nutrient::Sodium,
            &[
                r"(?:sodium|salt|na)[:\s]*(\d+\.?\d*)\s*(?:mg|g|gm)?",
                r"(\d+\.?\d*)\s*(?:mg|g)\s*(?:sodium|salt)",
            ],
        ),
        NutrientRule::new(
            Nutrient::Protein,
            &[
                r"(?:protein|proteins)[:\s]*(\d+\.?\d*)\s*(?:g|gm|grams)?",
                r"(\d+\.?\d*)\s*(?:g|gm)\s*(?:protein|proteins)",
            ],
        ),
        NutrientRule::new(
            Nutrient::Fiber,
            &[
                r"(?:dietary fiber|fibre|fiber|fibres)[:\s]*(\d+\.?\d*)\s*(?:g|gm|grams)?",
                r"(\d+\.?\d*)\s*(?:g|gm)\s*(?:fiber|fibre|dietary fiber)",
            ],
        ),
    ]
});

static KILOJOULE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"kj|kilojoule").expect("kilojoule pattern must compile"));

static SODIUM_IN_GRAMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:sodium|salt)[:\s]*[\d.]+\s*g(?:m|rams)?")
        .expect("sodium unit pattern must compile")
});

/// Lowercase the text and apply the two-phase glyph correction
pub fn normalize_text(text: &str) -> String {
    let mut normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            GLYPH_FIXES
                .iter()
                .fold(c, |c, (from, to)| if c == *from { *to } else { c })
        })
        .collect();

    for (broken, word) in TOKEN_REPAIRS {
        if normalized.contains(broken) {
            normalized = normalized.replace(broken, word);
        }
    }

    normalized
}

/// Extract a nutrient profile from one OCR full-text transcription
///
/// Never fails: nutrients that cannot be read are left unknown.
pub fn extract_nutrients(text: &str) -> NutrientProfile {
    let normalized = normalize_text(text);

    let mut profile = NutrientProfile::unknown();
    for rule in NUTRIENT_RULES.iter() {
        profile.set(rule.nutrient, rule.apply(&normalized));
    }

    normalize_units(&mut profile, &normalized);
    profile.clamped()
}

/// Convert kJ to kcal and gram-reported sodium to mg
fn normalize_units(profile: &mut NutrientProfile, text: &str) {
    if let Some(calories) = profile.calories {
        if KILOJOULE_MARKER.is_match(text) {
            profile.calories = Some(calories * KJ_TO_KCAL);
        }
    }

    if let Some(sodium) = profile.sodium {
        if sodium < SODIUM_GRAM_THRESHOLD && SODIUM_IN_GRAMS.is_match(text) {
            profile.sodium = Some(sodium * 1000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const US_LABEL: &str = "Nutrition Facts\n\
        Serving Size 1 bar (40g)\n\
        Calories 250\n\
        Total Fat 9g\n\
        Sodium 450mg\n\
        Total Sugars 12g\n\
        Dietary Fiber 2g\n\
        Protein 4g";

    #[test]
    fn test_empty_text_is_all_unknown() {
        let profile = extract_nutrients("");
        assert_eq!(profile, NutrientProfile::unknown());
    }

    #[test]
    fn test_noise_does_not_panic() {
        let profile = extract_nutrients("%%% ||| \n\t ??? 0O0o ... ٣٤");
        assert_eq!(profile.protein, None);
        assert_eq!(profile.fiber, None);
    }

    #[test]
    fn test_extract_us_label() {
        let profile = extract_nutrients(US_LABEL);
        assert_eq!(profile.calories, Some(250.0));
        assert_eq!(profile.fat, Some(9.0));
        assert_eq!(profile.sodium, Some(450.0));
        assert_eq!(profile.sugar, Some(12.0));
        assert_eq!(profile.fiber, Some(2.0));
        assert_eq!(profile.protein, Some(4.0));
    }

    #[test]
    fn test_normalize_text_corrupts_then_repairs() {
        let normalized = normalize_text("SODIUM | Protein | Calories | Total | Nutrition");
        assert_eq!(normalized, "sodium l protein l calories l total l nutriti0n");
    }

    #[test]
    fn test_letter_o_in_numbers_is_read_as_zero() {
        let profile = extract_nutrients("Calories 2O0\nProtein 1o g");
        assert_eq!(profile.calories, Some(200.0));
        assert_eq!(profile.protein, Some(10.0));
    }

    #[test]
    fn test_value_before_label() {
        assert_eq!(extract_nutrients("12g sugar").sugar, Some(12.0));
        assert_eq!(extract_nutrients("3 g fiber").fiber, Some(3.0));
        assert_eq!(extract_nutrients("5gm protein").protein, Some(5.0));
    }

    #[test]
    fn test_kilojoules_are_converted() {
        let profile = extract_nutrients("Energy 1000kJ");
        let calories = profile.calories.unwrap();
        assert!((calories - 239.006).abs() < 1e-9);
    }

    #[test]
    fn test_sodium_in_grams_is_converted() {
        let profile = extract_nutrients("sodium: 0.4g");
        assert!((profile.sodium.unwrap() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_salt_in_grams_is_converted() {
        let profile = extract_nutrients("Salt 1.2 g");
        assert!((profile.sodium.unwrap() - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_sodium_in_milligrams_is_kept() {
        let profile = extract_nutrients("Sodium 5mg");
        assert_eq!(profile.sodium, Some(5.0));
    }

    #[test]
    fn test_implausible_values_are_clamped() {
        let profile = extract_nutrients("Calories 5400\nFiber 300g\nSodium 25000mg");
        assert_eq!(profile.calories, Some(2000.0));
        assert_eq!(profile.fiber, Some(100.0));
        assert_eq!(profile.sodium, Some(10000.0));
    }

    #[test]
    fn test_non_ascii_digits_are_read() {
        let profile = extract_nutrients("calories ٢٥٠\nserving 180 kcal");
        assert_eq!(profile.calories, Some(250.0));

        let profile = extract_nutrients("Protein １２g\nFiber ३.५g");
        assert_eq!(profile.protein, Some(12.0));
        assert_eq!(profile.fiber, Some(3.5));
    }

    #[test]
    fn test_decimal_digit_values() {
        assert_eq!(decimal_digit_value('7'), Some(7));
        assert_eq!(decimal_digit_value('٠'), Some(0));
        assert_eq!(decimal_digit_value('٩'), Some(9));
        assert_eq!(decimal_digit_value('５'), Some(5));
        // Mathematical digits are several adjacent runs of ten
        assert_eq!(decimal_digit_value('\u{1D7D9}'), Some(1));
        assert_eq!(decimal_digit_value('x'), None);
        assert_eq!(decimal_digit_value('½'), None);
    }

    #[test]
    fn test_sodium_at_or_above_gram_threshold_is_kept() {
        assert_eq!(extract_nutrients("Sodium 12g").sodium, Some(12.0));
        assert_eq!(extract_nutrients("Sodium 10g").sodium, Some(10.0));
        let below = extract_nutrients("Sodium 9.9g").sodium.unwrap();
        assert!((below - 9900.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_pattern_wins() {
        // Label-first form is preferred over an earlier value-first form
        let profile = extract_nutrients("90 kcal per bar\ncalories 120");
        assert_eq!(profile.calories, Some(120.0));
    }
}

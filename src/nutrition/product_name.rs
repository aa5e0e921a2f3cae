//! Product name heuristic
//!
//! Picks the first OCR line that looks like a title rather than a nutrient
//! row. Best effort only.

/// Name used when no line qualifies
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Shortest trimmed line considered
const MIN_NAME_LEN: usize = 3;

/// Label vocabulary that disqualifies a line when any whole word matches
const LABEL_VOCABULARY: &[&str] = &[
    "calories",
    "sugar",
    "fat",
    "sodium",
    "protein",
    "fiber",
    "nutrition",
    "facts",
    "amount",
    "serving",
    "daily",
    "value",
    "total",
    "percent",
    "ingredients",
    "contains",
    "allergen",
    "carbohydrate",
    "cholesterol",
    "vitamin",
    "mineral",
    "energy",
];

/// Guess the product name from per-line OCR detections
pub fn extract_product_name<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .find(|line| is_title_candidate(line))
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string())
}

fn is_title_candidate(line: &str) -> bool {
    let len = line.chars().count();
    if len < MIN_NAME_LEN {
        return false;
    }

    let lowered = line.to_lowercase();
    if lowered
        .split_whitespace()
        .any(|word| LABEL_VOCABULARY.contains(&word))
    {
        return false;
    }

    let digits = line.chars().filter(|c| c.is_numeric()).count();
    digits * 2 <= len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_label_heading() {
        let lines = ["Nutrition Facts", "Crunchy Oats Bar", "Calories 200"];
        assert_eq!(extract_product_name(&lines), "Crunchy Oats Bar");
    }

    #[test]
    fn test_defaults_when_nothing_qualifies() {
        let lines = ["Nutrition Facts", "ab", "1234 56", "Total Fat 9g"];
        assert_eq!(extract_product_name(&lines), UNKNOWN_PRODUCT);
        assert_eq!(extract_product_name::<&str>(&[]), UNKNOWN_PRODUCT);
    }

    #[test]
    fn test_trims_but_keeps_case() {
        let lines = vec!["  ".to_string(), "   Granola CLUSTERS  ".to_string()];
        assert_eq!(extract_product_name(&lines), "Granola CLUSTERS");
    }

    #[test]
    fn test_whole_words_only() {
        // "Fatboy" is not the word "fat"
        let lines = ["Fatboy Crisps"];
        assert_eq!(extract_product_name(&lines), "Fatboy Crisps");
    }

    #[test]
    fn test_numeric_dominated_line_is_skipped() {
        let lines = ["250 100%", "Oat Bar 2"];
        assert_eq!(extract_product_name(&lines), "Oat Bar 2");
    }

    #[test]
    fn test_non_ascii_digits_count_as_digits() {
        let lines = ["٢٥٠ ٢٥٠ ٢٥٠", "１２３４ g", "Oat Bar"];
        assert_eq!(extract_product_name(&lines), "Oat Bar");
    }

    #[test]
    fn test_exactly_half_digits_is_kept() {
        assert_eq!(extract_product_name(&["ab12"]), "ab12");
    }
}

//! Numeric fact extraction
//!
//! Pulls phone numbers, ISO dates, decimals, percentages and plain integers
//! out of free text. Every match contributes two entries to the resulting
//! [`FactSet`]: the raw substring and its normalized form (comma decimal
//! separator rewritten to a dot, whitespace runs collapsed).
//!
//! The pattern classes overlap on purpose: `12,5%` yields entries from the
//! decimal class and from the integer class (`12`, `5`). All of them are kept.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered set of fact strings (raw and normalized forms, discovery order)
pub type FactSet = IndexSet<String>;

/// Pattern classes, applied in this order.
static FACT_PATTERNS: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        // Phone-like: +46 8 123 45 67
        compile(r"\+[0-9]+\s+[0-9]+\s+[0-9]+\s+[0-9]+\s+[0-9]+"),
        // ISO date
        compile(r"[0-9]{4}-[0-9]{2}-[0-9]{2}"),
        // Decimal with either separator, optional percent sign
        compile(r"[0-9]+[.,][0-9]+%?"),
        // Percentage
        compile(r"[0-9]+%"),
        // Plain integer
        compile(r"[0-9]+"),
    ]
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => unreachable!("static fact pattern {pattern:?} failed to compile: {e}"),
    }
}

/// A single numeric span found in text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericFact {
    /// Substring exactly as it appeared
    pub raw: String,
    /// Comma-to-dot, whitespace-collapsed, trimmed form
    pub normalized: String,
}

impl NumericFact {
    /// Build a fact from a raw match
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            normalized: normalize_fact(raw),
        }
    }

    /// Numeric value of the normalized form, if it has one
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        numeric_value(&self.normalized)
    }
}

/// Normalize a fact string: `,` becomes `.`, whitespace runs become one space,
/// surrounding whitespace is dropped.
#[must_use]
pub fn normalize_fact(raw: &str) -> String {
    let dotted = raw.replace(',', ".");
    WHITESPACE_RUN.replace_all(&dotted, " ").trim().to_string()
}

/// Extract every numeric span, in pattern-class order.
///
/// Spans from different classes may overlap; duplicates are not removed here.
#[must_use]
pub fn extract_numeric_facts(text: &str) -> Vec<NumericFact> {
    FACT_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| NumericFact::from_raw(m.as_str()))
        .collect()
}

/// Extract the fact set of `text` (raw and normalized forms).
///
/// Never fails; text without digits yields an empty set.
#[must_use]
pub fn extract_facts(text: &str) -> FactSet {
    let mut facts = FactSet::new();
    for fact in extract_numeric_facts(text) {
        facts.insert(fact.normalized);
        facts.insert(fact.raw);
    }
    facts
}

/// Decimal value of a fact string.
///
/// Every character other than an ASCII digit or `.` is discarded, then the
/// longest leading decimal literal is parsed (`1.2.3` reads as `1.2`).
/// Returns `None` when no digits survive.
#[must_use]
pub fn numeric_value(fact: &str) -> Option<f64> {
    let stripped: String = fact
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let bytes = stripped.as_bytes();
    let mut end = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let int_digits = end;
    let mut frac_digits = 0;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut cursor = end + 1;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        frac_digits = cursor - end - 1;
        if frac_digits > 0 {
            end = cursor;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    stripped[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_integer() {
        let facts = extract_facts("Priset är 99 kr");
        assert!(facts.contains("99"));
    }

    #[test]
    fn extracts_decimal_in_both_forms() {
        let facts = extract_facts("Värdet är 12,5");
        assert!(facts.contains("12,5"));
        assert!(facts.contains("12.5"));
        // integer class overlaps
        assert!(facts.contains("12"));
        assert!(facts.contains("5"));
    }

    #[test]
    fn extracts_percentage() {
        let facts = extract_facts("Rabatt på 20%");
        assert!(facts.contains("20%"));
        assert!(facts.contains("20"));
    }

    #[test]
    fn extracts_phone_number() {
        let facts = extract_facts("Ring +46  8 123 45 67 idag");
        assert!(facts.contains("+46  8 123 45 67"));
        assert!(facts.contains("+46 8 123 45 67"));
    }

    #[test]
    fn extracts_iso_date() {
        let facts = extract_facts("Gäller från 2024-01-15.");
        assert!(facts.contains("2024-01-15"));
        assert!(facts.contains("2024"));
    }

    #[test]
    fn no_digits_yields_empty_set() {
        assert!(extract_facts("Vi har flera planer").is_empty());
        assert!(extract_facts("").is_empty());
    }

    #[test]
    fn numeric_value_strips_noise() {
        assert_eq!(numeric_value("12.5%"), Some(12.5));
        assert_eq!(numeric_value("+46 8 123 45 67"), Some(4_681_234_567.0));
        assert_eq!(numeric_value("2024-01-15"), Some(20_240_115.0));
        assert_eq!(numeric_value("1.2.3"), Some(1.2));
        assert_eq!(numeric_value(".5"), Some(0.5));
        assert_eq!(numeric_value("5."), Some(5.0));
        assert_eq!(numeric_value("."), None);
        assert_eq!(numeric_value("kr"), None);
    }

    #[test]
    fn normalization_collapses_whitespace() {
        assert_eq!(normalize_fact(" 12,5 "), "12.5");
        assert_eq!(normalize_fact("+46\t8  123"), "+46 8 123");
    }

    proptest! {
        #[test]
        fn phone_groups_yield_raw_and_normalized(
            groups in proptest::collection::vec(1u32..999, 5),
            sep in "[ ]{1,3}",
        ) {
            let raw = format!(
                "+{}",
                groups.iter().map(u32::to_string).collect::<Vec<_>>().join(sep.as_str())
            );
            let text = format!("Ring {raw} nu");
            let facts = extract_facts(&text);
            prop_assert!(facts.contains(&raw));
            prop_assert!(facts.contains(&normalize_fact(&raw)));
        }

        #[test]
        fn every_fact_contains_a_digit(text in "\\PC{0,64}") {
            for fact in extract_facts(&text) {
                prop_assert!(fact.chars().any(|c| c.is_ascii_digit()));
            }
        }

        #[test]
        fn integers_are_always_found(n in 0u64..1_000_000_000) {
            let facts = extract_facts(&format!("kostar {n} kr"));
            prop_assert!(facts.contains(&n.to_string()));
        }
    }
}

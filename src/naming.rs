//! Element naming: the mapping between (item position, field) and the
//! `"<Prefix> <N> - <Field>"` names the backend stores.
//!
//! Matching is anchored on the prefix and requires the number to be a
//! whole integer token, so "FAQ 1" never matches inside "FAQ 10" and a
//! prefix never matches inside a longer word ("FAQs 1").

use regex::Regex;

/// Result of parsing an element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// 1-based item index
    pub index: usize,

    /// Text after the " - " separator, usually the field label
    pub remainder: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ElementNamingScheme {
    prefix: String,
    pattern: Regex,
}

impl ElementNamingScheme {
    pub fn new(prefix: &str) -> Self {
        let pattern = format!(
            r"(?i)^\s*{}\s+(\d+)(?:\s*-\s*(.*?))?\s*$",
            regex::escape(prefix.trim())
        );
        Self {
            prefix: prefix.trim().to_string(),
            pattern: Regex::new(&pattern).expect("escaped prefix always forms a valid pattern"),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name for a 1-based item index and field label.
    ///
    /// `name_for(3, "Answer")` on an "FAQ" scheme is `"FAQ 3 - Answer"`.
    pub fn name_for(&self, index1: usize, field: &str) -> String {
        format!("{} {} - {}", self.prefix, index1, field)
    }

    /// Parse an element name belonging to this scheme.
    ///
    /// # Returns
    /// * `None` if the name does not start with the prefix followed by a
    ///   positive integer token (e.g. a one-off "Section Title" element)
    pub fn parse(&self, name: &str) -> Option<ParsedName> {
        let caps = self.pattern.captures(name)?;
        let index: usize = caps.get(1)?.as_str().parse().ok()?;
        if index == 0 {
            return None;
        }
        let remainder = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        Some(ParsedName { index, remainder })
    }
}

/// Dense backend order of a field, keeping each item's fields contiguous.
pub fn order_for(index0: usize, field_position: usize, fields_per_item: usize) -> i64 {
    (index0 * fields_per_item + field_position) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ==================== name_for Tests ====================

    #[test]
    fn test_name_for() {
        let scheme = ElementNamingScheme::new("FAQ");
        assert_eq!(scheme.name_for(3, "Answer"), "FAQ 3 - Answer");
        assert_eq!(scheme.name_for(1, "Question"), "FAQ 1 - Question");
    }

    #[test]
    fn test_prefix_is_trimmed() {
        let scheme = ElementNamingScheme::new("  Step ");
        assert_eq!(scheme.prefix(), "Step");
        assert_eq!(scheme.name_for(2, "Icon"), "Step 2 - Icon");
    }

    // ==================== parse Tests ====================

    #[test]
    fn test_parse_field_name() {
        let scheme = ElementNamingScheme::new("FAQ");
        let parsed = scheme.parse("FAQ 3 - Answer").unwrap();
        assert_eq!(parsed.index, 3);
        assert_eq!(parsed.remainder.as_deref(), Some("Answer"));
    }

    #[test]
    fn test_parse_multi_digit_index() {
        let scheme = ElementNamingScheme::new("FAQ");
        assert_eq!(scheme.parse("FAQ 10 - Question").unwrap().index, 10);
        assert_eq!(scheme.parse("FAQ 104").unwrap().index, 104);
    }

    #[test]
    fn test_parse_rejects_partial_integer_tokens() {
        let scheme = ElementNamingScheme::new("FAQ");
        assert!(scheme.parse("FAQ 1x - Question").is_none());
        assert!(scheme.parse("FAQ 1.5 - Question").is_none());
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        let scheme = ElementNamingScheme::new("FAQ");
        assert!(scheme.parse("Section Title").is_none());
        assert!(scheme.parse("FAQs 1 - Question").is_none());
        assert!(scheme.parse("Old FAQ 1 - Question").is_none());
        assert!(scheme.parse("Benefit 1 - Title").is_none());
        assert!(scheme.parse("FAQ - Question").is_none());
    }

    #[test]
    fn test_parse_rejects_zero_index() {
        let scheme = ElementNamingScheme::new("FAQ");
        assert!(scheme.parse("FAQ 0 - Question").is_none());
    }

    #[test]
    fn test_parse_tolerates_spacing_and_case() {
        let scheme = ElementNamingScheme::new("FAQ");
        let parsed = scheme.parse("faq 2-Answer ").unwrap();
        assert_eq!(parsed.index, 2);
        assert_eq!(parsed.remainder.as_deref(), Some("Answer"));
    }

    #[test]
    fn test_parse_multi_word_prefix() {
        let scheme = ElementNamingScheme::new("Team Nav");
        let parsed = scheme.parse("Team Nav 4 - Url").unwrap();
        assert_eq!(parsed.index, 4);
        assert!(scheme.parse("Team 4 - Url").is_none());
    }

    #[test]
    fn test_parse_prefix_with_regex_metacharacters() {
        let scheme = ElementNamingScheme::new("Q+A");
        assert_eq!(scheme.parse("Q+A 2 - Answer").unwrap().index, 2);
        assert!(scheme.parse("QQA 2 - Answer").is_none());
    }

    #[test]
    fn test_parse_without_remainder() {
        let scheme = ElementNamingScheme::new("Step");
        let parsed = scheme.parse("Step 7").unwrap();
        assert_eq!(parsed.index, 7);
        assert!(parsed.remainder.is_none());
    }

    // ==================== order_for Tests ====================

    #[test]
    fn test_order_for_two_field_groups() {
        let orders: Vec<i64> = (0..3)
            .flat_map(|i| (0..2).map(move |f| order_for(i, f, 2)))
            .collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_order_for_three_field_groups() {
        assert_eq!(order_for(0, 2, 3), 2);
        assert_eq!(order_for(2, 0, 3), 6);
    }

    // ==================== Property Tests ====================

    proptest! {
        #[test]
        fn prop_name_round_trips(
            prefix in "[A-Za-z]([A-Za-z ]{0,10}[A-Za-z])?",
            index in 1usize..100_000,
            field in "[A-Za-z]([A-Za-z ]{0,12}[A-Za-z])?",
        ) {
            let scheme = ElementNamingScheme::new(&prefix);
            let parsed = scheme.parse(&scheme.name_for(index, &field));
            prop_assert!(parsed.is_some());
            let parsed = parsed.unwrap();
            prop_assert_eq!(parsed.index, index);
            prop_assert_eq!(parsed.remainder, Some(field.clone()));
        }

        #[test]
        fn prop_orders_are_unique(
            a in 0usize..50, fa in 0usize..3,
            b in 0usize..50, fb in 0usize..3,
        ) {
            prop_assume!((a, fa) != (b, fb));
            prop_assert_ne!(order_for(a, fa, 3), order_for(b, fb, 3));
        }
    }
}

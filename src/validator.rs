//! Pre-save validation of the working item set.
//!
//! Two checks gate a save: every language must hold the same number of
//! items, and field values must satisfy the schema. Neither check touches
//! the network.

use crate::schema::SectionSchema;
use crate::store::ItemSetStore;
use std::collections::BTreeMap;
use std::fmt;

/// Item counts per language, as shown in the mismatch dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountReport {
    pub counts: BTreeMap<String, usize>,
}

impl CountReport {
    pub fn is_consistent(&self) -> bool {
        let mut values = self.counts.values();
        match values.next() {
            Some(first) => values.all(|c| c == first),
            None => true,
        }
    }
}

impl fmt::Display for CountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(code, count)| format!("{}: {}", code, count))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Tracks whether the item set currently violates the equal-count rule.
#[derive(Debug, Default)]
pub struct CountValidator {
    mismatch: bool,
}

impl CountValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check counts and update the mismatch flag.
    ///
    /// # Returns
    /// `true` when every language has the same number of items.
    pub fn validate(&mut self, store: &ItemSetStore) -> bool {
        let consistent = Self::report(store).is_consistent();
        self.mismatch = !consistent;
        consistent
    }

    pub fn report(store: &ItemSetStore) -> CountReport {
        CountReport {
            counts: store.counts(),
        }
    }

    /// Whether the last `validate` found a mismatch.
    pub fn has_mismatch(&self) -> bool {
        self.mismatch
    }
}

/// Field-level validation result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that block saving
    pub errors: Vec<String>,

    /// Things worth surfacing that do not block saving
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Check every item against the schema.
///
/// Required fields are enforced for the default language only, since other
/// languages fall back to it. Length limits apply to all languages. Items
/// that are blank outside the default language produce warnings.
pub fn validate_fields(store: &ItemSetStore, schema: &SectionSchema) -> ValidationReport {
    let mut report = ValidationReport::default();
    let default_code = store.languages().default_language().language_code.clone();

    for lang in store.languages().iter() {
        let code = &lang.language_code;
        let Ok(items) = store.items(code) else {
            continue;
        };
        for (position, item) in items.iter().enumerate() {
            for field in &schema.fields {
                let value = item.get(field.key);
                if field.required && *code == default_code && value.trim().is_empty() {
                    report.errors.push(format!(
                        "{} {} ({}): {} is required",
                        schema.prefix,
                        position + 1,
                        code,
                        field.label
                    ));
                }
                if let Some(max) = field.max_length {
                    let len = value.chars().count();
                    if len > max {
                        report.errors.push(format!(
                            "{} {} ({}): {} is {} characters, maximum is {}",
                            schema.prefix,
                            position + 1,
                            code,
                            field.label,
                            len,
                            max
                        ));
                    }
                }
            }
            if *code != default_code && item.is_blank() {
                report.warnings.push(format!(
                    "{} {} has no '{}' content",
                    schema.prefix,
                    position + 1,
                    code
                ));
            }
        }
    }

    report
}

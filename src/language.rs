//! Website languages.
//!
//! The set of languages is fixed per website and immutable for the lifetime
//! of a form session. `LanguageSet` is the single source of truth a session
//! consults for ordering, lookups and the default language.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A language enabled on the website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    /// Backend id, used as the `language` reference of translations
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    /// Short code (e.g. "en", "ar") used to key the item set
    #[serde(alias = "languageID")]
    pub language_code: String,

    /// Whether this is the website's default language
    #[serde(default)]
    pub is_default: bool,
}

impl Language {
    pub fn new(id: &str, language_code: &str, is_default: bool) -> Self {
        Self {
            id: id.to_string(),
            language_code: language_code.to_string(),
            is_default,
        }
    }
}

/// Ordered, validated set of languages for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet {
    languages: Vec<Language>,
}

impl LanguageSet {
    /// Build a language set.
    ///
    /// # Returns
    /// * `Err` if the list is empty, a code or id repeats, or more than one
    ///   language claims to be the default
    pub fn new(languages: Vec<Language>) -> Result<Self> {
        if languages.is_empty() {
            bail!("At least one language is required");
        }

        for (i, lang) in languages.iter().enumerate() {
            if languages[..i]
                .iter()
                .any(|other| other.language_code == lang.language_code || other.id == lang.id)
            {
                bail!("Duplicate language: '{}'", lang.language_code);
            }
        }

        let defaults = languages.iter().filter(|l| l.is_default).count();
        if defaults > 1 {
            bail!("Multiple default languages found ({})", defaults);
        }

        Ok(Self { languages })
    }

    /// Get a language by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.language_code == code)
    }

    /// Get a language by its backend id.
    pub fn get_by_id(&self, id: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.id == id)
    }

    /// The default language, or the first one when none is flagged.
    pub fn default_language(&self) -> &Language {
        self.languages
            .iter()
            .find(|l| l.is_default)
            .unwrap_or(&self.languages[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.languages.iter().map(|l| l.language_code.as_str()).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

//! Wire records exchanged with the Content API.
//!
//! The backend is a document store: ids travel as `_id`, fields are
//! camelCase, and references may arrive either as a bare id or as a
//! populated object depending on the endpoint.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A reference to another backend record, bare or populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref {
    Id(String),
    Object {
        #[serde(rename = "_id")]
        id: String,
    },
}

impl Ref {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Object { id } => id,
        }
    }
}

impl From<&str> for Ref {
    fn from(id: &str) -> Self {
        Ref::Id(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsection {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Body of `createSubsection` / `updateSubsection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsectionPayload {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_active: bool,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_item: Option<String>,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentElement {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_element_type")]
    pub element_type: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Ref>,
    #[serde(default)]
    pub default_content: String,
    /// Populated by the complete-subsection read path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<Translation>,
}

fn default_element_type() -> String {
    "text".to_string()
}

/// Body of `createContentElement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContentElement {
    pub name: String,
    #[serde(rename = "type")]
    pub element_type: String,
    pub parent: String,
    pub order: i64,
    pub default_content: String,
}

/// Body of `updateContentElement`. Only present fields are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentElementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_content: Option<String>,
}

impl ContentElementPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.order.is_none() && self.default_content.is_none()
    }
}

/// A stored translation as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    pub language: Ref,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_element: Option<Ref>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// One row of a bulk translation upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationPayload {
    pub content: String,
    pub language: String,
    pub content_element: String,
    pub is_active: bool,
}

/// Read model of `getCompleteSubsectionBySlug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSubsection {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub elements: Vec<ContentElement>,
    #[serde(default)]
    pub content_elements: Vec<ContentElement>,
}

impl CompleteSubsection {
    /// Elements from both lists, first occurrence of each id wins.
    pub fn all_elements(&self) -> Vec<ContentElement> {
        let mut seen = HashSet::new();
        self.elements
            .iter()
            .chain(self.content_elements.iter())
            .filter(|e| seen.insert(e.id.clone()))
            .cloned()
            .collect()
    }

    /// Translations embedded in the elements, with `content_element` filled in.
    pub fn translations(&self) -> Vec<Translation> {
        self.all_elements()
            .into_iter()
            .flat_map(|element| {
                let element_id = element.id.clone();
                element.translations.into_iter().map(move |mut t| {
                    if t.content_element.is_none() {
                        t.content_element = Some(Ref::Id(element_id.clone()));
                    }
                    t
                })
            })
            .collect()
    }
}

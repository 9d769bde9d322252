//! Working copy of a section's repeating items, per language.
//!
//! Items have no stable id: an item is identified by its position in its
//! language's list, and position `p` in every language refers to the same
//! backend element group.

use crate::error::StoreError;
use crate::index::ElementIndex;
use crate::language::{Language, LanguageSet};
use crate::model::{ContentElement, Translation};
use crate::naming::ElementNamingScheme;
use crate::schema::SectionSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One repeating entry: a flat record of named text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(BTreeMap<String, String>);

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    /// An item with every schema field present and empty.
    pub fn empty_for(schema: &SectionSchema) -> Self {
        Self(
            schema
                .fields
                .iter()
                .map(|f| (f.key.to_string(), String::new()))
                .collect(),
        )
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Field value, empty when absent.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn is_blank(&self) -> bool {
        self.0.values().all(|v| v.trim().is_empty())
    }
}

pub struct ItemSetStore {
    languages: LanguageSet,
    items: HashMap<String, Vec<Item>>,
    defaults: HashMap<String, Item>,
    unsaved: bool,
}

impl ItemSetStore {
    /// One default item per language.
    pub fn initialize(languages: LanguageSet, default_item: impl Fn(&Language) -> Item) -> Self {
        let defaults: HashMap<String, Item> = languages
            .iter()
            .map(|l| (l.language_code.clone(), default_item(l)))
            .collect();
        let items = defaults
            .iter()
            .map(|(code, item)| (code.clone(), vec![item.clone()]))
            .collect();

        Self {
            languages,
            items,
            defaults,
            unsaved: false,
        }
    }

    /// Replace the working copy with items parsed from backend elements.
    ///
    /// Elements whose names do not belong to the schema's group are ignored.
    /// Without any group every language falls back to its default item.
    /// Returns the number of items per language.
    pub fn load(
        &mut self,
        elements: &[ContentElement],
        translations: &[Translation],
        schema: &SectionSchema,
    ) -> usize {
        let index = ElementIndex::build(elements, &ElementNamingScheme::new(schema.prefix), schema);
        self.load_index(&index, translations, schema)
    }

    pub fn load_index(
        &mut self,
        index: &ElementIndex,
        translations: &[Translation],
        schema: &SectionSchema,
    ) -> usize {
        let mut contents: HashMap<(&str, &str), &str> = HashMap::new();
        for t in translations {
            if let Some(element) = &t.content_element {
                contents.insert((element.id(), t.language.id()), t.content.as_str());
            }
        }

        self.unsaved = false;

        if index.group_count() == 0 {
            debug!("No '{}' elements found, using default items", schema.prefix);
            self.items = self
                .defaults
                .iter()
                .map(|(code, item)| (code.clone(), vec![item.clone()]))
                .collect();
            return 1;
        }

        let default_code = self.languages.default_language().language_code.clone();
        let mut items = HashMap::new();
        for lang in self.languages.iter() {
            let list: Vec<Item> = (0..index.group_count())
                .map(|position| {
                    let mut item = Item::empty_for(schema);
                    for (field_position, field) in schema.fields.iter().enumerate() {
                        let Some(element) = index.element_at(position, field_position) else {
                            continue;
                        };
                        let value = match contents.get(&(element.id.as_str(), lang.id.as_str())) {
                            Some(content) => content.to_string(),
                            None if lang.language_code == default_code => {
                                element.default_content.clone()
                            }
                            None => String::new(),
                        };
                        item.set(field.key, value);
                    }
                    item
                })
                .collect();
            items.insert(lang.language_code.clone(), list);
        }
        self.items = items;

        index.group_count()
    }

    pub fn languages(&self) -> &LanguageSet {
        &self.languages
    }

    pub fn items(&self, lang: &str) -> Result<&[Item], StoreError> {
        self.items
            .get(lang)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::UnknownLanguage(lang.to_string()))
    }

    pub fn item(&self, lang: &str, index: usize) -> Option<&Item> {
        self.items.get(lang).and_then(|list| list.get(index))
    }

    /// Append `template` to one language's list. Returns the new length.
    pub fn add_item(&mut self, lang: &str, template: Item) -> Result<usize, StoreError> {
        let list = self.list_mut(lang)?;
        list.push(template);
        let len = list.len();
        self.unsaved = true;
        Ok(len)
    }

    /// Append `template` to every language's list.
    pub fn add_item_everywhere(&mut self, template: Item) {
        for list in self.items.values_mut() {
            list.push(template.clone());
        }
        self.unsaved = true;
    }

    /// Check whether `remove_item(lang, index)` would be accepted.
    pub fn can_remove(&self, lang: &str, index: usize) -> Result<(), StoreError> {
        let list = self.items(lang)?;
        if index >= list.len() {
            return Err(StoreError::IndexOutOfRange {
                language: lang.to_string(),
                index,
                len: list.len(),
            });
        }
        if list.len() <= 1 {
            return Err(StoreError::LastItem(lang.to_string()));
        }
        Ok(())
    }

    /// Check that every language can give up position `index`.
    ///
    /// A backend-backed item is shared by all languages, so deleting it must
    /// not leave any language pointing at elements that no longer exist.
    pub fn can_remove_everywhere(&self, index: usize) -> Result<(), StoreError> {
        for lang in self.languages.iter() {
            self.can_remove(&lang.language_code, index)?;
        }
        Ok(())
    }

    /// Remove one item from one language. The last item can never be removed.
    pub fn remove_item(&mut self, lang: &str, index: usize) -> Result<Item, StoreError> {
        self.can_remove(lang, index)?;
        let removed = self.list_mut(lang)?.remove(index);
        self.unsaved = true;
        Ok(removed)
    }

    /// Remove position `index` from every language that can give it up.
    ///
    /// Languages where the position does not exist, or where it is the last
    /// remaining item, are left untouched. Call `can_remove_everywhere` first
    /// when every language must lose the item.
    pub fn remove_everywhere(&mut self, index: usize) -> Vec<(String, Item)> {
        let mut removed = Vec::new();
        for lang in self.languages.iter() {
            let code = &lang.language_code;
            if let Some(list) = self.items.get_mut(code) {
                if index < list.len() && list.len() > 1 {
                    removed.push((code.clone(), list.remove(index)));
                }
            }
        }
        if !removed.is_empty() {
            self.unsaved = true;
        }
        removed
    }

    pub fn set_field(
        &mut self,
        lang: &str,
        index: usize,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let list = self.list_mut(lang)?;
        let len = list.len();
        let item = list.get_mut(index).ok_or_else(|| StoreError::IndexOutOfRange {
            language: lang.to_string(),
            index,
            len,
        })?;
        item.set(key, value);
        self.unsaved = true;
        Ok(())
    }

    /// Replace a language's whole list. An empty list becomes the default item.
    pub fn replace_items(&mut self, lang: &str, items: Vec<Item>) -> Result<(), StoreError> {
        let fallback = self.defaults.get(lang).cloned().unwrap_or_default();
        let list = self.list_mut(lang)?;
        *list = if items.is_empty() { vec![fallback] } else { items };
        self.unsaved = true;
        Ok(())
    }

    /// Item count per language code.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.items
            .iter()
            .map(|(code, list)| (code.clone(), list.len()))
            .collect()
    }

    pub fn max_count(&self) -> usize {
        self.items.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    /// Snapshot keyed by language code, in language order.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Item>> {
        self.items
            .iter()
            .map(|(code, list)| (code.clone(), list.clone()))
            .collect()
    }

    fn list_mut(&mut self, lang: &str) -> Result<&mut Vec<Item>, StoreError> {
        self.items
            .get_mut(lang)
            .ok_or_else(|| StoreError::UnknownLanguage(lang.to_string()))
    }
}

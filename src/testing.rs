//! In-memory `ContentApi` for unit tests.

use crate::api::ContentApi;
use crate::error::ApiError;
use crate::model::{
    CompleteSubsection, ContentElement, ContentElementPatch, NewContentElement, Ref, Subsection,
    SubsectionPayload, Translation, TranslationPayload,
};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct FakeState {
    subsections: Vec<Subsection>,
    elements: Vec<ContentElement>,
    translations: Vec<Translation>,
    calls: Vec<String>,
    bulk_calls: usize,
    next_id: usize,
    failing: HashSet<String>,
    fail_subsection_create: bool,
    fail_bulk: bool,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn element_mut(&mut self, id: &str) -> Result<&mut ContentElement, ApiError> {
        self.elements
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("content element {}", id)))
    }
}

fn injected() -> ApiError {
    ApiError::Http {
        status: 500,
        body: "injected failure".to_string(),
    }
}

/// Records every call. Failures can be injected per element name: a create
/// fails when the new name matches, an update or delete when the current
/// name matches.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail_on(&self, element_name: &str) {
        self.state().failing.insert(element_name.to_string());
    }

    /// Let every element call succeed again.
    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    pub fn fail_subsection_create(&self) {
        self.state().fail_subsection_create = true;
    }

    pub fn fail_bulk(&self) {
        self.state().fail_bulk = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn bulk_calls(&self) -> usize {
        self.state().bulk_calls
    }

    /// All elements, by order.
    pub fn elements(&self) -> Vec<ContentElement> {
        let mut elements = self.state().elements.clone();
        elements.sort_by_key(|e| e.order);
        elements
    }

    pub fn translations(&self) -> Vec<Translation> {
        self.state().translations.clone()
    }

    pub fn seed_subsection(&self, slug: &str, name: &str) -> String {
        let mut state = self.state();
        let id = state.id("sub");
        state.subsections.push(Subsection {
            id: id.clone(),
            name: Some(name.to_string()),
            slug: Some(slug.to_string()),
        });
        id
    }

    pub fn seed_element(&self, parent: &str, name: &str, order: i64, default_content: &str) -> String {
        let mut state = self.state();
        let id = state.id("el");
        state.elements.push(ContentElement {
            id: id.clone(),
            name: name.to_string(),
            element_type: "text".to_string(),
            order,
            parent: Some(Ref::Id(parent.to_string())),
            default_content: default_content.to_string(),
            translations: vec![],
        });
        id
    }

    pub fn seed_translation(&self, element_id: &str, language_id: &str, content: &str) {
        self.state().translations.push(Translation {
            id: None,
            content: content.to_string(),
            language: language_id.into(),
            content_element: Some(element_id.into()),
            is_active: true,
        });
    }

    /// What `get_complete_subsection_by_slug` would return, without logging a call.
    pub fn complete(&self, slug: &str) -> Option<CompleteSubsection> {
        let state = self.state();
        let subsection = state
            .subsections
            .iter()
            .find(|s| s.slug.as_deref() == Some(slug))?;

        let mut elements: Vec<ContentElement> = state
            .elements
            .iter()
            .filter(|e| e.parent.as_ref().map(Ref::id) == Some(subsection.id.as_str()))
            .cloned()
            .map(|mut e| {
                e.translations = state
                    .translations
                    .iter()
                    .filter(|t| t.content_element.as_ref().map(Ref::id) == Some(e.id.as_str()))
                    .map(|t| Translation {
                        content_element: None,
                        ..t.clone()
                    })
                    .collect();
                e
            })
            .collect();
        elements.sort_by_key(|e| e.order);

        Some(CompleteSubsection {
            id: subsection.id.clone(),
            name: subsection.name.clone(),
            slug: subsection.slug.clone(),
            elements,
            content_elements: vec![],
        })
    }
}

impl ContentApi for FakeApi {
    async fn create_subsection(&self, data: &SubsectionPayload) -> Result<Subsection, ApiError> {
        let mut state = self.state();
        state.calls.push(format!("create_subsection {}", data.slug));
        if state.fail_subsection_create {
            return Err(injected());
        }
        let subsection = Subsection {
            id: state.id("sub"),
            name: Some(data.name.clone()),
            slug: Some(data.slug.clone()),
        };
        state.subsections.push(subsection.clone());
        Ok(subsection)
    }

    async fn update_subsection(&self, id: &str, data: &SubsectionPayload) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(format!("update_subsection {}", id));
        let subsection = state
            .subsections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("subsection {}", id)))?;
        subsection.name = Some(data.name.clone());
        Ok(())
    }

    async fn create_content_element(
        &self,
        data: &NewContentElement,
    ) -> Result<ContentElement, ApiError> {
        let mut state = self.state();
        state.calls.push(format!("create {}", data.name));
        if state.failing.contains(&data.name) {
            return Err(injected());
        }
        let element = ContentElement {
            id: state.id("el"),
            name: data.name.clone(),
            element_type: data.element_type.clone(),
            order: data.order,
            parent: Some(Ref::Id(data.parent.clone())),
            default_content: data.default_content.clone(),
            translations: vec![],
        };
        state.elements.push(element.clone());
        Ok(element)
    }

    async fn update_content_element(
        &self,
        id: &str,
        patch: &ContentElementPatch,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(format!("update {}", id));
        let failing = state.failing.clone();
        let element = state.element_mut(id)?;
        if failing.contains(&element.name) {
            return Err(injected());
        }
        if let Some(name) = &patch.name {
            element.name = name.clone();
        }
        if let Some(order) = patch.order {
            element.order = order;
        }
        if let Some(content) = &patch.default_content {
            element.default_content = content.clone();
        }
        Ok(())
    }

    async fn delete_content_element(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(format!("delete {}", id));
        let name = state.element_mut(id)?.name.clone();
        if state.failing.contains(&name) {
            return Err(injected());
        }
        state.elements.retain(|e| e.id != id);
        state
            .translations
            .retain(|t| t.content_element.as_ref().map(Ref::id) != Some(id));
        Ok(())
    }

    async fn bulk_upsert_translations(
        &self,
        translations: &[TranslationPayload],
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(format!("bulk_upsert {}", translations.len()));
        state.bulk_calls += 1;
        if state.fail_bulk {
            return Err(injected());
        }
        for row in translations {
            let existing = state.translations.iter().position(|t| {
                t.language.id() == row.language
                    && t.content_element.as_ref().map(Ref::id) == Some(row.content_element.as_str())
            });
            match existing {
                Some(i) => state.translations[i].content = row.content.clone(),
                None => {
                    let id = state.id("tr");
                    state.translations.push(Translation {
                        id: Some(id),
                        content: row.content.clone(),
                        language: Ref::Id(row.language.clone()),
                        content_element: Some(Ref::Id(row.content_element.clone())),
                        is_active: row.is_active,
                    });
                }
            }
        }
        Ok(())
    }

    async fn get_complete_subsection_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CompleteSubsection>, ApiError> {
        self.state().calls.push(format!("get {}", slug));
        Ok(self.complete(slug))
    }
}

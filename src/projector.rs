//! Mapping of (language, item, field) to bulk translation rows.

use crate::language::Language;
use crate::model::TranslationPayload;
use crate::schema::FieldSpec;
use crate::store::Item;

/// What to do with fields that have no content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyContentPolicy {
    /// Do not create translation rows for empty fields
    #[default]
    SkipEmpty,
    /// Upsert a row for every field, even when empty
    AlwaysUpsert,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationProjector {
    policy: EmptyContentPolicy,
}

impl TranslationProjector {
    pub fn new(policy: EmptyContentPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EmptyContentPolicy {
        self.policy
    }

    /// Translation row for one field of one item.
    ///
    /// # Returns
    /// * `None` when the field is empty and the policy skips empty content
    pub fn project(
        &self,
        language: &Language,
        item: &Item,
        field: &FieldSpec,
        element_id: &str,
    ) -> Option<TranslationPayload> {
        let content = item.get(field.key);
        if self.policy == EmptyContentPolicy::SkipEmpty && content.trim().is_empty() {
            return None;
        }
        Some(Self::row(language, content, element_id))
    }

    /// Translation row regardless of policy.
    pub fn row(language: &Language, content: &str, element_id: &str) -> TranslationPayload {
        TranslationPayload {
            content: content.to_string(),
            language: language.id.clone(),
            content_element: element_id.to_string(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Language {
        Language::new("lang-en", "en", true)
    }

    #[test]
    fn test_project_filled_field() {
        let projector = TranslationProjector::default();
        let item = Item::from_pairs([("question", "Why?")]);
        let field = FieldSpec::text("question", "Question");

        let row = projector.project(&english(), &item, &field, "el-1").unwrap();
        assert_eq!(
            row,
            TranslationPayload {
                content: "Why?".to_string(),
                language: "lang-en".to_string(),
                content_element: "el-1".to_string(),
                is_active: true,
            }
        );
    }

    #[test]
    fn test_skip_empty_policy() {
        let projector = TranslationProjector::new(EmptyContentPolicy::SkipEmpty);
        let item = Item::from_pairs([("answer", "   ")]);
        let field = FieldSpec::text("answer", "Answer");

        assert!(projector.project(&english(), &item, &field, "el-2").is_none());
        assert!(projector
            .project(&english(), &Item::new(), &field, "el-2")
            .is_none());
    }

    #[test]
    fn test_always_upsert_policy() {
        let projector = TranslationProjector::new(EmptyContentPolicy::AlwaysUpsert);
        let field = FieldSpec::text("answer", "Answer");

        let row = projector.project(&english(), &Item::new(), &field, "el-2").unwrap();
        assert_eq!(row.content, "");
        assert_eq!(row.content_element, "el-2");
    }
}

//! Operations consumed from the Content API.
//!
//! `HttpContentApi` implements this over HTTP; the sync engine only ever
//! talks to the trait.

use crate::error::ApiError;
use crate::model::{
    CompleteSubsection, ContentElement, ContentElementPatch, NewContentElement, Subsection,
    SubsectionPayload, TranslationPayload,
};

#[allow(async_fn_in_trait)]
pub trait ContentApi {
    async fn create_subsection(&self, data: &SubsectionPayload) -> Result<Subsection, ApiError>;

    async fn update_subsection(&self, id: &str, data: &SubsectionPayload) -> Result<(), ApiError>;

    async fn create_content_element(
        &self,
        data: &NewContentElement,
    ) -> Result<ContentElement, ApiError>;

    async fn update_content_element(
        &self,
        id: &str,
        patch: &ContentElementPatch,
    ) -> Result<(), ApiError>;

    async fn delete_content_element(&self, id: &str) -> Result<(), ApiError>;

    async fn bulk_upsert_translations(
        &self,
        translations: &[TranslationPayload],
    ) -> Result<(), ApiError>;

    /// `Ok(None)` when no subsection has this slug yet.
    async fn get_complete_subsection_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CompleteSubsection>, ApiError>;
}

impl<T: ContentApi + ?Sized> ContentApi for &T {
    async fn create_subsection(&self, data: &SubsectionPayload) -> Result<Subsection, ApiError> {
        (**self).create_subsection(data).await
    }

    async fn update_subsection(&self, id: &str, data: &SubsectionPayload) -> Result<(), ApiError> {
        (**self).update_subsection(id, data).await
    }

    async fn create_content_element(
        &self,
        data: &NewContentElement,
    ) -> Result<ContentElement, ApiError> {
        (**self).create_content_element(data).await
    }

    async fn update_content_element(
        &self,
        id: &str,
        patch: &ContentElementPatch,
    ) -> Result<(), ApiError> {
        (**self).update_content_element(id, patch).await
    }

    async fn delete_content_element(&self, id: &str) -> Result<(), ApiError> {
        (**self).delete_content_element(id).await
    }

    async fn bulk_upsert_translations(
        &self,
        translations: &[TranslationPayload],
    ) -> Result<(), ApiError> {
        (**self).bulk_upsert_translations(translations).await
    }

    async fn get_complete_subsection_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CompleteSubsection>, ApiError> {
        (**self).get_complete_subsection_by_slug(slug).await
    }
}

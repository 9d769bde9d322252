use crate::api::ContentApi;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::{
    CompleteSubsection, ContentElement, ContentElementPatch, NewContentElement, Subsection,
    SubsectionPayload, TranslationPayload,
};
use crate::retry::{with_retry_if, RetryConfig};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Responses arrive either bare or wrapped in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

#[derive(Debug, Serialize)]
struct BulkTranslations<'a> {
    translations: &'a [TranslationPayload],
}

/// Content API client over HTTP
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry: RetryConfig,
    bulk_retry: RetryConfig,
}

impl HttpContentApi {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            retry: RetryConfig::content_api(),
            bulk_retry: RetryConfig::bulk_upsert(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.content_api_url, config.content_api_token.clone()).with_retry(
            RetryConfig::content_api().with_max_attempts(config.api_max_retries),
            RetryConfig::bulk_upsert().with_max_attempts(config.api_max_retries.max(1) + 1),
        )
    }

    pub fn with_retry(mut self, retry: RetryConfig, bulk_retry: RetryConfig) -> Self {
        self.retry = retry;
        self.bulk_retry = bulk_retry;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, &url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request built by `build`, retrying transient failures.
    async fn send<F>(&self, retry: &RetryConfig, name: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        with_retry_if(
            retry,
            name,
            || async {
                match build().send().await {
                    Ok(response) => check_status(response).await,
                    Err(e) => Err(ApiError::Transport(e)),
                }
            },
            ApiError::is_retryable,
        )
        .await
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(body));
    }
    Err(ApiError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str::<Envelope<T>>(&body)
        .map(Envelope::into_inner)
        .map_err(|e| ApiError::Decode(format!("{} (body: {})", e, truncate(&body, 200))))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl ContentApi for HttpContentApi {
    async fn create_subsection(&self, data: &SubsectionPayload) -> Result<Subsection, ApiError> {
        let response = self
            .send(&self.retry, "Create subsection", || {
                self.request(Method::POST, "/subsections").json(data)
            })
            .await?;
        decode(response).await
    }

    async fn update_subsection(&self, id: &str, data: &SubsectionPayload) -> Result<(), ApiError> {
        let path = format!("/subsections/{}", id);
        self.send(&self.retry, "Update subsection", || {
            self.request(Method::PUT, &path).json(data)
        })
        .await?;
        Ok(())
    }

    async fn create_content_element(
        &self,
        data: &NewContentElement,
    ) -> Result<ContentElement, ApiError> {
        let name = format!("Create '{}'", data.name);
        let response = self
            .send(&self.retry, &name, || {
                self.request(Method::POST, "/content-elements").json(data)
            })
            .await?;
        decode(response).await
    }

    async fn update_content_element(
        &self,
        id: &str,
        patch: &ContentElementPatch,
    ) -> Result<(), ApiError> {
        let path = format!("/content-elements/{}", id);
        self.send(&self.retry, &format!("Update element {}", id), || {
            self.request(Method::PUT, &path).json(patch)
        })
        .await?;
        Ok(())
    }

    async fn delete_content_element(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/content-elements/{}", id);
        self.send(&self.retry, &format!("Delete element {}", id), || {
            self.request(Method::DELETE, &path)
        })
        .await?;
        Ok(())
    }

    async fn bulk_upsert_translations(
        &self,
        translations: &[TranslationPayload],
    ) -> Result<(), ApiError> {
        debug!("Upserting {} translations", translations.len());
        let body = BulkTranslations { translations };
        self.send(&self.bulk_retry, "Bulk upsert translations", || {
            self.request(Method::POST, "/translations/bulk").json(&body)
        })
        .await?;
        Ok(())
    }

    async fn get_complete_subsection_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CompleteSubsection>, ApiError> {
        let path = format!("/subsections/slug/{}/complete", slug);
        let result = self
            .send(&self.retry, &format!("Load subsection '{}'", slug), || {
                self.request(Method::GET, &path)
            })
            .await;

        match result {
            Ok(response) => decode(response).await.map(Some),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

//! One form session: the working item set of a single section, the
//! subsection it maps to, and the operations a form exposes.

use crate::api::ContentApi;
use crate::config::{AddItemPolicy, SyncOptions};
use crate::error::SyncError;
use crate::index::ElementIndex;
use crate::language::{Language, LanguageSet};
use crate::model::CompleteSubsection;
use crate::naming::ElementNamingScheme;
use crate::notify::{Notice, Notifier};
use crate::reconciler::{DeleteReport, Reconciler, SaveReport, SubsectionTarget};
use crate::schema::SectionSchema;
use crate::store::{Item, ItemSetStore};
use crate::validator::{validate_fields, CountValidator};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info, warn};

/// A section to edit from the command line, as stored on disk.
///
/// ```json
/// {
///   "slug": "faq-section",
///   "name": "FAQ Section",
///   "section": "64f0c2...",
///   "schema": "faq",
///   "languages": [{"_id": "64f0...", "languageCode": "en", "isDefault": true}],
///   "items": {"en": [{"question": "Why?", "answer": "Because."}]}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Parent section id, needed only when the subsection does not exist yet
    #[serde(default)]
    pub section: Option<String>,
    pub schema: String,
    pub languages: Vec<Language>,
    #[serde(default)]
    pub items: BTreeMap<String, Vec<Item>>,
}

impl SessionFile {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse session file {}", path.display()))
    }

    pub fn section_schema(&self) -> anyhow::Result<SectionSchema> {
        SectionSchema::by_name(&self.schema)
    }

    pub fn language_set(&self) -> anyhow::Result<LanguageSet> {
        LanguageSet::new(self.languages.clone())
    }

    pub fn target(&self) -> SubsectionTarget {
        let mut target =
            SubsectionTarget::new(&self.slug, self.name.as_deref().unwrap_or(&self.slug));
        target.parent_section = self.section.clone();
        target
    }
}

pub struct FormSession<A, N> {
    reconciler: Reconciler<A>,
    notifier: N,
    schema: SectionSchema,
    target: SubsectionTarget,
    store: ItemSetStore,
    loaded: Option<CompleteSubsection>,
    validator: CountValidator,
    last_saved_at: Option<DateTime<Utc>>,
    /// A delete left elements behind; the next save prunes them
    cleanup_pending: bool,
}

impl<A: ContentApi, N: Notifier> FormSession<A, N> {
    /// Load the subsection by slug, or start from one default item per
    /// language when it does not exist yet.
    pub async fn open(
        api: A,
        notifier: N,
        options: SyncOptions,
        schema: SectionSchema,
        target: SubsectionTarget,
        languages: LanguageSet,
    ) -> Result<Self, SyncError> {
        let loaded = match api.get_complete_subsection_by_slug(&target.slug).await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Failed to load subsection '{}': {}", target.slug, e);
                notifier.notify(Notice::error(format!("Failed to load '{}': {}", target.slug, e)));
                return Err(e.into());
            }
        };

        let mut store = ItemSetStore::initialize(languages, |_| Item::empty_for(&schema));
        match &loaded {
            Some(subsection) => {
                let count = store.load(&subsection.all_elements(), &subsection.translations(), &schema);
                info!("Loaded '{}' with {} items per language", target.slug, count);
            }
            None => info!("Subsection '{}' does not exist yet, starting empty", target.slug),
        }

        Ok(Self {
            reconciler: Reconciler::new(api, options),
            notifier,
            schema,
            target,
            store,
            loaded,
            validator: CountValidator::new(),
            last_saved_at: None,
            cleanup_pending: false,
        })
    }

    pub fn store(&self) -> &ItemSetStore {
        &self.store
    }

    pub fn schema(&self) -> &SectionSchema {
        &self.schema
    }

    pub fn target(&self) -> &SubsectionTarget {
        &self.target
    }

    pub fn reconciler(&self) -> &Reconciler<A> {
        &self.reconciler
    }

    pub fn subsection(&self) -> Option<&CompleteSubsection> {
        self.loaded.as_ref()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn has_count_mismatch(&self) -> bool {
        self.validator.has_mismatch()
    }

    /// Append an empty item to `lang`, or to every language under
    /// `AddItemPolicy::Propagate`. Returns the new length of `lang`'s list.
    pub fn add_item(&mut self, lang: &str) -> Result<usize, SyncError> {
        let template = Item::empty_for(&self.schema);
        let len = match self.reconciler.options().add_item {
            AddItemPolicy::Local => self.store.add_item(lang, template)?,
            AddItemPolicy::Propagate => {
                self.store.items(lang)?;
                self.store.add_item_everywhere(template);
                self.store.items(lang)?.len()
            }
        };
        self.validator.validate(&self.store);
        Ok(len)
    }

    pub fn set_field(
        &mut self,
        lang: &str,
        position: usize,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), SyncError> {
        self.store.set_field(lang, position, key, value)?;
        Ok(())
    }

    /// Replace one language's items wholesale.
    pub fn replace_items(&mut self, lang: &str, items: Vec<Item>) -> Result<(), SyncError> {
        self.store.replace_items(lang, items)?;
        self.validator.validate(&self.store);
        Ok(())
    }

    /// Remove the item at `position`.
    ///
    /// Items backed by backend elements go through the deletion protocol and
    /// disappear from every language. Unsaved items are removed locally,
    /// following the add-item policy.
    pub async fn remove_item(&mut self, lang: &str, position: usize) -> Result<DeleteReport, SyncError> {
        if let Err(e) = self.store.can_remove(lang, position) {
            self.notifier.notify(Notice::error(e.to_string()));
            return Err(e.into());
        }

        if !self.is_backed(position) {
            let mut report = DeleteReport {
                position,
                ..Default::default()
            };
            match self.reconciler.options().add_item {
                AddItemPolicy::Local => {
                    self.store.remove_item(lang, position)?;
                    report.languages_spliced.push(lang.to_string());
                }
                AddItemPolicy::Propagate => {
                    report.languages_spliced = self
                        .store
                        .remove_everywhere(position)
                        .into_iter()
                        .map(|(code, _)| code)
                        .collect();
                }
            }
            self.validator.validate(&self.store);
            return Ok(report);
        }

        let report = match self
            .reconciler
            .delete_item(&mut self.store, &self.schema, self.loaded.as_ref(), lang, position)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                self.notifier.notify(Notice::error(e.to_string()));
                return Err(e);
            }
        };
        self.validator.validate(&self.store);

        for failure in &report.failures {
            self.notifier.notify(Notice::error(failure.to_string()));
        }
        if report.is_clean() {
            self.notifier.notify(Notice::success(format!(
                "{} {} deleted",
                self.schema.prefix,
                position + 1
            )));
        } else {
            self.cleanup_pending = true;
            self.notifier.notify(Notice::info(format!(
                "Save '{}' to finish removing {} {}",
                self.target.name,
                self.schema.prefix,
                position + 1
            )));
        }

        self.refresh_subsection().await;
        Ok(report)
    }

    /// Run the count and field checks, notifying about every problem found.
    pub fn validate(&mut self) -> Result<(), SyncError> {
        if !self.validator.validate(&self.store) {
            let counts = CountValidator::report(&self.store);
            self.notifier.notify(Notice::error(format!(
                "Every language must have the same number of items ({})",
                counts
            )));
            return Err(SyncError::CountMismatch(counts));
        }

        let fields = validate_fields(&self.store, &self.schema);
        for warning in &fields.warnings {
            self.notifier.notify(Notice::info(warning.clone()));
        }
        if fields.has_errors() {
            for message in &fields.errors {
                self.notifier.notify(Notice::error(message.clone()));
            }
            return Err(SyncError::InvalidFields(fields.errors));
        }
        Ok(())
    }

    /// Validate, push the item set to the backend and reload it.
    ///
    /// When some elements failed the working copy is kept as is so the save
    /// can be retried; otherwise it is replaced by what the backend now holds.
    /// After a partly failed delete, leftover elements are pruned whatever
    /// the configured policy.
    pub async fn save(&mut self) -> Result<SaveReport, SyncError> {
        self.validate()?;

        let prune = self.reconciler.options().prune_stale || self.cleanup_pending;
        let report = match self
            .reconciler
            .save_with_prune(&self.store, &self.schema, &self.target, self.loaded.as_ref(), prune)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                error!("Save of '{}' failed: {}", self.target.slug, e);
                self.notifier.notify(Notice::error(format!("Save failed: {}", e)));
                // the subsection may have been created before the failure
                self.refresh_subsection().await;
                return Err(e);
            }
        };

        for failure in &report.failures {
            self.notifier.notify(Notice::error(failure.to_string()));
        }

        self.refresh_subsection().await;
        if report.is_clean() {
            if let Some(subsection) = &self.loaded {
                self.store
                    .load(&subsection.all_elements(), &subsection.translations(), &self.schema);
            }
            self.store.mark_saved();
            self.cleanup_pending = false;
            self.notifier
                .notify(Notice::success(format!("'{}' saved", self.target.name)));
        } else {
            self.notifier.notify(Notice::info(format!(
                "'{}' saved with {} failed elements; save again to retry",
                self.target.name,
                report.failures.len()
            )));
        }
        self.last_saved_at = Some(Utc::now());
        Ok(report)
    }

    /// Whether a backend group exists for `position`.
    fn is_backed(&self, position: usize) -> bool {
        let Some(subsection) = &self.loaded else {
            return false;
        };
        let elements = subsection.all_elements();
        let index = ElementIndex::build(
            &elements,
            &ElementNamingScheme::new(self.schema.prefix),
            &self.schema,
        );
        position < index.group_count()
    }

    /// Re-read the subsection after a backend change. Failure leaves the
    /// previous copy in place.
    async fn refresh_subsection(&mut self) {
        match self
            .reconciler
            .api()
            .get_complete_subsection_by_slug(&self.target.slug)
            .await
        {
            Ok(Some(subsection)) => self.loaded = Some(subsection),
            Ok(None) => warn!("Subsection '{}' not found on reload", self.target.slug),
            Err(e) => {
                warn!("Failed to reload '{}': {}", self.target.slug, e);
                self.notifier
                    .notify(Notice::error(format!("Failed to reload '{}': {}", self.target.slug, e)));
            }
        }
    }
}

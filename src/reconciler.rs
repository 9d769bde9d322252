//! Reconciliation of the working item set with backend content elements.
//!
//! Saving is split in two: `SyncPlan::compute` is a pure diff between the
//! item set and an `ElementIndex`, and `Reconciler::save` executes it. The
//! same split applies to deletion (`DeletionPlan` / `Reconciler::delete_item`).
//!
//! Per-element failures never abort an operation. They are logged, collected
//! in the report, and the remaining elements are still processed. Only the
//! subsection creation and the final bulk translation upsert are fatal.

use crate::api::ContentApi;
use crate::config::SyncOptions;
use crate::error::{ApiError, SyncError};
use crate::index::ElementIndex;
use crate::language::LanguageSet;
use crate::metrics::SyncMetrics;
use crate::model::{
    CompleteSubsection, ContentElement, ContentElementPatch, NewContentElement, SubsectionPayload,
    Translation, TranslationPayload,
};
use crate::naming::{order_for, ElementNamingScheme};
use crate::projector::TranslationProjector;
use crate::schema::SectionSchema;
use crate::store::ItemSetStore;
use crate::validator::CountValidator;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Where a section's subsection lives, and what to create if it is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsectionTarget {
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Parent section id; required to create the subsection
    pub parent_section: Option<String>,
    pub order: i64,
}

impl SubsectionTarget {
    pub fn new(slug: &str, name: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            description: String::new(),
            parent_section: None,
            order: 0,
        }
    }

    pub fn with_parent(mut self, section_id: &str) -> Self {
        self.parent_section = Some(section_id.to_string());
        self
    }

    pub fn payload(&self, languages: &LanguageSet) -> SubsectionPayload {
        SubsectionPayload {
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            is_active: true,
            order: self.order,
            section_item: self.parent_section.clone(),
            languages: languages.ids(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementOp {
    Create,
    Update,
    Delete,
    Renumber,
    UpdateSubsection,
}

impl fmt::Display for ElementOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            ElementOp::Create => "create",
            ElementOp::Update => "update",
            ElementOp::Delete => "delete",
            ElementOp::Renumber => "renumber",
            ElementOp::UpdateSubsection => "update subsection",
        };
        f.write_str(verb)
    }
}

/// A backend call that failed while the operation carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementFailure {
    pub element: String,
    pub operation: ElementOp,
    pub error: String,
}

impl ElementFailure {
    fn new(element: &str, operation: ElementOp, error: &ApiError) -> Self {
        Self {
            element: element.to_string(),
            operation,
            error: error.to_string(),
        }
    }

    /// A renumber left out because its target name still belongs to an
    /// element that could not be deleted.
    fn blocked(update: &ElementUpdate) -> Self {
        let target = update.patch.name.as_deref().unwrap_or(&update.current_name);
        Self {
            element: update.current_name.clone(),
            operation: ElementOp::Renumber,
            error: format!("'{}' is still taken, save again to finish", target),
        }
    }
}

impl fmt::Display for ElementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to {} '{}': {}", self.operation, self.element, self.error)
    }
}

/// Change to one existing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementUpdate {
    pub element_id: String,
    /// Name before the update, for reporting
    pub current_name: String,
    /// Schema field the element backs
    pub field_position: usize,
    pub patch: ContentElementPatch,
}

/// Elements to create for one item position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCreation {
    pub position: usize,
    /// (field position, element to create)
    pub fields: Vec<(usize, NewContentElement)>,
}

/// Backend operations needed to bring a subsection in line with the item set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub updates: Vec<ElementUpdate>,
    pub creations: Vec<GroupCreation>,
    /// Rows for elements that already exist
    pub translations: Vec<TranslationPayload>,
    /// Elements of groups beyond the item count
    pub stale: Vec<ContentElement>,
    /// Elements whose (index, field) name is already held by another element
    pub duplicates: Vec<ContentElement>,
}

impl SyncPlan {
    /// Diff the item set against the indexed elements.
    ///
    /// Item position `p` is backed by the `p`-th ranked group. Existing
    /// elements are renamed or reordered when their name or order disagrees
    /// with that position, and their default content follows the default
    /// language. Translations are emitted only when missing or changed.
    pub fn compute(
        store: &ItemSetStore,
        schema: &SectionSchema,
        index: &ElementIndex,
        existing_translations: &[Translation],
        subsection_id: &str,
        projector: &TranslationProjector,
    ) -> Self {
        let scheme = ElementNamingScheme::new(schema.prefix);
        let fields_per_item = schema.fields_per_item();
        let languages = store.languages();
        let default_code = languages.default_language().language_code.as_str();

        let mut existing: HashMap<(&str, &str), &str> = HashMap::new();
        for t in existing_translations {
            if let Some(element) = &t.content_element {
                existing.insert((element.id(), t.language.id()), t.content.as_str());
            }
        }

        let mut plan = SyncPlan::default();
        let count = store.max_count();

        for position in 0..count {
            let mut missing = Vec::new();

            for (field_position, field) in schema.fields.iter().enumerate() {
                let name = scheme.name_for(position + 1, field.label);
                let order = order_for(position, field_position, fields_per_item);
                let default_content = store
                    .item(default_code, position)
                    .map(|item| item.get(field.key).to_string())
                    .unwrap_or_default();

                let Some(element) = index.element_at(position, field_position) else {
                    missing.push((
                        field_position,
                        NewContentElement {
                            name,
                            element_type: field.element_type.to_string(),
                            parent: subsection_id.to_string(),
                            order,
                            default_content,
                        },
                    ));
                    continue;
                };

                let patch = ContentElementPatch {
                    name: (element.name != name).then_some(name),
                    order: (element.order != order).then_some(order),
                    default_content: (element.default_content != default_content)
                        .then_some(default_content),
                };
                if !patch.is_empty() {
                    plan.updates.push(ElementUpdate {
                        element_id: element.id.clone(),
                        current_name: element.name.clone(),
                        field_position,
                        patch,
                    });
                }

                for lang in languages.iter() {
                    let Some(item) = store.item(&lang.language_code, position) else {
                        continue;
                    };
                    let row = match existing.get(&(element.id.as_str(), lang.id.as_str())) {
                        Some(current) if *current == item.get(field.key) => None,
                        Some(_) => Some(TranslationProjector::row(
                            lang,
                            item.get(field.key),
                            &element.id,
                        )),
                        None => projector.project(lang, item, field, &element.id),
                    };
                    plan.translations.extend(row);
                }
            }

            if !missing.is_empty() {
                plan.creations.push(GroupCreation {
                    position,
                    fields: missing,
                });
            }
        }

        for group in index.groups().iter().skip(count) {
            plan.stale
                .extend(index.group_elements(group).map(|(_, e)| e.clone()));
        }
        plan.duplicates = index.duplicates().cloned().collect();

        plan
    }

    /// Elements to remove when pruning: stale groups first, then duplicates.
    pub fn prunable(&self) -> Vec<ContentElement> {
        self.stale.iter().chain(&self.duplicates).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
            && self.creations.is_empty()
            && self.translations.is_empty()
            && self.stale.is_empty()
            && self.duplicates.is_empty()
    }
}

/// Backend operations to remove one item position and close the gap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    pub deletes: Vec<ContentElement>,
    /// Field position of each element in `deletes`
    pub delete_fields: Vec<usize>,
    pub renumbers: Vec<ElementUpdate>,
}

impl DeletionPlan {
    /// Delete the group backing `position` and shift every later group down
    /// by one: renamed to the previous index, order lowered by one item's
    /// worth of fields.
    pub fn compute(index: &ElementIndex, schema: &SectionSchema, position: usize) -> Self {
        let Some(removed) = index.group_at(position) else {
            return Self::default();
        };
        let scheme = ElementNamingScheme::new(schema.prefix);
        let shift = schema.fields_per_item() as i64;

        let (delete_fields, deletes): (Vec<usize>, Vec<ContentElement>) = index
            .group_elements(removed)
            .map(|(field_position, e)| (field_position, e.clone()))
            .unzip();

        let mut renumbers = Vec::new();
        for (rank, group) in index.groups().iter().enumerate().skip(position + 1) {
            // rank is 0-based, so the group's new 1-based index is `rank`
            for (field_position, element) in index.group_elements(group) {
                renumbers.push(ElementUpdate {
                    element_id: element.id.clone(),
                    current_name: element.name.clone(),
                    field_position,
                    patch: ContentElementPatch {
                        name: Some(scheme.name_for(rank, schema.fields[field_position].label)),
                        order: Some((element.order - shift).max(0)),
                        default_content: None,
                    },
                });
            }
        }

        Self {
            deletes,
            delete_fields,
            renumbers,
        }
    }

    /// Split the renumbers into those that can run and those that must wait.
    ///
    /// Renaming into a slot whose element failed to delete would give two
    /// elements the same name, and every later group renames into the slot
    /// freed by the one before it. So a failed delete of field `f` holds back
    /// every renumber of field `f`; the other fields still shift.
    pub fn split_renumbers(
        &self,
        failed_ids: &HashSet<String>,
    ) -> (Vec<ElementUpdate>, Vec<ElementUpdate>) {
        let blocked: HashSet<usize> = self
            .deletes
            .iter()
            .zip(&self.delete_fields)
            .filter(|(e, _)| failed_ids.contains(&e.id))
            .map(|(_, &field_position)| field_position)
            .collect();

        self.renumbers
            .iter()
            .cloned()
            .partition(|u| !blocked.contains(&u.field_position))
    }
}

/// Outcome of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub subsection_id: String,
    pub created_subsection: bool,
    pub elements_created: usize,
    pub elements_updated: usize,
    pub elements_deleted: usize,
    pub translations_upserted: usize,
    /// Stale and duplicate elements found
    pub stale_elements: usize,
    pub failures: Vec<ElementFailure>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of an item deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub position: usize,
    pub elements_deleted: usize,
    pub elements_renumbered: usize,
    /// Renumbers held back by a failed delete; the next save closes the gap
    pub renumbers_skipped: usize,
    /// Languages whose in-memory list lost the item
    pub languages_spliced: Vec<String>,
    pub failures: Vec<ElementFailure>,
}

impl DeleteReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Reconciler<A> {
    api: A,
    options: SyncOptions,
    projector: TranslationProjector,
    metrics: SyncMetrics,
}

impl<A: ContentApi> Reconciler<A> {
    pub fn new(api: A, options: SyncOptions) -> Self {
        Self {
            api,
            options,
            projector: TranslationProjector::new(options.empty_content),
            metrics: SyncMetrics::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Make the backend match the item set.
    ///
    /// `existing` is the subsection as last loaded; `None` means it does not
    /// exist yet and is created first. Nothing is sent when item counts differ
    /// between languages.
    pub async fn save(
        &self,
        store: &ItemSetStore,
        schema: &SectionSchema,
        target: &SubsectionTarget,
        existing: Option<&CompleteSubsection>,
    ) -> Result<SaveReport, SyncError> {
        self.save_with_prune(store, schema, target, existing, self.options.prune_stale)
            .await
    }

    /// `save`, deciding for this call whether stale and duplicate elements
    /// are deleted.
    pub async fn save_with_prune(
        &self,
        store: &ItemSetStore,
        schema: &SectionSchema,
        target: &SubsectionTarget,
        existing: Option<&CompleteSubsection>,
        prune_stale: bool,
    ) -> Result<SaveReport, SyncError> {
        let counts = CountValidator::report(store);
        if !counts.is_consistent() {
            return Err(SyncError::CountMismatch(counts));
        }

        self.metrics.record_save();
        let mut report = SaveReport::default();

        let (elements, translations) = match existing {
            Some(subsection) => {
                report.subsection_id = subsection.id.clone();
                self.sync_subsection_details(subsection, target, store, &mut report)
                    .await;
                (subsection.all_elements(), subsection.translations())
            }
            None => {
                let parent = target
                    .parent_section
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        SyncError::Precondition(format!(
                            "parent section id is required to create subsection '{}'",
                            target.slug
                        ))
                    })?;
                info!("Creating subsection '{}' under section {}", target.slug, parent);
                let created = self
                    .api
                    .create_subsection(&target.payload(store.languages()))
                    .await
                    .map_err(SyncError::SubsectionCreate)?;
                report.subsection_id = created.id;
                report.created_subsection = true;
                (Vec::new(), Vec::new())
            }
        };

        let index = ElementIndex::build(&elements, &ElementNamingScheme::new(schema.prefix), schema);
        let plan = SyncPlan::compute(
            store,
            schema,
            &index,
            &translations,
            &report.subsection_id,
            &self.projector,
        );
        debug!(
            "Plan for '{}': {} updates, {} groups to create, {} translations, {} stale, {} duplicates",
            target.slug,
            plan.updates.len(),
            plan.creations.len(),
            plan.translations.len(),
            plan.stale.len(),
            plan.duplicates.len()
        );

        report.elements_updated = self
            .apply_updates(&plan.updates, ElementOp::Update, &mut report.failures)
            .await;

        let prunable = plan.prunable();
        let mut rows = plan.translations;
        let (created, created_rows) = self
            .create_groups(store, schema, &plan.creations, &mut report.failures)
            .await;
        report.elements_created = created;
        rows.extend(created_rows);

        report.stale_elements = prunable.len();
        if !prunable.is_empty() {
            if prune_stale {
                let failed = self.delete_elements(&prunable, &mut report.failures).await;
                report.elements_deleted = prunable.len() - failed.len();
            } else {
                warn!(
                    "{} stale or duplicate elements were left in place",
                    prunable.len()
                );
            }
        }

        self.metrics.record_created(report.elements_created);
        self.metrics.record_updated(report.elements_updated);
        self.metrics.record_deleted(report.elements_deleted);
        self.metrics.record_failures(report.failures.len());

        if !rows.is_empty() {
            self.api
                .bulk_upsert_translations(&rows)
                .await
                .map_err(SyncError::TranslationUpsert)?;
            report.translations_upserted = rows.len();
            self.metrics.record_translations(rows.len());
        }

        info!(
            "Saved '{}': {} created, {} updated, {} translations, {} failures",
            target.slug,
            report.elements_created,
            report.elements_updated,
            report.translations_upserted,
            report.failures.len()
        );
        Ok(report)
    }

    /// Remove item `position` from the backend and from every language.
    ///
    /// Every language must hold the item and keep at least one other, or
    /// nothing is sent. The in-memory splice then happens whatever the backend
    /// outcome, so a failed delete or renumber never leaves the languages with
    /// different counts.
    pub async fn delete_item(
        &self,
        store: &mut ItemSetStore,
        schema: &SectionSchema,
        existing: Option<&CompleteSubsection>,
        lang: &str,
        position: usize,
    ) -> Result<DeleteReport, SyncError> {
        store.can_remove(lang, position)?;
        store.can_remove_everywhere(position)?;
        self.metrics.record_delete();

        let mut report = DeleteReport {
            position,
            ..Default::default()
        };

        if let Some(subsection) = existing {
            let elements = subsection.all_elements();
            let index =
                ElementIndex::build(&elements, &ElementNamingScheme::new(schema.prefix), schema);
            let plan = DeletionPlan::compute(&index, schema, position);

            if plan.deletes.is_empty() {
                debug!("No backend elements back {} {}", schema.prefix, position + 1);
            } else {
                info!(
                    "Deleting {} {} ({} elements, {} to renumber)",
                    schema.prefix,
                    position + 1,
                    plan.deletes.len(),
                    plan.renumbers.len()
                );
            }

            let failed = self.delete_elements(&plan.deletes, &mut report.failures).await;
            report.elements_deleted = plan.deletes.len() - failed.len();

            let (renumbers, held_back) = plan.split_renumbers(&failed);
            for update in &held_back {
                let failure = ElementFailure::blocked(update);
                warn!("{}", failure);
                report.failures.push(failure);
            }
            report.renumbers_skipped = held_back.len();
            report.elements_renumbered = self
                .apply_updates(&renumbers, ElementOp::Renumber, &mut report.failures)
                .await;
        }

        report.languages_spliced = store
            .remove_everywhere(position)
            .into_iter()
            .map(|(code, _)| code)
            .collect();

        self.metrics.record_deleted(report.elements_deleted);
        self.metrics.record_updated(report.elements_renumbered);
        self.metrics.record_failures(report.failures.len());

        Ok(report)
    }

    async fn sync_subsection_details(
        &self,
        subsection: &CompleteSubsection,
        target: &SubsectionTarget,
        store: &ItemSetStore,
        report: &mut SaveReport,
    ) {
        let renamed = subsection
            .name
            .as_deref()
            .is_some_and(|name| name != target.name);
        if !renamed || target.name.is_empty() {
            return;
        }
        if let Err(e) = self
            .api
            .update_subsection(&subsection.id, &target.payload(store.languages()))
            .await
        {
            warn!("Failed to update subsection '{}': {}", target.slug, e);
            report
                .failures
                .push(ElementFailure::new(&target.slug, ElementOp::UpdateSubsection, &e));
        }
    }

    /// Apply updates concurrently, each one independent of the others.
    /// Returns how many succeeded.
    async fn apply_updates(
        &self,
        updates: &[ElementUpdate],
        op: ElementOp,
        failures: &mut Vec<ElementFailure>,
    ) -> usize {
        if updates.is_empty() {
            return 0;
        }

        let results: Vec<(&ElementUpdate, Result<(), ApiError>)> = stream::iter(updates)
            .map(|update| async move {
                let result = self
                    .api
                    .update_content_element(&update.element_id, &update.patch)
                    .await;
                (update, result)
            })
            .buffer_unordered(self.options.concurrency.limit())
            .collect()
            .await;

        let mut ok = 0;
        for (update, result) in results {
            match result {
                Ok(()) => ok += 1,
                Err(e) => {
                    warn!("Failed to {} '{}': {}", op, update.current_name, e);
                    failures.push(ElementFailure::new(&update.current_name, op, &e));
                }
            }
        }
        ok
    }

    /// Delete elements concurrently, each one independent of the others.
    /// Returns the ids of the elements that could not be deleted.
    async fn delete_elements(
        &self,
        elements: &[ContentElement],
        failures: &mut Vec<ElementFailure>,
    ) -> HashSet<String> {
        let results = join_all(elements.iter().map(|element| async move {
            (element, self.api.delete_content_element(&element.id).await)
        }))
        .await;

        let mut failed = HashSet::new();
        for (element, result) in results {
            if let Err(e) = result {
                warn!("Failed to delete '{}': {}", element.name, e);
                failures.push(ElementFailure::new(&element.name, ElementOp::Delete, &e));
                failed.insert(element.id.clone());
            }
        }
        failed
    }

    /// Create missing groups. Fields of one group are created together;
    /// groups are processed in position order, at most `concurrency` at a time.
    ///
    /// Returns the number of elements created and the translation rows for them.
    async fn create_groups(
        &self,
        store: &ItemSetStore,
        schema: &SectionSchema,
        creations: &[GroupCreation],
        failures: &mut Vec<ElementFailure>,
    ) -> (usize, Vec<TranslationPayload>) {
        let outcomes: Vec<(&GroupCreation, Vec<Result<(usize, ContentElement), (String, ApiError)>>)> =
            stream::iter(creations)
                .map(|group| async move { (group, self.create_group(group).await) })
                .buffered(self.options.concurrency.limit())
                .collect()
                .await;

        let mut created = 0;
        let mut rows = Vec::new();
        for (group, results) in outcomes {
            for result in results {
                match result {
                    Ok((field_position, element)) => {
                        created += 1;
                        let field = &schema.fields[field_position];
                        for lang in store.languages().iter() {
                            if let Some(item) = store.item(&lang.language_code, group.position) {
                                rows.extend(self.projector.project(lang, item, field, &element.id));
                            }
                        }
                    }
                    Err((name, e)) => {
                        warn!("Failed to create '{}': {}", name, e);
                        failures.push(ElementFailure::new(&name, ElementOp::Create, &e));
                    }
                }
            }
        }
        (created, rows)
    }

    async fn create_group(
        &self,
        group: &GroupCreation,
    ) -> Vec<Result<(usize, ContentElement), (String, ApiError)>> {
        join_all(group.fields.iter().map(|(field_position, data)| async move {
            self.api
                .create_content_element(data)
                .await
                .map(|element| (*field_position, element))
                .map_err(|e| (data.name.clone(), e))
        }))
        .await
    }
}

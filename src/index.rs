//! Lookup table from item positions to backend content elements.
//!
//! Built once per load/save cycle: names are parsed a single time, elements
//! live in an arena, and groups refer to them by slot. Everything downstream
//! (loading, save planning, renumbering) works on positions and slots rather
//! than re-matching names.

use crate::model::ContentElement;
use crate::naming::ElementNamingScheme;
use crate::schema::SectionSchema;
use std::collections::BTreeMap;
use tracing::warn;

/// The elements backing one item, one optional slot per schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementGroup {
    /// 1-based index parsed from the element names
    pub index: usize,
    /// Arena slot per field position
    pub slots: Vec<Option<usize>>,
}

#[derive(Debug, Clone)]
pub struct ElementIndex {
    arena: Vec<ContentElement>,
    /// Groups sorted by parsed index; position in this vec is the item position
    groups: Vec<ElementGroup>,
    /// Slots of elements outside the repeating group (e.g. "Section Title")
    foreign: Vec<usize>,
    /// Slots of elements whose (index, field) was already taken
    duplicates: Vec<usize>,
}

impl ElementIndex {
    pub fn build(
        elements: &[ContentElement],
        scheme: &ElementNamingScheme,
        schema: &SectionSchema,
    ) -> Self {
        let fields = schema.fields_per_item();
        let mut arena: Vec<ContentElement> = elements.to_vec();
        // Lowest order first so the first claimant of a slot is the oldest.
        arena.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let mut by_index: BTreeMap<usize, Vec<Option<usize>>> = BTreeMap::new();
        let mut foreign = Vec::new();
        let mut duplicates = Vec::new();

        for (slot, element) in arena.iter().enumerate() {
            let field = scheme.parse(&element.name).and_then(|parsed| {
                parsed
                    .remainder
                    .as_deref()
                    .and_then(|label| schema.position_of_label(label))
                    .map(|position| (parsed.index, position))
            });

            let Some((index, position)) = field else {
                foreign.push(slot);
                continue;
            };

            let group = by_index.entry(index).or_insert_with(|| vec![None; fields]);
            if group[position].is_some() {
                warn!(
                    "Duplicate element '{}' ({}), keeping the first one",
                    element.name, element.id
                );
                duplicates.push(slot);
            } else {
                group[position] = Some(slot);
            }
        }

        let groups = by_index
            .into_iter()
            .map(|(index, slots)| ElementGroup { index, slots })
            .collect();

        Self {
            arena,
            groups,
            foreign,
            duplicates,
        }
    }

    /// Groups ordered by parsed index. The `p`-th group backs item position `p`.
    pub fn groups(&self) -> &[ElementGroup] {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_at(&self, position: usize) -> Option<&ElementGroup> {
        self.groups.get(position)
    }

    pub fn element(&self, slot: usize) -> &ContentElement {
        &self.arena[slot]
    }

    /// Element backing field `field_position` of the item at `position`.
    pub fn element_at(&self, position: usize, field_position: usize) -> Option<&ContentElement> {
        self.group_at(position)
            .and_then(|g| g.slots.get(field_position).copied().flatten())
            .map(|slot| &self.arena[slot])
    }

    /// All elements of a group, in field order.
    pub fn group_elements<'a>(
        &'a self,
        group: &'a ElementGroup,
    ) -> impl Iterator<Item = (usize, &'a ContentElement)> + 'a {
        group
            .slots
            .iter()
            .enumerate()
            .filter_map(move |(pos, slot)| slot.map(|s| (pos, &self.arena[s])))
    }

    pub fn foreign(&self) -> impl Iterator<Item = &ContentElement> {
        self.foreign.iter().map(|&s| &self.arena[s])
    }

    pub fn duplicates(&self) -> impl Iterator<Item = &ContentElement> {
        self.duplicates.iter().map(|&s| &self.arena[s])
    }
}

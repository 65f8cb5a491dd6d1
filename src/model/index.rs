//! Prefix index and entity map
//!
//! A `DataSet` is what a reader produces and what the resolver borrows. The
//! same key can appear several times (a prefix owned by different entities
//! over time), so every key maps to a list of competing patterns ordered by
//! window start. For one date at most one of them should be valid; overlaps
//! are a data-quality defect and are reported, not rejected.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::{Entity, Pattern, PatternKind, Provider, ProviderCapabilities};
use crate::error::LoadError;

/// Record counts for a loaded data set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataSetStats {
    pub entity_count: usize,
    pub prefix_count: usize,
    pub exception_count: usize,
    pub zone_exception_count: usize,
    pub invalid_count: usize,
}

/// Two patterns on the same key whose windows overlap
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub key: String,
    pub kind: PatternKind,
    pub first: super::Validity,
    pub second: super::Validity,
}

type PatternMap = HashMap<String, Vec<Pattern>>;

/// An immutable, fully loaded reference data set
#[derive(Debug, Clone)]
pub struct DataSet {
    provider: Provider,
    version: String,
    entities: BTreeMap<i32, Entity>,
    prefixes: PatternMap,
    exceptions: PatternMap,
    zone_exceptions: PatternMap,
    invalid: PatternMap,
    max_prefix_len: usize,
    overlaps: Vec<Overlap>,
}

impl DataSet {
    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn capabilities(&self) -> ProviderCapabilities {
        self.provider.capabilities()
    }

    /// Version or timestamp string embedded in the source file
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entity(&self, id: i32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// All entities ordered by id
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Longest prefix key in the index, bounds the prefix walk
    pub fn max_prefix_len(&self) -> usize {
        self.max_prefix_len
    }

    /// Competing prefix/filter patterns for an exact prefix key
    pub fn prefix_candidates(&self, key: &str) -> &[Pattern] {
        self.prefixes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Prefix or filter pattern for `key` valid on `date`
    pub fn prefix(&self, key: &str, date: NaiveDate) -> Option<&Pattern> {
        find_valid(&self.prefixes, key, date)
    }

    pub fn exception(&self, call: &str, date: NaiveDate) -> Option<&Pattern> {
        find_valid(&self.exceptions, call, date)
    }

    pub fn zone_exception(&self, call: &str, date: NaiveDate) -> Option<&Pattern> {
        find_valid(&self.zone_exceptions, call, date)
    }

    pub fn invalid(&self, call: &str, date: NaiveDate) -> Option<&Pattern> {
        find_valid(&self.invalid, call, date)
    }

    /// All prefix keys that point at an entity, sorted
    pub fn prefixes_for_entity(&self, entity_id: i32) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .prefixes
            .iter()
            .filter(|(_, list)| list.iter().any(|p| p.entity == entity_id))
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn stats(&self) -> DataSetStats {
        DataSetStats {
            entity_count: self.entities.len(),
            prefix_count: count(&self.prefixes),
            exception_count: count(&self.exceptions),
            zone_exception_count: count(&self.zone_exceptions),
            invalid_count: count(&self.invalid),
        }
    }

    /// Keys whose pattern lists contain overlapping windows
    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }
}

fn find_valid<'a>(map: &'a PatternMap, key: &str, date: NaiveDate) -> Option<&'a Pattern> {
    map.get(key)?.iter().find(|p| p.validity.contains(date))
}

fn count(map: &PatternMap) -> usize {
    map.values().map(Vec::len).sum()
}

/// Accumulates records while a reader runs.
///
/// Dropping a builder without calling `finish` discards everything it
/// collected, which is how a failed load leaves no partial state behind.
#[derive(Debug)]
pub struct DataSetBuilder {
    provider: Provider,
    version: Option<String>,
    entities: BTreeMap<i32, Entity>,
    prefixes: PatternMap,
    exceptions: PatternMap,
    zone_exceptions: PatternMap,
    invalid: PatternMap,
    strict_overlaps: bool,
}

impl DataSetBuilder {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            version: None,
            entities: BTreeMap::new(),
            prefixes: HashMap::new(),
            exceptions: HashMap::new(),
            zone_exceptions: HashMap::new(),
            invalid: HashMap::new(),
            strict_overlaps: true,
        }
    }

    /// Report overlapping windows at warn level (default) or debug level
    pub fn strict_overlaps(mut self, strict: bool) -> Self {
        self.strict_overlaps = strict;
        self
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn entity(&self, id: i32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Add an entity. Negative ids are rejected since -1 is the invalid sentinel.
    /// Returns false when the entity was not added.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if entity.id < 0 {
            log::warn!("Skipping entity '{}' with reserved id {}", entity.name, entity.id);
            return false;
        }
        if let Some(previous) = self.entities.get(&entity.id) {
            log::warn!(
                "Duplicate entity id {}: '{}' replaces '{}'",
                entity.id,
                entity.name,
                previous.name
            );
        }
        self.entities.insert(entity.id, entity);
        true
    }

    pub fn add_pattern(&mut self, pattern: Pattern) {
        if pattern.key.is_empty() {
            log::warn!("Skipping {} with empty key", pattern.kind.as_str());
            return;
        }
        let map = match pattern.kind {
            PatternKind::Prefix | PatternKind::Filter => &mut self.prefixes,
            PatternKind::Exception => &mut self.exceptions,
            PatternKind::ZoneException => &mut self.zone_exceptions,
            PatternKind::Invalid => &mut self.invalid,
        };
        map.entry(pattern.key.clone()).or_default().push(pattern);
    }

    /// Seal the builder into an immutable data set
    pub fn finish(self) -> Result<DataSet, LoadError> {
        if self.entities.is_empty() {
            return Err(LoadError::Empty);
        }

        let mut overlaps = Vec::new();
        let mut prefixes = self.prefixes;
        let mut exceptions = self.exceptions;
        let mut zone_exceptions = self.zone_exceptions;
        let mut invalid = self.invalid;
        for map in [&mut prefixes, &mut exceptions, &mut zone_exceptions, &mut invalid] {
            order_and_check(map, &mut overlaps);
        }

        for overlap in &overlaps {
            if self.strict_overlaps {
                log::warn!(
                    "Overlapping {} windows on '{}': {} and {}",
                    overlap.kind.as_str(),
                    overlap.key,
                    overlap.first,
                    overlap.second
                );
            } else {
                log::debug!(
                    "Overlapping {} windows on '{}': {} and {}",
                    overlap.kind.as_str(),
                    overlap.key,
                    overlap.first,
                    overlap.second
                );
            }
        }

        let max_prefix_len = prefixes.keys().map(String::len).max().unwrap_or(0);

        Ok(DataSet {
            provider: self.provider,
            version: self.version.unwrap_or_default(),
            entities: self.entities,
            prefixes,
            exceptions,
            zone_exceptions,
            invalid,
            max_prefix_len,
            overlaps,
        })
    }
}

/// Sort each list by window start (unbounded first) and collect overlaps
fn order_and_check(map: &mut PatternMap, overlaps: &mut Vec<Overlap>) {
    for (key, list) in map.iter_mut() {
        list.sort_by_key(|p| p.validity.start);
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                if a.validity.overlaps(&b.validity) {
                    overlaps.push(Overlap {
                        key: key.clone(),
                        kind: a.kind,
                        first: a.validity,
                        second: b.validity,
                    });
                }
            }
        }
    }
}

// Caller-owned memo of the last resolution
//
// The resolver itself keeps no state. Call sites that resolve the same
// callsign repeatedly (a log entry form re-reading name, zone, continent...)
// hold one of these and ask it instead. The entry also remembers which data
// set answered, so a reload invalidates it without an explicit clear().

use chrono::NaiveDate;

use super::callsign::normalize;
use super::{Resolution, Resolver, Role};
use crate::model::DataSet;

/// Identity of a loaded data set: its address and its version string
#[derive(Debug, Clone, PartialEq, Eq)]
struct Source {
    addr: usize,
    version: String,
}

impl Source {
    fn of(data: &DataSet) -> Self {
        Self {
            addr: data as *const DataSet as usize,
            version: data.version().to_string(),
        }
    }
}

/// Single-entry cache keyed by (data set, callsign, date)
#[derive(Debug, Default)]
pub struct ResolutionCache {
    last: Option<(Source, Resolution)>,
    hits: u64,
    misses: u64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached resolution when data set, callsign and date are
    /// unchanged, otherwise resolve and remember the result
    pub fn resolve(
        &mut self,
        resolver: &Resolver<'_>,
        call: &str,
        date: NaiveDate,
        role: Role,
    ) -> Resolution {
        let call = normalize(call);
        let source = Source::of(resolver.data());
        if let Some((cached_source, last)) = &self.last {
            if *cached_source == source && last.call() == call && last.date() == date {
                self.hits += 1;
                return last.clone().with_role(role);
            }
        }

        self.misses += 1;
        let res = resolver.resolve(&call, date, role);
        self.last = Some((source, res.clone()));
        res
    }

    /// The last resolution, if any, for accessor-style reads
    pub fn last(&self) -> Option<&Resolution> {
        self.last.as_ref().map(|(_, res)| res)
    }

    /// Forget the cached entry
    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::model::{DataSetBuilder, Entity, Pattern, PatternKind, Provider};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn data() -> DataSet {
        let mut b = DataSetBuilder::new(Provider::CtyCsv);
        b.add_entity(Entity::new(279, "GM", "Scotland"));
        b.add_pattern(Pattern::new("GM", PatternKind::Prefix, 279).with_cq_zone(14));
        b.finish().unwrap()
    }

    #[test]
    fn test_second_call_is_served_from_cache() {
        let data = data();
        let resolver = Resolver::new(&data);
        let mut cache = ResolutionCache::new();

        let first = cache.resolve(&resolver, "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        let second = cache.resolve(&resolver, "gm3zza", d(2024, 1, 1), Role::Theirs);
        assert_eq!(first, second);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.last().and_then(|r| r.cq_zone()), Some(14));
    }

    #[test]
    fn test_changed_date_or_call_recomputes() {
        let data = data();
        let resolver = Resolver::new(&data);
        let mut cache = ResolutionCache::new();

        cache.resolve(&resolver, "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        cache.resolve(&resolver, "GM3ZZA", d(2024, 1, 2), Role::Theirs);
        cache.resolve(&resolver, "GM4AAA", d(2024, 1, 2), Role::Theirs);
        assert_eq!(cache.misses(), 3);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn test_role_change_is_a_hit() {
        let data = data();
        let resolver = Resolver::new(&data);
        let mut cache = ResolutionCache::new();

        cache.resolve(&resolver, "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        let mine = cache.resolve(&resolver, "GM3ZZA", d(2024, 1, 1), Role::Mine);
        assert_eq!(mine.role(), Role::Mine);
        assert_eq!(cache.hits(), 1);

        cache.clear();
        assert!(cache.last().is_none());
    }

    #[test]
    fn test_reload_invalidates_without_clear() {
        let mut engine = Engine::new(data());
        let mut cache = ResolutionCache::new();
        let first = cache.resolve(&engine.resolver(), "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        assert_eq!(first.cq_zone(), Some(14));

        let csv = "prefix,name,dxcc,continent,cq,itu,lat,lon,tz,patterns\nGM,Scotland,279,EU,40,27,56,-4,0,\"GM,=VER2;\"\n";
        engine
            .reload_from_reader(
                Provider::CtyCsv,
                csv.as_bytes(),
                crate::readers::ReadOptions::default(),
                None,
            )
            .unwrap();

        let second = cache.resolve(&engine.resolver(), "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        assert_eq!(second.cq_zone(), Some(40));
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn test_other_data_set_is_a_miss() {
        let a = data();
        let b = data();
        let mut cache = ResolutionCache::new();
        cache.resolve(&Resolver::new(&a), "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        cache.resolve(&Resolver::new(&b), "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        cache.resolve(&Resolver::new(&b), "GM3ZZA", d(2024, 1, 1), Role::Theirs);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 1);
    }
}

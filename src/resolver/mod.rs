// Callsign resolution
//
// Resolution order for a callsign on a date:
//   1. invalid list (exact call)        → entity -1, stops here
//   2. exception list (exact call)      → every field from the exception
//   3. zone-exception list (exact call) → CQ zone only
//   4. prefix index                     → alternate segment first, then body,
//                                         longest prefix first
//
// Pattern fields override entity defaults; an unset pattern field falls back
// to the entity record. Resolution never fails: a miss comes back as
// Provenance::NoDecode with the entity unresolved.

pub mod cache;
pub mod callsign;

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use crate::locator;
use crate::model::{
    Continent, Coordinates, DataSet, Entity, Pattern, INVALID_ENTITY,
};
use callsign::{decompose, normalize, prefixes_of, CallParts};

pub use cache::ResolutionCache;

/// Whose record fields the caller is populating. Never alters the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The logging station (MY_* fields)
    Mine,
    /// The worked station
    Theirs,
}

/// Which rule produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    NoDecode,
    Invalid,
    Exception,
    ZoneException,
    DefaultPrefix,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::NoDecode => "no-decode",
            Provenance::Invalid => "invalid",
            Provenance::Exception => "exception",
            Provenance::ZoneException => "zone-exception",
            Provenance::DefaultPrefix => "default-prefix",
        }
    }
}

/// Everything known about one callsign on one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    call: String,
    date: NaiveDate,
    role: Role,
    entity: Option<i32>,
    nickname: Option<String>,
    name: Option<String>,
    cq_zone: Option<i32>,
    itu_zone: Option<u8>,
    continent: Option<Continent>,
    coordinates: Option<Coordinates>,
    timezone: Option<f32>,
    region: Option<String>,
    deleted: bool,
    matched: Option<String>,
    provenance: Provenance,
    tip: String,
}

impl Resolution {
    fn empty(call: String, date: NaiveDate, role: Role) -> Self {
        Self {
            call,
            date,
            role,
            entity: None,
            nickname: None,
            name: None,
            cq_zone: None,
            itu_zone: None,
            continent: None,
            coordinates: None,
            timezone: None,
            region: None,
            deleted: false,
            matched: None,
            provenance: Provenance::NoDecode,
            tip: String::new(),
        }
    }

    pub fn call(&self) -> &str {
        &self.call
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Same resolution, populated for another role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// DXCC entity id: -1 for invalid operations, 0 for no entity,
    /// `None` when nothing matched
    pub fn entity_id(&self) -> Option<i32> {
        self.entity
    }

    pub fn is_resolved(&self) -> bool {
        self.entity.is_some()
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// CQ zone; -1 for invalid operations
    pub fn cq_zone(&self) -> Option<i32> {
        self.cq_zone
    }

    pub fn itu_zone(&self) -> Option<u8> {
        self.itu_zone
    }

    pub fn continent(&self) -> Option<Continent> {
        self.continent
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn timezone(&self) -> Option<f32> {
        self.timezone
    }

    /// Geographic subdivision of the matched prefix, when known
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// The prefix or exact call that produced this resolution
    pub fn matched(&self) -> Option<&str> {
        self.matched.as_deref()
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Human-readable explanation of how the callsign was resolved
    pub fn tip(&self) -> &str {
        &self.tip
    }

    /// 4-character Maidenhead locator of the resolved coordinates
    pub fn locator(&self) -> Option<String> {
        let c = self.coordinates?;
        locator::latlon_to_grid(c.lat, c.lon, 4)
    }

    /// ADIF field name/value pairs for this resolution.
    ///
    /// The role picks `MY_*` names for the logging station. Invalid and
    /// unresolved calls populate nothing.
    pub fn record_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let entity = match self.entity {
            Some(id) if id >= 0 => id,
            _ => return fields,
        };

        let (dxcc, country, cqz, ituz) = match self.role {
            Role::Mine => ("MY_DXCC", "MY_COUNTRY", "MY_CQ_ZONE", "MY_ITU_ZONE"),
            Role::Theirs => ("DXCC", "COUNTRY", "CQZ", "ITUZ"),
        };

        fields.push((dxcc, entity.to_string()));
        if let Some(name) = &self.name {
            fields.push((country, name.clone()));
        }
        if self.role == Role::Theirs {
            if let Some(cont) = self.continent {
                fields.push(("CONT", cont.to_string()));
            }
        }
        if let Some(cq) = self.cq_zone {
            fields.push((cqz, cq.to_string()));
        }
        if let Some(itu) = self.itu_zone {
            fields.push((ituz, itu.to_string()));
        }
        fields
    }
}

/// Resolves callsigns against a borrowed, immutable data set
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    data: &'a DataSet,
}

impl<'a> Resolver<'a> {
    pub fn new(data: &'a DataSet) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &'a DataSet {
        self.data
    }

    /// Resolve a callsign as of `date`
    pub fn resolve(&self, call: &str, date: NaiveDate, role: Role) -> Resolution {
        let call = normalize(call);
        let mut res = Resolution::empty(call.clone(), date, role);

        if let Some(invalid) = self.data.invalid(&call, date) {
            log::debug!("{}: invalid operation ({})", call, invalid.validity);
            res.entity = Some(INVALID_ENTITY);
            res.cq_zone = Some(-1);
            res.matched = Some(invalid.key.clone());
            res.provenance = Provenance::Invalid;
            res.tip = format!("{}: invalid operation ({})", call, invalid.validity);
            return res;
        }

        if let Some(exception) = self.data.exception(&call, date) {
            log::debug!("{}: exception hit for entity {}", call, exception.entity);
            let entity = self.data.entity(exception.entity);
            self.fill(&mut res, exception, entity, exception.cq_zone);
            res.provenance = Provenance::Exception;
            res.tip = self.tip(&res, exception, None);
            return res;
        }

        let zone_exception = self.data.zone_exception(&call, date);
        if let Some(zx) = zone_exception {
            log::debug!("{}: zone exception hit, CQ zone {:?}", call, zx.cq_zone);
        }

        let parts = match decompose(&call) {
            Some(parts) => parts,
            None => {
                log::warn!("Cannot parse callsign '{}'", call);
                if let Some(zx) = zone_exception {
                    res.cq_zone = zx.cq_zone.map(i32::from);
                    res.provenance = Provenance::ZoneException;
                }
                res.tip = format!("{}: cannot parse callsign", call);
                return res;
            }
        };

        match self.match_prefix(&parts, date) {
            Some(prefix) => {
                let entity = self.data.entity(prefix.entity);
                let cq = zone_exception.and_then(|zx| zx.cq_zone).or(prefix.cq_zone);
                self.fill(&mut res, prefix, entity, cq);
                res.provenance = if zone_exception.is_some() {
                    Provenance::ZoneException
                } else {
                    Provenance::DefaultPrefix
                };
                res.tip = self.tip(&res, prefix, zone_exception);
            }
            None => {
                log::warn!("{}: no prefix match on {}", call, date);
                if let Some(zx) = zone_exception {
                    res.cq_zone = zx.cq_zone.map(i32::from);
                    res.provenance = Provenance::ZoneException;
                }
                res.tip = format!("{}: no DXCC match", call);
            }
        }
        res
    }

    /// Walk decreasing-length prefixes of the alternate, then of the body
    fn match_prefix(&self, parts: &CallParts, date: NaiveDate) -> Option<&'a Pattern> {
        let max_len = self.data.max_prefix_len();
        let candidates = parts.alternate.iter().chain(std::iter::once(&parts.body));
        for segment in candidates {
            for key in prefixes_of(segment, max_len) {
                if let Some(pattern) = self.data.prefix(key, date) {
                    return Some(pattern);
                }
            }
        }
        None
    }

    /// Copy pattern fields, falling back to entity defaults
    fn fill(
        &self,
        res: &mut Resolution,
        pattern: &Pattern,
        entity: Option<&Entity>,
        cq_zone: Option<u8>,
    ) {
        res.entity = Some(pattern.entity);
        res.matched = Some(pattern.key.clone());
        res.region = pattern.region.clone();
        res.cq_zone = cq_zone.or(entity.and_then(|e| e.cq_zone)).map(i32::from);
        res.itu_zone = pattern.itu_zone.or(entity.and_then(|e| e.itu_zone));
        res.continent = pattern.continent.or(entity.and_then(|e| e.continent));
        res.coordinates = pattern.coordinates.or(entity.and_then(|e| e.coordinates));
        res.timezone = pattern.timezone.or(entity.and_then(|e| e.timezone));
        if let Some(e) = entity {
            res.nickname = Some(e.nickname.clone());
            res.name = Some(e.name.clone());
            res.deleted = e.deleted;
        }
    }

    fn tip(&self, res: &Resolution, pattern: &Pattern, zone_exception: Option<&Pattern>) -> String {
        let mut tip = format!(
            "{}: {} [{}]",
            res.call,
            res.name.as_deref().unwrap_or("unknown entity"),
            pattern.entity
        );
        if res.provenance == Provenance::Exception {
            let _ = write!(tip, " by exception ({})", pattern.validity);
        } else {
            let _ = write!(tip, " via prefix {}", pattern.key);
            if let Some(region) = &pattern.region {
                let _ = write!(tip, " ({})", region);
            }
        }
        if let Some(cq) = res.cq_zone {
            let _ = write!(tip, ", CQ {}", cq);
        }
        if let Some(itu) = res.itu_zone {
            let _ = write!(tip, ", ITU {}", itu);
        }
        if let Some(cont) = res.continent {
            let _ = write!(tip, ", {}", cont);
        }
        if zone_exception.is_some() {
            tip.push_str("; CQ zone by zone exception");
        }
        if res.deleted {
            tip.push_str(" (deleted entity)");
        }
        tip
    }
}

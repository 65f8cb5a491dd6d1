// Field-by-field reconciliation of two records for the same key
//
// merge() fills every unset field of the target from the source and reports
// fields where both sides are set and disagree. It never overwrites a set
// field, so the caller ranks sources by choosing which one is the target.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

use crate::error::MergeError;
use crate::model::{Entity, Pattern};

/// One record of the data model, tagged by what it describes
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Entity(Entity),
    Prefix(Pattern),
    Exception(Pattern),
    Filter(Pattern),
    /// A prefix scoped to a subdivision; `region` names it
    Geography(Pattern),
}

impl Element {
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Entity(_) => "entity",
            Element::Prefix(_) => "prefix",
            Element::Exception(_) => "exception",
            Element::Filter(_) => "filter",
            Element::Geography(_) => "geography",
        }
    }

    /// Entity id for entities, pattern key for everything else
    pub fn key(&self) -> String {
        match self {
            Element::Entity(e) => e.id.to_string(),
            Element::Prefix(p)
            | Element::Exception(p)
            | Element::Filter(p)
            | Element::Geography(p) => p.key.clone(),
        }
    }
}

/// Bit set of fields where target and source disagreed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Clash(u8);

impl Clash {
    pub const NONE: Clash = Clash(0);
    pub const CQ_ZONE: Clash = Clash(1 << 0);
    pub const ITU_ZONE: Clash = Clash(1 << 1);
    pub const CONTINENT: Clash = Clash(1 << 2);
    pub const COORDINATES: Clash = Clash(1 << 3);
    pub const NAME: Clash = Clash(1 << 4);
    pub const DELETED: Clash = Clash(1 << 5);
    pub const ENTITY: Clash = Clash(1 << 6);

    const NAMES: [(Clash, &'static str); 7] = [
        (Clash::CQ_ZONE, "cq_zone"),
        (Clash::ITU_ZONE, "itu_zone"),
        (Clash::CONTINENT, "continent"),
        (Clash::COORDINATES, "coordinates"),
        (Clash::NAME, "name"),
        (Clash::DELETED, "deleted"),
        (Clash::ENTITY, "entity"),
    ];

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Clash) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the clashing fields, in bit order
    pub fn fields(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for Clash {
    type Output = Clash;

    fn bitor(self, rhs: Clash) -> Clash {
        Clash(self.0 | rhs.0)
    }
}

impl BitOrAssign for Clash {
    fn bitor_assign(&mut self, rhs: Clash) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Clash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", self.fields().join(","))
    }
}

/// Fill `target` from `source`, returning the fields both set differently
pub fn merge(target: &mut Element, source: &Element) -> Result<Clash, MergeError> {
    let clash = match (target, source) {
        (Element::Entity(into), Element::Entity(from)) => {
            if into.id != from.id {
                return Err(MergeError::KeyMismatch(
                    into.id.to_string(),
                    from.id.to_string(),
                ));
            }
            merge_entity(into, from)
        }
        (Element::Prefix(into), Element::Prefix(from))
        | (Element::Exception(into), Element::Exception(from))
        | (Element::Filter(into), Element::Filter(from))
        | (Element::Geography(into), Element::Geography(from)) => {
            if into.key != from.key {
                return Err(MergeError::KeyMismatch(into.key.clone(), from.key.clone()));
            }
            merge_pattern(into, from)
        }
        (into, from) => {
            return Err(MergeError::KindMismatch {
                into: into.kind(),
                from: from.kind(),
            })
        }
    };

    if !clash.is_empty() {
        log::debug!("Merge of '{}' clashed on {}", source.key(), clash);
    }
    Ok(clash)
}

/// Adopt `from` when `into` is unset, flag `bit` when both are set and differ
fn fill<T: PartialEq + Clone>(into: &mut Option<T>, from: &Option<T>, bit: Clash) -> Clash {
    match (into.as_ref(), from) {
        (None, Some(value)) => {
            *into = Some(value.clone());
            Clash::NONE
        }
        (Some(a), Some(b)) if a != b => bit,
        _ => Clash::NONE,
    }
}

fn merge_entity(into: &mut Entity, from: &Entity) -> Clash {
    let mut clash = Clash::NONE;
    clash |= fill(&mut into.cq_zone, &from.cq_zone, Clash::CQ_ZONE);
    clash |= fill(&mut into.itu_zone, &from.itu_zone, Clash::ITU_ZONE);
    clash |= fill(&mut into.continent, &from.continent, Clash::CONTINENT);
    clash |= fill(&mut into.coordinates, &from.coordinates, Clash::COORDINATES);
    if into.timezone.is_none() {
        into.timezone = from.timezone;
    }

    if into.name.is_empty() {
        into.name = from.name.clone();
    } else if !from.name.is_empty() && !into.name.eq_ignore_ascii_case(&from.name) {
        clash |= Clash::NAME;
    }
    if into.nickname.is_empty() {
        into.nickname = from.nickname.clone();
    }

    // `deleted` is always set, so any disagreement is a clash
    if into.deleted != from.deleted {
        clash |= Clash::DELETED;
    }
    clash
}

fn merge_pattern(into: &mut Pattern, from: &Pattern) -> Clash {
    let mut clash = Clash::NONE;
    if into.entity != from.entity {
        clash |= Clash::ENTITY;
    }
    clash |= fill(&mut into.cq_zone, &from.cq_zone, Clash::CQ_ZONE);
    clash |= fill(&mut into.itu_zone, &from.itu_zone, Clash::ITU_ZONE);
    clash |= fill(&mut into.continent, &from.continent, Clash::CONTINENT);
    clash |= fill(&mut into.coordinates, &from.coordinates, Clash::COORDINATES);
    clash |= fill(&mut into.region, &from.region, Clash::NAME);
    if into.timezone.is_none() {
        into.timezone = from.timezone;
    }
    clash
}

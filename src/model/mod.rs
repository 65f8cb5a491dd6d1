// Unified data model for DXCC reference data
//
// All three readers produce these types. A loaded model is immutable; a
// reload builds a fresh DataSet and swaps it in whole.
//
// Entity ids follow the ARRL DXCC numbering (ADIF DXCC field):
// - 0  = no DXCC entity (maritime mobile, special use)
// - -1 = invalid operation, a resolver sentinel that never appears in the map

pub mod index;
pub mod provider;
pub mod validity;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use index::{DataSet, DataSetBuilder, DataSetStats, Overlap};
pub use provider::{Provider, ProviderCapabilities};
pub use validity::Validity;

/// Entity id for "no DXCC entity"
pub const NO_ENTITY: i32 = 0;
/// Entity id reported for invalid (unauthorized) operations
pub const INVALID_ENTITY: i32 = -1;

/// Two-letter continent code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Continent {
    NA,
    SA,
    EU,
    AF,
    AS,
    OC,
    AN,
}

impl Continent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Continent::NA => "NA",
            Continent::SA => "SA",
            Continent::EU => "EU",
            Continent::AF => "AF",
            Continent::AS => "AS",
            Continent::OC => "OC",
            Continent::AN => "AN",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Continent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NA" => Ok(Continent::NA),
            "SA" => Ok(Continent::SA),
            "EU" => Ok(Continent::EU),
            "AF" => Ok(Continent::AF),
            "AS" => Ok(Continent::AS),
            "OC" => Ok(Continent::OC),
            "AN" => Ok(Continent::AN),
            other => Err(format!("unknown continent '{}'", other)),
        }
    }
}

/// Latitude/longitude in decimal degrees, north and east positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A DXCC entity (country or administrative unit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i32,
    /// Default (primary) prefix, e.g. "GM"
    pub nickname: String,
    pub name: String,
    pub cq_zone: Option<u8>,
    pub itu_zone: Option<u8>,
    pub continent: Option<Continent>,
    pub coordinates: Option<Coordinates>,
    /// UTC offset in hours
    pub timezone: Option<f32>,
    pub deleted: bool,
    pub validity: Validity,
}

impl Entity {
    pub fn new(id: i32, nickname: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            name: name.into(),
            cq_zone: None,
            itu_zone: None,
            continent: None,
            coordinates: None,
            timezone: None,
            deleted: false,
            validity: Validity::ALWAYS,
        }
    }
}

/// What a pattern does when it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Leading characters of a callsign identify the entity
    Prefix,
    /// Exact callsign, overrides every prefix-derived field
    Exception,
    /// Exact callsign, overrides the CQ zone only
    ZoneException,
    /// Exact callsign of an unauthorized operation
    Invalid,
    /// Special-use prefix (geography/usage filter), matched like a prefix
    Filter,
}

impl PatternKind {
    /// Exact-call kinds are looked up by the whole callsign, never by prefix
    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            PatternKind::Exception | PatternKind::ZoneException | PatternKind::Invalid
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Prefix => "prefix",
            PatternKind::Exception => "exception",
            PatternKind::ZoneException => "zone exception",
            PatternKind::Invalid => "invalid",
            PatternKind::Filter => "filter",
        }
    }
}

/// A prefix or exact callsign mapped to an entity and optional overrides.
///
/// For `ZoneException` only `cq_zone` is meaningful and `entity` is
/// `NO_ENTITY`; for `Invalid` `entity` is `INVALID_ENTITY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Prefix or exact callsign, always uppercase
    pub key: String,
    pub kind: PatternKind,
    pub entity: i32,
    pub cq_zone: Option<u8>,
    pub itu_zone: Option<u8>,
    pub continent: Option<Continent>,
    pub coordinates: Option<Coordinates>,
    pub timezone: Option<f32>,
    /// Geographic subdivision name (province, oblast, island group)
    pub region: Option<String>,
    pub validity: Validity,
}

impl Pattern {
    pub fn new(key: impl AsRef<str>, kind: PatternKind, entity: i32) -> Self {
        Self {
            key: key.as_ref().trim().to_ascii_uppercase(),
            kind,
            entity,
            cq_zone: None,
            itu_zone: None,
            continent: None,
            coordinates: None,
            timezone: None,
            region: None,
            validity: Validity::ALWAYS,
        }
    }

    pub fn invalid(call: impl AsRef<str>, validity: Validity) -> Self {
        Self {
            validity,
            ..Self::new(call, PatternKind::Invalid, INVALID_ENTITY)
        }
    }

    pub fn zone_exception(call: impl AsRef<str>, zone: u8, validity: Validity) -> Self {
        Self {
            cq_zone: Some(zone),
            validity,
            ..Self::new(call, PatternKind::ZoneException, NO_ENTITY)
        }
    }

    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_cq_zone(mut self, zone: u8) -> Self {
        self.cq_zone = Some(zone);
        self
    }
}

/// Parse a zone number, accepting blanks as "not set"
pub(crate) fn parse_zone(text: &str) -> Result<Option<u8>, String> {
    let clean = text.trim();
    if clean.is_empty() {
        return Ok(None);
    }
    clean
        .parse::<u8>()
        .map(Some)
        .map_err(|_| format!("bad zone '{}'", clean))
}

/// Parse an optional float field, accepting blanks as "not set"
pub(crate) fn parse_opt_f64(text: &str) -> Result<Option<f64>, String> {
    let clean = text.trim();
    if clean.is_empty() {
        return Ok(None);
    }
    clean
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("bad number '{}'", clean))
}

// Country list reader (CSV)
//
// One row per entity. Required header columns, in any order:
//
//   prefix,name,dxcc,continent,cq,itu,lat,lon,tz,patterns
//
// `prefix` is the entity's primary prefix, `*` in front marks a deleted
// entity. `lon` is east-positive, `tz` is the UTC offset in hours.
// `patterns` holds the entity's prefixes and exact calls, separated by commas
// or whitespace and optionally terminated by `;`:
//
//   GM, MM, 2M(14)[27], =GB0XYZ(14){EU}<56.5/-4.2>~0~, =VER20240304;
//
// - leading `=`   exact callsign (exception) instead of a prefix
// - `(n)`         CQ zone override
// - `[n]`         ITU zone override
// - `{XX}`        continent override
// - `<lat/lon>`   coordinate override
// - `~n~`         UTC offset override
// - `=VERyyyymmdd` is the file version, not a call
//
// This list carries no history: every window is unbounded.

use std::io::BufRead;

use super::Progress;
use crate::error::LoadError;
use crate::model::{
    parse_opt_f64, parse_zone, Continent, Coordinates, DataSetBuilder, Entity, Pattern,
    PatternKind,
};
use crate::resolver::callsign::{is_well_formed, normalize};

const REQUIRED_COLUMNS: [&str; 10] = [
    "prefix", "name", "dxcc", "continent", "cq", "itu", "lat", "lon", "tz", "patterns",
];

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy)]
struct Columns {
    prefix: usize,
    name: usize,
    dxcc: usize,
    continent: usize,
    cq: usize,
    itu: usize,
    lat: usize,
    lon: usize,
    tz: usize,
    patterns: usize,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| -> Result<usize, LoadError> {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };
        // Check in declaration order so the first missing column is reported
        for name in REQUIRED_COLUMNS {
            find(name)?;
        }
        Ok(Self {
            prefix: find("prefix")?,
            name: find("name")?,
            dxcc: find("dxcc")?,
            continent: find("continent")?,
            cq: find("cq")?,
            itu: find("itu")?,
            lat: find("lat")?,
            lon: find("lon")?,
            tz: find("tz")?,
            patterns: find("patterns")?,
        })
    }
}

/// One entry of the pattern mini-language
#[derive(Debug, Clone, PartialEq)]
pub struct PatternToken {
    pub call: String,
    pub exact: bool,
    pub cq_zone: Option<u8>,
    pub itu_zone: Option<u8>,
    pub continent: Option<Continent>,
    pub coordinates: Option<Coordinates>,
    pub timezone: Option<f32>,
}

/// Parse a CSV country list into the builder
pub fn parse<R: BufRead>(
    input: R,
    builder: &mut DataSetBuilder,
    progress: &mut Progress<'_>,
) -> Result<(), LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let columns = Columns::from_header(reader.headers()?)?;
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping CTY row {}: {}", line, e);
                continue;
            }
        };

        if let Err(reason) = add_row(&record, &columns, builder) {
            skipped += 1;
            log::warn!("Skipping CTY row {}: {}", line, reason);
        }
        progress.tick();
    }

    if skipped > 0 {
        log::warn!("CTY load skipped {} malformed rows", skipped);
    }
    Ok(())
}

fn field<'a>(record: &'a csv::StringRecord, index: usize) -> &'a str {
    record.get(index).unwrap_or("").trim()
}

/// Add one entity row and all of its patterns
fn add_row(
    record: &csv::StringRecord,
    columns: &Columns,
    builder: &mut DataSetBuilder,
) -> Result<(), String> {
    let raw_prefix = field(record, columns.prefix);
    let (deleted, nickname) = match raw_prefix.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, raw_prefix),
    };

    let raw_id = field(record, columns.dxcc);
    let id = raw_id
        .parse::<i32>()
        .map_err(|_| format!("bad dxcc '{}'", raw_id))?;

    let mut entity = Entity::new(id, normalize(nickname), field(record, columns.name));
    entity.deleted = deleted;
    entity.cq_zone = parse_zone(field(record, columns.cq))?;
    entity.itu_zone = parse_zone(field(record, columns.itu))?;
    let cont = field(record, columns.continent);
    if !cont.is_empty() {
        entity.continent = Some(cont.parse()?);
    }
    let lat = parse_opt_f64(field(record, columns.lat))?;
    let lon = parse_opt_f64(field(record, columns.lon))?;
    if let (Some(lat), Some(lon)) = (lat, lon) {
        entity.coordinates = Some(Coordinates::new(lat, lon));
    }
    entity.timezone = parse_opt_f64(field(record, columns.tz))?.map(|tz| tz as f32);

    if !builder.add_entity(entity) {
        return Err(format!("reserved entity id {}", id));
    }

    for token in split_patterns(field(record, columns.patterns)) {
        if let Some(version) = version_token(token) {
            builder.set_version(version);
            continue;
        }
        match parse_pattern(token) {
            Ok(parsed) => {
                let kind = if parsed.exact {
                    PatternKind::Exception
                } else {
                    PatternKind::Prefix
                };
                let mut pattern = Pattern::new(&parsed.call, kind, id);
                pattern.cq_zone = parsed.cq_zone;
                pattern.itu_zone = parsed.itu_zone;
                pattern.continent = parsed.continent;
                pattern.coordinates = parsed.coordinates;
                pattern.timezone = parsed.timezone;
                builder.add_pattern(pattern);
            }
            Err(reason) => {
                log::warn!("Skipping pattern '{}' of entity {}: {}", token, id, reason);
            }
        }
    }
    Ok(())
}

/// Split a pattern list on commas and whitespace, dropping the `;` terminator
fn split_patterns(list: &str) -> impl Iterator<Item = &str> {
    list.trim()
        .trim_end_matches(';')
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `=VER20240304` → `20240304`
fn version_token(token: &str) -> Option<&str> {
    let digits = token.strip_prefix("=VER")?;
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Parse one entry of the pattern mini-language
pub fn parse_pattern(token: &str) -> Result<PatternToken, String> {
    let token = token.trim();
    let (exact, rest) = match token.strip_prefix('=') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let call_end = rest
        .find(|c: char| matches!(c, '(' | '[' | '{' | '<' | '~'))
        .unwrap_or(rest.len());
    let call = normalize(&rest[..call_end]);
    if !is_well_formed(&call) {
        return Err(format!("bad call '{}'", &rest[..call_end]));
    }

    let mut parsed = PatternToken {
        call,
        exact,
        cq_zone: None,
        itu_zone: None,
        continent: None,
        coordinates: None,
        timezone: None,
    };

    let mut overrides = &rest[call_end..];
    while let Some(open) = overrides.chars().next() {
        let close = match open {
            '(' => ')',
            '[' => ']',
            '{' => '}',
            '<' => '>',
            '~' => '~',
            other => return Err(format!("unexpected '{}'", other)),
        };
        let body_end = overrides[1..]
            .find(close)
            .ok_or_else(|| format!("unterminated '{}'", open))?;
        let body = &overrides[1..1 + body_end];
        match open {
            '(' => parsed.cq_zone = parse_zone(body)?,
            '[' => parsed.itu_zone = parse_zone(body)?,
            '{' => parsed.continent = Some(body.parse()?),
            '<' => {
                let (lat, lon) = body
                    .split_once('/')
                    .ok_or_else(|| format!("bad coordinates '{}'", body))?;
                match (parse_opt_f64(lat)?, parse_opt_f64(lon)?) {
                    (Some(lat), Some(lon)) => {
                        parsed.coordinates = Some(Coordinates::new(lat, lon))
                    }
                    _ => return Err(format!("bad coordinates '{}'", body)),
                }
            }
            _ => parsed.timezone = parse_opt_f64(body)?.map(|tz| tz as f32),
        }
        overrides = &overrides[1 + body_end + close.len_utf8()..];
    }

    Ok(parsed)
}

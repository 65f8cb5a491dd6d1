// Prefix list reader (pipe-delimited, depth-nested)
//
// Line oriented, `#` starts a comment. The first record carries the version:
//
//   V|2024-03-01
//
// Every other record is
//
//   type|depth|masks|name|dxcc|continent|cq|itu|lat|lon|tz|start|end|flags
//
// type E = entity, G = geographic subdivision, S = special use. A record at
// depth d > 0 belongs to the closest preceding record at depth d-1 and
// inherits every field it leaves blank. Masks use the wildcard grammar in
// `readers::mask`; each expands to literal prefixes. `D` in flags marks a
// deleted entity.

use std::io::BufRead;

use super::mask::expand_mask_list;
use super::Progress;
use crate::error::LoadError;
use crate::model::{
    parse_opt_f64, parse_zone, Coordinates, DataSetBuilder, Entity, Pattern, PatternKind,
    Validity, NO_ENTITY,
};

const FIELD_COUNT: usize = 14;

// Field positions
const TYPE: usize = 0;
const DEPTH: usize = 1;
const MASKS: usize = 2;
const NAME: usize = 3;
const DXCC: usize = 4;
const CONTINENT: usize = 5;
const CQ: usize = 6;
const ITU: usize = 7;
const LAT: usize = 8;
const LON: usize = 9;
const TZ: usize = 10;
const START: usize = 11;
const END: usize = 12;
const FLAGS: usize = 13;

/// Fields a nested record takes from its parent when blank
const INHERITED: [usize; 10] = [NAME, DXCC, CONTINENT, CQ, ITU, LAT, LON, TZ, START, END];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordType {
    Entity,
    Geography,
    Special,
}

impl RecordType {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" | "e" => Some(Self::Entity),
            "G" | "g" => Some(Self::Geography),
            "S" | "s" => Some(Self::Special),
            _ => None,
        }
    }
}

/// A record after inheritance, kept on the nesting stack
#[derive(Debug, Clone)]
struct Context {
    fields: Vec<String>,
}

impl Context {
    fn get(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Parse a prefix list into the builder
pub fn parse<R: BufRead>(
    input: R,
    builder: &mut DataSetBuilder,
    progress: &mut Progress<'_>,
) -> Result<(), LoadError> {
    let mut stack: Vec<Context> = Vec::new();
    let mut seen_version = false;
    let mut skipped = 0usize;

    for (i, line) in input.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<String> = trimmed.split('|').map(|f| f.trim().to_string()).collect();

        if !seen_version {
            match fields.as_slice() {
                [code, version] if code == "V" && !version.is_empty() => {
                    builder.set_version(version.clone());
                    seen_version = true;
                    continue;
                }
                _ => return Err(LoadError::MissingSection("version")),
            }
        }

        match add_record(fields, &mut stack, builder) {
            Ok(()) => {}
            Err(reason) => {
                skipped += 1;
                log::warn!("Skipping prefix list line {}: {}", line_no, reason);
            }
        }
        progress.tick();
    }

    if !seen_version {
        return Err(LoadError::MissingSection("version"));
    }
    if skipped > 0 {
        log::warn!("Prefix list load skipped {} malformed records", skipped);
    }
    Ok(())
}

/// Resolve nesting, then add the record's entity and patterns
fn add_record(
    mut fields: Vec<String>,
    stack: &mut Vec<Context>,
    builder: &mut DataSetBuilder,
) -> Result<(), String> {
    // Without a usable depth nothing after this line has a known parent
    let raw_depth = fields.get(DEPTH).map(String::as_str).unwrap_or("");
    let depth = match raw_depth.parse::<usize>() {
        Ok(depth) => depth,
        Err(_) => {
            stack.clear();
            return Err(format!("bad depth '{}'", raw_depth));
        }
    };
    if depth > stack.len() {
        return Err(format!(
            "depth {} without a parent at depth {}",
            depth,
            depth - 1
        ));
    }

    // From here on a failed record still closes every context at its depth,
    // so its children are skipped instead of nesting under an older record
    stack.truncate(depth);

    if fields.len() > FIELD_COUNT {
        return Err(format!("{} fields, expected {}", fields.len(), FIELD_COUNT));
    }
    fields.resize(FIELD_COUNT, String::new());

    let kind = RecordType::from_code(&fields[TYPE])
        .ok_or_else(|| format!("unknown record type '{}'", fields[TYPE]))?;

    if let Some(parent) = stack.last() {
        for index in INHERITED {
            if fields[index].is_empty() {
                fields[index] = parent.get(index).to_string();
            }
        }
    }
    let context = Context { fields };

    add_resolved(kind, depth, &context, builder)?;
    stack.push(context);
    Ok(())
}

fn add_resolved(
    kind: RecordType,
    depth: usize,
    record: &Context,
    builder: &mut DataSetBuilder,
) -> Result<(), String> {
    let entity_id = match record.get(DXCC) {
        "" if kind == RecordType::Special && depth == 0 => NO_ENTITY,
        "" => return Err("no dxcc".to_string()),
        raw => raw
            .parse::<i32>()
            .map_err(|_| format!("bad dxcc '{}'", raw))?,
    };

    let cq_zone = parse_zone(record.get(CQ))?;
    let itu_zone = parse_zone(record.get(ITU))?;
    let continent = match record.get(CONTINENT) {
        "" => None,
        raw => Some(raw.parse()?),
    };
    let coordinates = match (
        parse_opt_f64(record.get(LAT))?,
        parse_opt_f64(record.get(LON))?,
    ) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };
    let timezone = parse_opt_f64(record.get(TZ))?.map(|tz| tz as f32);
    let validity = Validity::parse(record.get(START), record.get(END))?;

    let (prefixes, rejected) = expand_mask_list(record.get(MASKS));
    for err in &rejected {
        log::warn!("Rejected mask in '{}': {}", record.get(NAME), err);
    }

    match kind {
        RecordType::Entity => {
            let nickname = prefixes.first().cloned().unwrap_or_default();
            let mut entity = Entity::new(entity_id, nickname, record.get(NAME));
            entity.cq_zone = cq_zone;
            entity.itu_zone = itu_zone;
            entity.continent = continent;
            entity.coordinates = coordinates;
            entity.timezone = timezone;
            entity.deleted = record.get(FLAGS).contains('D');
            entity.validity = validity;
            if !builder.add_entity(entity) {
                return Err(format!("reserved entity id {}", entity_id));
            }
        }
        RecordType::Special if entity_id == NO_ENTITY && builder.entity(NO_ENTITY).is_none() => {
            builder.add_entity(Entity::new(NO_ENTITY, "", "NO DXCC ENTITY"));
        }
        _ => {}
    }

    let pattern_kind = match kind {
        RecordType::Special => PatternKind::Filter,
        RecordType::Entity | RecordType::Geography => PatternKind::Prefix,
    };
    let region = match kind {
        RecordType::Geography => Some(record.get(NAME).to_string()),
        _ => None,
    };

    for prefix in prefixes {
        let mut pattern = Pattern::new(prefix, pattern_kind, entity_id).with_validity(validity);
        pattern.cq_zone = cq_zone;
        pattern.itu_zone = itu_zone;
        pattern.continent = continent;
        pattern.coordinates = coordinates;
        pattern.timezone = timezone;
        pattern.region = region.clone();
        builder.add_pattern(pattern);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Continent, DataSet, Provider};
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
# sample prefix list
V|2024-03-01

E|0|GM,MM,2M|Scotland|279|EU|14|27|56.82|-4.18|0|||
E|0|VE,VA,VY[0-2]|Canada|1|NA|5|9|44.35|-78.75|-5|||
G|1|VE1,VA1|Nova Scotia||||||||||
G|1|VE2,VA2|Quebec|||2|4|||||
E|0|KC6|Palau (old)|22|OC|27|64|7.5|134.5|9||1994-09-30|D
E|0|T8|Palau|390|OC|27|64|7.5|134.5|9|1994-10-01||
S|0|4U#UN|United Nations HQ||NA|5|8|40.75|-73.97|-5|||
E|0|##ZZ,K|United States|291|NA|5|8|37.5|-91.67|-5|||
G|2|W9|Orphan||||||||||
E|0|XX|Broken|abc|EU|1|1|0|0|0|||
";

    fn load(text: &str) -> Result<DataSet, LoadError> {
        let mut builder = DataSetBuilder::new(Provider::PrefixList);
        parse(text.as_bytes(), &mut builder, &mut Progress::silent())?;
        builder.finish()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_version_round_trip() {
        let data = load(SAMPLE).unwrap();
        assert_eq!(data.version(), "2024-03-01");
    }

    #[test]
    fn test_entities_and_mask_expansion() {
        let data = load(SAMPLE).unwrap();
        let gm = data.entity(279).unwrap();
        assert_eq!(gm.nickname, "GM");
        assert_eq!(gm.itu_zone, Some(27));
        assert!(data.prefix("2M", d(2024, 1, 1)).is_some());

        for p in ["VY0", "VY1", "VY2"] {
            assert_eq!(data.prefix(p, d(2024, 1, 1)).unwrap().entity, 1);
        }
        assert!(data.prefix("VY3", d(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_geography_inherits_from_parent() {
        let data = load(SAMPLE).unwrap();
        let ns = data.prefix("VE1", d(2024, 1, 1)).unwrap();
        assert_eq!(ns.entity, 1);
        assert_eq!(ns.kind, PatternKind::Prefix);
        assert_eq!(ns.region.as_deref(), Some("Nova Scotia"));
        assert_eq!(ns.cq_zone, Some(5));
        assert_eq!(ns.continent, Some(Continent::NA));

        let qc = data.prefix("VA2", d(2024, 1, 1)).unwrap();
        assert_eq!(qc.cq_zone, Some(2));
        assert_eq!(qc.itu_zone, Some(4));
        // geography records never create entities
        assert_eq!(data.entity(1).unwrap().name, "Canada");
    }

    #[test]
    fn test_special_use_without_dxcc_is_no_entity() {
        let data = load(SAMPLE).unwrap();
        let un = data.prefix("4U1UN", d(2024, 1, 1)).unwrap();
        assert_eq!(un.kind, PatternKind::Filter);
        assert_eq!(un.entity, NO_ENTITY);
        assert_eq!(data.prefix_candidates("4U9UN").len(), 1);
        assert!(data.entity(NO_ENTITY).is_some());
    }

    #[test]
    fn test_windows_and_deleted_flag() {
        let data = load(SAMPLE).unwrap();
        assert!(data.entity(22).unwrap().deleted);
        assert!(!data.entity(390).unwrap().deleted);
        assert!(data.prefix("KC6", d(1990, 1, 1)).is_some());
        assert!(data.prefix("KC6", d(1995, 1, 1)).is_none());
        assert!(data.prefix("T8", d(1994, 9, 30)).is_none());
        assert!(data.prefix("T8", d(1994, 10, 1)).is_some());
    }

    #[test]
    fn test_multiple_wildcards_rejected_not_truncated() {
        let data = load(SAMPLE).unwrap();
        // "##ZZ" is dropped whole; the sibling mask "K" survives
        assert!(data.prefix("K", d(2024, 1, 1)).is_some());
        assert!(data.prefix("00ZZ", d(2024, 1, 1)).is_none());
        assert!(data.prefix_candidates("19ZZ").is_empty());
    }

    #[test]
    fn test_malformed_records_skipped() {
        let data = load(SAMPLE).unwrap();
        // depth jump from 0 to 2
        assert!(data.prefix("W9", d(2024, 1, 1)).is_none());
        assert!(data.prefix("XX", d(2024, 1, 1)).is_none());
        assert_eq!(data.stats().entity_count, 6);
    }

    #[test]
    fn test_missing_version_fails_load() {
        let text = "E|0|GM|Scotland|279|EU|14|27|56|-4|0|||\n";
        assert!(matches!(
            load(text),
            Err(LoadError::MissingSection("version"))
        ));
        assert!(matches!(
            load("# nothing here\n"),
            Err(LoadError::MissingSection("version"))
        ));
    }

    #[test]
    fn test_version_only_is_empty() {
        assert!(matches!(load("V|1\n"), Err(LoadError::Empty)));
    }

    #[test]
    fn test_nested_special_use_inherits_entity() {
        let text = "\
V|7
E|0|KH6|Hawaii|110|OC|31|61|21|-157|-10|||
S|1|KH6/KP|Kure special||||||||||
";
        let data = load(text).unwrap();
        let sp = data.prefix("KH6/KP", d(2024, 1, 1)).unwrap();
        assert_eq!(sp.entity, 110);
        assert_eq!(sp.kind, PatternKind::Filter);
        assert_eq!(sp.cq_zone, Some(31));
    }

    #[test]
    fn test_children_of_skipped_record_are_skipped() {
        let text = "\
V|1
E|0|GM|Scotland|279|EU|14|27|56|-4|0|||
X|0|ZS|South Africa|462|AF|38|57|-29|24|2|||
G|1|ZS1|Western Cape||||||||||
E|zero|JA|Japan|339|AS|25|45|36|139|9|||
G|1|JA1|Kanto||||||||||
E|0|KH6|Hawaii|abc|OC|31|61|21|-157|-10|||
G|1|KH7|Kure||||||||||
E|0|VE|Canada|1|NA|5|9|44|-78|-5|||
G|1|VE3|Ontario||||||||||
";
        let data = load(text).unwrap();
        let today = d(2024, 1, 1);
        // bad type, bad depth and bad dxcc parents never adopt children
        assert!(data.prefix("ZS1", today).is_none());
        assert!(data.prefix("JA1", today).is_none());
        assert!(data.prefix("KH7", today).is_none());
        assert_eq!(data.prefixes_for_entity(279), vec!["GM"]);

        // nesting recovers at the next good top-level record
        let on = data.prefix("VE3", today).unwrap();
        assert_eq!(on.entity, 1);
        assert_eq!(on.region.as_deref(), Some("Ontario"));
    }
}

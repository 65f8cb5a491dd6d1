// Club Log cty.xml reader
// Source: https://clublog.org/cty.php
//
// Document layout:
//
//   <clublog date="2024-03-04T10:05:07+00:00" xmlns="https://clublog.org/cty/v1.2">
//     <entities>        <entity>        adif name prefix deleted cqz cont long lat start end
//     <exceptions>      <exception>     call entity adif cqz cont long lat start end
//     <prefixes>        <prefix>        call entity adif cqz cont long lat start end
//     <invalid_operations> <invalid>    call start end
//     <zone_exceptions> <zone_exception> call zone start end
//   </clublog>
//
// The root `date` attribute is the file version. Times are ISO-8601 and are
// reduced to calendar dates. Club Log has no ITU zones and no UTC offsets.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use super::Progress;
use crate::error::LoadError;
use crate::model::{
    parse_opt_f64, parse_zone, Coordinates, DataSetBuilder, Entity, Pattern, PatternKind,
    Validity,
};
use crate::resolver::callsign::normalize;

/// The five record sections of a Club Log file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Entities,
    Exceptions,
    Prefixes,
    InvalidOperations,
    ZoneExceptions,
}

impl Section {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"entities" => Some(Section::Entities),
            b"exceptions" => Some(Section::Exceptions),
            b"prefixes" => Some(Section::Prefixes),
            b"invalid_operations" => Some(Section::InvalidOperations),
            b"zone_exceptions" => Some(Section::ZoneExceptions),
            _ => None,
        }
    }

    fn record_tag(&self) -> &'static [u8] {
        match self {
            Section::Entities => b"entity",
            Section::Exceptions => b"exception",
            Section::Prefixes => b"prefix",
            Section::InvalidOperations => b"invalid",
            Section::ZoneExceptions => b"zone_exception",
        }
    }
}

type Fields = HashMap<String, String>;

/// Parse a Club Log XML stream into the builder
pub fn parse<R: BufRead>(
    input: R,
    builder: &mut DataSetBuilder,
    progress: &mut Progress<'_>,
) -> Result<(), LoadError> {
    let mut reader = Reader::from_reader(input);
    // Text around entity references must keep its spaces; fields are trimmed on close
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut seen_root = false;
    let mut seen_entities = false;
    let mut section: Option<Section> = None;
    let mut record: Option<Fields> = None;
    let mut field: Option<String> = None;
    let mut text = String::new();
    let mut record_no = 0usize;
    let mut skipped = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = e.local_name();
                let tag = tag.as_ref();
                if !seen_root {
                    if tag != b"clublog" {
                        return Err(LoadError::MissingSection("clublog"));
                    }
                    seen_root = true;
                    if let Some(date) = attribute(e, b"date")? {
                        builder.set_version(date);
                    }
                } else if record.is_some() {
                    field = Some(String::from_utf8_lossy(tag).into_owned());
                    text.clear();
                } else if let Some(current) = section {
                    if tag == current.record_tag() {
                        record = Some(Fields::new());
                        record_no += 1;
                    }
                } else if let Some(opened) = Section::from_tag(tag) {
                    if opened == Section::Entities {
                        seen_entities = true;
                    }
                    section = Some(opened);
                }
            }
            Event::Empty(ref e) => {
                let tag = e.local_name();
                let tag = tag.as_ref();
                if !seen_root {
                    return Err(LoadError::MissingSection("clublog"));
                }
                if let Some(fields) = record.as_mut() {
                    // <cqz/> and friends: present but blank
                    fields.insert(String::from_utf8_lossy(tag).into_owned(), String::new());
                } else if Section::from_tag(tag) == Some(Section::Entities) {
                    seen_entities = true;
                }
            }
            Event::Text(ref e) => {
                if field.is_some() {
                    text.push_str(&e.decode().map_err(|e| LoadError::Xml(e.to_string()))?);
                }
            }
            Event::CData(ref e) => {
                if field.is_some() {
                    text.push_str(&e.decode().map_err(|e| LoadError::Xml(e.to_string()))?);
                }
            }
            Event::GeneralRef(ref e) => {
                if field.is_some() {
                    text.push_str(&resolve_reference(e)?);
                }
            }
            Event::End(ref e) => {
                let tag = e.local_name();
                let tag = tag.as_ref();
                if let Some(name) = field.take() {
                    if let Some(fields) = record.as_mut() {
                        fields.insert(name, text.trim().to_string());
                    }
                    text.clear();
                } else if let (Some(current), Some(fields)) = (section, record.as_ref()) {
                    if tag == current.record_tag() {
                        if let Err(reason) = add_record(current, fields, builder) {
                            skipped += 1;
                            log::warn!(
                                "Skipping Club Log {} record #{}: {}",
                                String::from_utf8_lossy(current.record_tag()),
                                record_no,
                                reason
                            );
                        }
                        record = None;
                        progress.tick();
                    }
                } else if section.is_some() && Section::from_tag(tag) == section {
                    section = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(LoadError::MissingSection("clublog"));
    }
    if !seen_entities {
        return Err(LoadError::MissingSection("entities"));
    }

    if skipped > 0 {
        log::warn!("Club Log load skipped {} malformed records", skipped);
    }
    Ok(())
}

/// Read an attribute value by name
fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, LoadError> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value()?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve `&amp;`-style and numeric character references inside text
fn resolve_reference(e: &BytesRef<'_>) -> Result<String, LoadError> {
    if let Some(c) = e.resolve_char_ref()? {
        return Ok(c.to_string());
    }
    let name = e.decode().map_err(|e| LoadError::Xml(e.to_string()))?;
    let resolved = match name.as_ref() {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        other => {
            log::debug!("Unknown XML entity '&{};' left as-is", other);
            return Ok(format!("&{};", other));
        }
    };
    Ok(resolved.to_string())
}

fn get<'a>(fields: &'a Fields, name: &str) -> &'a str {
    fields.get(name).map(String::as_str).unwrap_or("")
}

fn validity(fields: &Fields) -> Result<Validity, String> {
    Validity::parse(get(fields, "start"), get(fields, "end"))
}

fn coordinates(fields: &Fields) -> Result<Option<Coordinates>, String> {
    let lat = parse_opt_f64(get(fields, "lat"))?;
    let lon = parse_opt_f64(get(fields, "long"))?;
    Ok(match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    })
}

fn adif(fields: &Fields) -> Result<i32, String> {
    let raw = get(fields, "adif");
    raw.parse::<i32>()
        .map_err(|_| format!("bad adif '{}'", raw))
}

fn continent(fields: &Fields) -> Result<Option<crate::model::Continent>, String> {
    let raw = get(fields, "cont");
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some)
}

fn call(fields: &Fields) -> Result<String, String> {
    let raw = get(fields, "call");
    let call = normalize(raw);
    if call.is_empty() {
        return Err("missing call".to_string());
    }
    Ok(call)
}

/// Turn one collected record into model elements
fn add_record(section: Section, fields: &Fields, builder: &mut DataSetBuilder) -> Result<(), String> {
    match section {
        Section::Entities => {
            let mut entity = Entity::new(adif(fields)?, get(fields, "prefix"), get(fields, "name"));
            entity.cq_zone = parse_zone(get(fields, "cqz"))?;
            entity.continent = continent(fields)?;
            entity.coordinates = coordinates(fields)?;
            entity.deleted = get(fields, "deleted").eq_ignore_ascii_case("TRUE");
            entity.validity = validity(fields)?;
            if !builder.add_entity(entity) {
                return Err("reserved entity id".to_string());
            }
        }
        Section::Exceptions | Section::Prefixes => {
            let kind = if section == Section::Exceptions {
                PatternKind::Exception
            } else {
                PatternKind::Prefix
            };
            let mut pattern = Pattern::new(call(fields)?, kind, adif(fields)?);
            pattern.cq_zone = parse_zone(get(fields, "cqz"))?;
            pattern.continent = continent(fields)?;
            pattern.coordinates = coordinates(fields)?;
            pattern.validity = validity(fields)?;
            builder.add_pattern(pattern);
        }
        Section::InvalidOperations => {
            builder.add_pattern(Pattern::invalid(call(fields)?, validity(fields)?));
        }
        Section::ZoneExceptions => {
            let zone = parse_zone(get(fields, "zone"))?.ok_or("missing zone")?;
            builder.add_pattern(Pattern::zone_exception(call(fields)?, zone, validity(fields)?));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Continent, Provider, INVALID_ENTITY};
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<clublog date="2024-03-04T10:05:07+00:00" xmlns="https://clublog.org/cty/v1.2">
<entities record="3">
<entity>
<adif>1</adif>
<name>CANADA</name>
<prefix>VE</prefix>
<deleted>FALSE</deleted>
<cqz>5</cqz>
<cont>NA</cont>
<long>-80.00</long>
<lat>45.00</lat>
</entity>
<entity>
<adif>279</adif>
<name>SCOTLAND</name>
<prefix>GM</prefix>
<deleted>FALSE</deleted>
<cqz>14</cqz>
<cont>EU</cont>
<long>-4.00</long>
<lat>56.00</lat>
</entity>
<entity>
<adif>249</adif>
<name>ST. KITTS &amp; NEVIS</name>
<prefix>V4</prefix>
<deleted>FALSE</deleted>
<cqz>8</cqz>
<cont>NA</cont>
<long>-62.80</long>
<lat>17.30</lat>
</entity>
<entity>
<adif>-1</adif>
<name>BOGUS</name>
</entity>
</entities>
<exceptions record="1">
<exception record="1">
<call>VE1ST/NA14</call>
<entity>CANADA</entity>
<adif>1</adif>
<cqz>4</cqz>
<cont>NA</cont>
<long>-63.00</long>
<lat>44.00</lat>
<start>1900-01-01T00:00:00+00:00</start>
<end>9999-12-31T23:59:59+00:00</end>
</exception>
</exceptions>
<prefixes record="3">
<prefix record="1">
<call>VE</call>
<entity>CANADA</entity>
<adif>1</adif>
<cqz>5</cqz>
<cont>NA</cont>
<long>-80.00</long>
<lat>45.00</lat>
</prefix>
<prefix record="2">
<call>GM</call>
<entity>SCOTLAND</entity>
<adif>279</adif>
<cqz>14</cqz>
<cont>EU</cont>
<long>-4.00</long>
<lat>56.00</lat>
</prefix>
<prefix record="3">
<call>V4</call>
<entity>ST. KITTS &amp; NEVIS</entity>
<adif>249</adif>
<cqz/>
<cont>NA</cont>
<long>-62.80</long>
<lat>17.30</lat>
<start>1983-09-19T00:00:00+00:00</start>
</prefix>
<prefix record="4">
<call>XX</call>
<adif>not-a-number</adif>
</prefix>
</prefixes>
<invalid_operations record="1">
<invalid record="1">
<call>T88A</call>
<start>1995-05-01T00:00:00+00:00</start>
<end>1995-12-31T23:59:59+00:00</end>
</invalid>
</invalid_operations>
<zone_exceptions record="1">
<zone_exception record="1">
<call>VE2XYZ</call>
<zone>2</zone>
<start>2020-01-01T00:00:00+00:00</start>
<end>2020-12-31T23:59:59+00:00</end>
</zone_exception>
</zone_exceptions>
</clublog>
"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn load(xml: &str) -> Result<crate::model::DataSet, LoadError> {
        let mut builder = DataSetBuilder::new(Provider::Clublog);
        parse(xml.as_bytes(), &mut builder, &mut Progress::silent())?;
        builder.finish()
    }

    #[test]
    fn test_parse_sample() {
        let data = load(SAMPLE).unwrap();
        assert_eq!(data.version(), "2024-03-04T10:05:07+00:00");

        let stats = data.stats();
        assert_eq!(stats.entity_count, 3);
        assert_eq!(stats.prefix_count, 3);
        assert_eq!(stats.exception_count, 1);
        assert_eq!(stats.invalid_count, 1);
        assert_eq!(stats.zone_exception_count, 1);

        let canada = data.entity(1).unwrap();
        assert_eq!(canada.name, "CANADA");
        assert_eq!(canada.nickname, "VE");
        assert_eq!(canada.cq_zone, Some(5));
        assert_eq!(canada.continent, Some(Continent::NA));
        assert_eq!(canada.coordinates, Some(Coordinates::new(45.0, -80.0)));
        assert!(!canada.deleted);
        assert!(data.entity(INVALID_ENTITY).is_none());
    }

    #[test]
    fn test_entity_references_are_resolved() {
        let data = load(SAMPLE).unwrap();
        assert_eq!(data.entity(249).unwrap().name, "ST. KITTS & NEVIS");
    }

    #[test]
    fn test_windows_are_reduced_to_dates() {
        let data = load(SAMPLE).unwrap();
        let invalid = data.invalid("T88A", d(1995, 8, 1)).unwrap();
        assert_eq!(invalid.validity.start, Some(d(1995, 5, 1)));
        assert_eq!(invalid.validity.end, Some(d(1995, 12, 31)));
        assert!(data.invalid("T88A", d(1996, 1, 15)).is_none());

        assert!(data.prefix("V4", d(1983, 9, 18)).is_none());
        let v4 = data.prefix("V4", d(1983, 9, 19)).unwrap();
        assert_eq!(v4.cq_zone, None);
        assert_eq!(v4.entity, 249);
    }

    #[test]
    fn test_zone_exception_record() {
        let data = load(SAMPLE).unwrap();
        let zx = data.zone_exception("VE2XYZ", d(2020, 6, 1)).unwrap();
        assert_eq!(zx.cq_zone, Some(2));
        assert!(data.zone_exception("VE2XYZ", d(2021, 6, 1)).is_none());
    }

    #[test]
    fn test_missing_root_fails() {
        let xml = r#"<?xml version="1.0"?><countries><entities></entities></countries>"#;
        assert!(matches!(load(xml), Err(LoadError::MissingSection("clublog"))));
    }

    #[test]
    fn test_missing_entities_section_fails() {
        let xml = r#"<clublog date="x"><prefixes><prefix><call>VE</call><adif>1</adif></prefix></prefixes></clublog>"#;
        assert!(matches!(load(xml), Err(LoadError::MissingSection("entities"))));
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(matches!(load(""), Err(LoadError::MissingSection("clublog"))));
    }

    #[test]
    fn test_bad_date_skips_record_only() {
        let xml = r#"<clublog date="v1"><entities>
<entity><adif>1</adif><name>CANADA</name><prefix>VE</prefix></entity>
</entities><prefixes>
<prefix><call>VE</call><adif>1</adif><start>2001-02-30T00:00:00+00:00</start></prefix>
<prefix><call>VA</call><adif>1</adif></prefix>
</prefixes></clublog>"#;
        let data = load(xml).unwrap();
        assert_eq!(data.stats().prefix_count, 1);
        assert!(data.prefix_candidates("VE").is_empty());
        assert_eq!(data.version(), "v1");
    }
}

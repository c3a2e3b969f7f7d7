//! `xl/workbook.xml` sheet list and `.rels` relationship parsing.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::PackageError;

pub(crate) const REL_TYPE_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub(crate) const REL_TYPE_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub type_uri: String,
    pub target: String,
    pub external: bool,
}

/// A `<sheet>` entry from `xl/workbook.xml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WorkbookSheet {
    pub name: String,
    pub rel_id: String,
}

pub(crate) fn rels_part_name(part_name: &str) -> String {
    let (dir, file) = part_name.rsplit_once('/').unwrap_or(("", part_name));
    if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    }
}

/// Resolve a relationship target relative to the part that owns the `.rels` file.
pub(crate) fn resolve_target(base_part: &str, target: &str) -> String {
    // OPC part names do not include fragments.
    let target = target.split_once('#').map(|(base, _)| base).unwrap_or(target);

    // Absolute targets are rooted at the package root.
    let (target, is_absolute) = match target.strip_prefix('/') {
        Some(target) => (target, true),
        None => (target, false),
    };
    let base_dir = if is_absolute {
        ""
    } else {
        base_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    };

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(segment),
        }
    }

    components.join("/")
}

pub(crate) fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, PackageError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) | Event::Empty(start) => {
                if local_name(start.name().as_ref()).eq_ignore_ascii_case(b"Relationship") {
                    if let Some(rel) = parse_relationship(&start)? {
                        relationships.push(rel);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

fn parse_relationship(start: &BytesStart<'_>) -> Result<Option<Relationship>, PackageError> {
    let mut id = None;
    let mut target = None;
    let mut type_uri = None;
    let mut external = false;
    for attr in start.attributes() {
        let attr = attr?;
        let key = local_name(attr.key.as_ref());
        let value = attr.unescape_value()?.into_owned();
        if key.eq_ignore_ascii_case(b"Id") {
            id = Some(value);
        } else if key.eq_ignore_ascii_case(b"Target") {
            target = Some(value);
        } else if key.eq_ignore_ascii_case(b"Type") {
            type_uri = Some(value);
        } else if key.eq_ignore_ascii_case(b"TargetMode") {
            external = value.trim().eq_ignore_ascii_case("External");
        }
    }
    Ok(match (id, target, type_uri) {
        (Some(id), Some(target), Some(type_uri)) => Some(Relationship {
            id,
            type_uri,
            target,
            external,
        }),
        _ => None,
    })
}

pub(crate) fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<WorkbookSheet>, PackageError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let key = attr.key.as_ref();
                    if key == b"name" {
                        name = Some(attr.unescape_value()?.into_owned());
                    } else if local_name(key) == b"id" {
                        rel_id = Some(attr.unescape_value()?.into_owned());
                    }
                }
                match (name, rel_id) {
                    (Some(name), Some(rel_id)) => sheets.push(WorkbookSheet { name, rel_id }),
                    _ => {
                        return Err(PackageError::Malformed {
                            part: "xl/workbook.xml".to_string(),
                            reason: "<sheet> without name or r:id",
                        })
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_targets() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "../xl/./sharedStrings.xml#frag"),
            "xl/sharedStrings.xml"
        );
        assert_eq!(rels_part_name("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
    }

    #[test]
    fn parses_sheets_with_prefixed_relationship_ids() {
        let xml = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
 xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Blad1" sheetId="1" r:id="rId1"/>
    <sheet name="Historik" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;
        let sheets = parse_workbook_sheets(xml).unwrap();
        assert_eq!(
            sheets,
            vec![
                WorkbookSheet {
                    name: "Blad1".to_string(),
                    rel_id: "rId1".to_string()
                },
                WorkbookSheet {
                    name: "Historik".to_string(),
                    rel_id: "rId2".to_string()
                },
            ]
        );
    }

    #[test]
    fn parses_relationships_and_external_mode() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId9" Type="http://example.com/link" Target="https://example.com" TargetMode="External"/>
  <Relationship Id="rIdBroken" Target="nowhere.xml"/>
</Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].type_uri, REL_TYPE_WORKSHEET);
        assert!(!rels[0].external);
        assert!(rels[1].external);
    }
}

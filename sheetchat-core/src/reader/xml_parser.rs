//! XML parsing utilities for extracting table metadata from XLSX packages

use super::workbook::{CellRange, DefinedTable};
use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const TABLE_REL_SUFFIX: &str = "/table";
const WORKSHEET_REL_SUFFIX: &str = "/worksheet";

/// A single `<Relationship>` entry of a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Extract the declared tables of every worksheet, keyed by sheet name
pub fn extract_defined_tables_from_xlsx(
    archive: &mut ZipArchive<impl Read + Seek>,
) -> Result<HashMap<String, Vec<DefinedTable>>> {
    let mut tables_by_sheet = HashMap::new();

    for (sheet_name, sheet_path) in read_sheet_paths(archive)? {
        let rels_path = rels_path_for(&sheet_path);
        let Some(rels) = read_relationships(archive, &rels_path)? else {
            continue;
        };

        let mut tables = Vec::new();
        for rel in rels
            .iter()
            .filter(|rel| rel.rel_type.ends_with(TABLE_REL_SUFFIX))
        {
            let table_path = resolve_target(&sheet_path, &rel.target);
            if let Some(table) = read_table_part(archive, &table_path)? {
                tables.push(table);
            }
        }

        if !tables.is_empty() {
            tables_by_sheet.insert(sheet_name, tables);
        }
    }

    Ok(tables_by_sheet)
}

/// Map each sheet name to its worksheet part path, in workbook order
pub fn read_sheet_paths(
    archive: &mut ZipArchive<impl Read + Seek>,
) -> Result<Vec<(String, String)>> {
    let workbook_path = "xl/workbook.xml";
    let Some(workbook_xml) = read_part(archive, workbook_path)? else {
        return Ok(Vec::new());
    };
    let rels = read_relationships(archive, &rels_path_for(workbook_path))?.unwrap_or_default();
    let targets: HashMap<&str, &str> = rels
        .iter()
        .filter(|rel| rel.rel_type.ends_with(WORKSHEET_REL_SUFFIX))
        .map(|rel| (rel.id.as_str(), rel.target.as_str()))
        .collect();

    let mut reader = Reader::from_str(&workbook_xml);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"name" => name = Some(attr.unescape_value()?.into_owned()),
                        b"id" => rel_id = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }

                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    if let Some(target) = targets.get(rel_id.as_str()) {
                        sheets.push((name, resolve_target(workbook_path, target)));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error in {}: {}", workbook_path, e)),
            _ => {}
        }
    }

    Ok(sheets)
}

/// Read a `.rels` part. Returns `None` when the part does not exist.
pub fn read_relationships(
    archive: &mut ZipArchive<impl Read + Seek>,
    rels_path: &str,
) -> Result<Option<Vec<Relationship>>> {
    let Some(xml) = read_part(archive, rels_path)? else {
        return Ok(None);
    };

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut relationships = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => rel.id = attr.unescape_value()?.into_owned(),
                        b"Type" => rel.rel_type = attr.unescape_value()?.into_owned(),
                        b"Target" => rel.target = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error in {}: {}", rels_path, e)),
            _ => {}
        }
    }

    Ok(Some(relationships))
}

/// Read a table part (`xl/tables/tableN.xml`) into its name and region
pub fn read_table_part(
    archive: &mut ZipArchive<impl Read + Seek>,
    table_path: &str,
) -> Result<Option<DefinedTable>> {
    let Some(xml) = read_part(archive, table_path)? else {
        return Ok(None);
    };

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"table" => {
                let mut name = None;
                let mut display_name = None;
                let mut reference = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(attr.unescape_value()?.into_owned()),
                        b"displayName" => {
                            display_name = Some(attr.unescape_value()?.into_owned())
                        }
                        b"ref" => reference = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }

                let name = name.or(display_name).unwrap_or_default();
                let region = reference
                    .as_deref()
                    .and_then(CellRange::parse)
                    .with_context(|| format!("Table '{}' has no valid ref in {}", name, table_path))?;
                return Ok(Some(DefinedTable::new(name, region)));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(anyhow::anyhow!("XML parsing error in {}: {}", table_path, e)),
            _ => {}
        }
    }
}

fn read_part(archive: &mut ZipArchive<impl Read + Seek>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to open part {}", path)),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("Failed to read part {}", path))?;
    Ok(Some(content))
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_path),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

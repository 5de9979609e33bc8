#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A cell of a mock worksheet
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// A mock worksheet: name, rows as `(row number, cells)` with cells as
/// `(column letter, value)`, and declared tables as `(name, ref)`
pub struct MockSheet<'a> {
    pub name: &'a str,
    pub rows: Vec<(u32, Vec<(&'a str, Cell<'a>)>)>,
    pub tables: Vec<(&'a str, &'a str)>,
}

fn sheet_xml(sheet: &MockSheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData>"#,
    );
    for (row, cells) in &sheet.rows {
        xml.push_str(&format!(r#"<row r="{}">"#, row));
        for (col, cell) in cells {
            match cell {
                Cell::Text(s) => xml.push_str(&format!(
                    r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    col, row, s
                )),
                Cell::Number(n) => {
                    xml.push_str(&format!(r#"<c r="{}{}"><v>{}</v></c>"#, col, row, n))
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    if !sheet.tables.is_empty() {
        xml.push_str(&format!(r#"<tableParts count="{}">"#, sheet.tables.len()));
        for i in 0..sheet.tables.len() {
            xml.push_str(&format!(r#"<tablePart r:id="rId{}"/>"#, i + 1));
        }
        xml.push_str("</tableParts>");
    }
    xml.push_str("</worksheet>");
    xml
}

/// Write a minimal XLSX package with inline-string cells and table parts
pub fn create_mock_xlsx(path: &Path, sheets: &[MockSheet]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
    );
    let mut table_number = 0;
    for (i, sheet) in sheets.iter().enumerate() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
        for _ in &sheet.tables {
            table_number += 1;
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/tables/table{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/>"#,
                table_number
            ));
        }
    }
    content_types.push_str("</Types>");
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        workbook_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            sheet.name,
            i + 1,
            i + 1
        ));
    }
    workbook_xml.push_str("</sheets></workbook>");
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml.as_bytes())?;

    let mut rels_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for i in 0..sheets.len() {
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1,
            i + 1
        ));
    }
    rels_xml.push_str("</Relationships>");
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(rels_xml.as_bytes())?;

    let mut table_number = 0;
    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(sheet_xml(sheet).as_bytes())?;

        if sheet.tables.is_empty() {
            continue;
        }
        let mut sheet_rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
        );
        for (j, (name, reference)) in sheet.tables.iter().enumerate() {
            table_number += 1;
            sheet_rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table{}.xml"/>"#,
                j + 1,
                table_number
            ));
            zip.start_file(format!("xl/tables/table{}.xml", table_number), options)?;
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="{id}" name="{name}" displayName="{name}" ref="{reference}" totalsRowShown="0"><autoFilter ref="{reference}"/></table>"#,
                    id = table_number,
                    name = name,
                    reference = reference
                )
                .as_bytes(),
            )?;
        }
        sheet_rels.push_str("</Relationships>");
        zip.start_file(format!("xl/worksheets/_rels/sheet{}.xml.rels", i + 1), options)?;
        zip.write_all(sheet_rels.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

/// The workbook used across integration tests.
///
/// `Sales` holds a declared table over A1:B3, a blank row, then a second block
/// whose header has a gap. `Notes` holds a single row and `Blank` nothing.
pub fn sales_workbook(path: &Path) -> anyhow::Result<()> {
    create_mock_xlsx(
        path,
        &[
            MockSheet {
                name: "Sales",
                rows: vec![
                    (1, vec![("A", Cell::Text("Region")), ("B", Cell::Text("Amount"))]),
                    (2, vec![("A", Cell::Text("North")), ("B", Cell::Number(10.0))]),
                    (3, vec![("A", Cell::Text("South")), ("B", Cell::Number(20.5))]),
                    (5, vec![("A", Cell::Text("Item"))]),
                    (6, vec![("A", Cell::Text("Pen")), ("B", Cell::Number(3.0))]),
                    (7, vec![("A", Cell::Text("Cup"))]),
                ],
                tables: vec![("SalesTbl", "A1:B3")],
            },
            MockSheet {
                name: "Notes",
                rows: vec![(1, vec![("A", Cell::Text("hello"))])],
                tables: vec![],
            },
            MockSheet {
                name: "Blank",
                rows: vec![],
                tables: vec![],
            },
        ],
    )
}

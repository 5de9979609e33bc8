mod common;

use sheetchat_core::reader::{CellRange, read_workbook};
use sheetchat_core::table::record_headers;
use sheetchat_core::{ExtractError, Extractor, Scalar, SheetChatConfig, UnserializablePolicy};

#[test]
fn test_read_workbook_attaches_table_parts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sales.xlsx");
    common::sales_workbook(&path)?;

    let workbook = read_workbook(&path)?;
    assert_eq!(workbook.sheet_names(), vec!["Sales", "Notes", "Blank"]);

    let sales = workbook.get_sheet("Sales").unwrap();
    assert_eq!(sales.rows.len(), 7);
    assert_eq!(sales.defined_tables.len(), 1);
    assert_eq!(sales.defined_tables[0].name, "SalesTbl");
    assert_eq!(sales.defined_tables[0].region, CellRange::new(0, 0, 2, 1));

    assert!(workbook.get_sheet("Blank").unwrap().rows.is_empty());
    Ok(())
}

#[test]
fn test_extract_declared_and_implicit_tables() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sales.xlsx");
    common::sales_workbook(&path)?;

    let tables = Extractor::new().extract_file(&path)?;

    // Sheets without tables are omitted
    assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["Sales"]);
    let sales = tables.get("Sales").unwrap();
    assert_eq!(
        sales.keys().collect::<Vec<_>>(),
        vec!["SalesTbl", "Table_2", "Table_3"]
    );

    let declared = sales.get("SalesTbl").unwrap();
    assert_eq!(declared.len(), 2);
    assert_eq!(declared[0].get("Region"), Some(&Scalar::Text("North".to_string())));
    assert_eq!(declared[1].get("Amount"), Some(&Scalar::Number(20.5)));

    // The implicit pass covers the declared rows again
    assert_eq!(sales.get("Table_2"), Some(declared));

    let gapped = sales.get("Table_3").unwrap();
    assert_eq!(gapped.len(), 2);
    assert_eq!(record_headers(&gapped[0]), vec!["Item", "column_2"]);
    assert_eq!(gapped[0].get("column_2"), Some(&Scalar::Number(3.0)));
    assert_eq!(gapped[1].get("Item"), Some(&Scalar::Text("Cup".to_string())));
    assert_eq!(gapped[1].get("column_2"), Some(&Scalar::Null));
    Ok(())
}

#[test]
fn test_extracted_tables_serialize_to_plain_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sales.xlsx");
    common::sales_workbook(&path)?;

    let tables = Extractor::new().extract_file(&path)?;
    let json = serde_json::to_value(&tables)?;
    assert_eq!(
        json["Sales"]["SalesTbl"],
        serde_json::json!([
            { "Region": "North", "Amount": 10 },
            { "Region": "South", "Amount": 20.5 }
        ])
    );
    assert_eq!(
        json["Sales"]["Table_3"][1],
        serde_json::json!({ "Item": "Cup", "column_2": null })
    );
    Ok(())
}

#[test]
fn test_extraction_is_deterministic() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sales.xlsx");
    common::sales_workbook(&path)?;

    let mut config = SheetChatConfig::default();
    config.extraction.on_unserializable = UnserializablePolicy::Fail;
    let extractor = Extractor::with_config(config);
    assert_eq!(extractor.extract_file(&path)?, extractor.extract_file(&path)?);
    Ok(())
}

#[test]
fn test_corrupt_workbook() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"PK\x03\x04 truncated")?;

    let err = Extractor::new().extract_file(&path).unwrap_err();
    assert!(matches!(err, ExtractError::CorruptFile { .. }));
    assert!(err.to_string().starts_with("Error processing Excel file"));
    Ok(())
}

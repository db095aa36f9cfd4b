/*!
 * Tests for CSV loading, table operations and writing
 */

use anyhow::Result;
use csv_translate::errors::TableError;
use csv_translate::table::{LineEnding, Table};
use crate::common;

/// Test loading a file with quoted fields
#[test]
fn test_load_withCatalog_shouldReadRowsAndColumns() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_csv(temp_dir.path(), "catalog.csv")?;

    let table = Table::load(&path, b',')?;

    assert_eq!(table.column_count(), 4);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.cell(1, "description"), Some("Solid oak table, seats six"));
    assert_eq!(table.cell(2, "description"), Some(""));
    assert_eq!(table.cell(5, "description"), None);
    assert_eq!(table.cell(0, "missing"), None);

    Ok(())
}

/// Test that writing then loading keeps schema and values
#[test]
fn test_write_thenLoad_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_csv(temp_dir.path(), "catalog.csv")?;
    let out = temp_dir.path().join("copy.csv");

    let table = Table::load(&path, b',')?;
    table.write(&out, b',')?;
    let reloaded = Table::load(&out, b',')?;

    assert_eq!(reloaded.headers(), table.headers());
    let original: Vec<&[String]> = table.rows().iter().map(|r| r.values()).collect();
    let copied: Vec<&[String]> = reloaded.rows().iter().map(|r| r.values()).collect();
    assert_eq!(original, copied);

    Ok(())
}

/// Test that a header-only file is written back unchanged
#[test]
fn test_write_withHeaderOnly_shouldKeepHeader() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "empty.csv", "name,desc\n")?;
    let out = temp_dir.path().join("out.csv");

    Table::load(&path, b',')?.write(&out, b',')?;

    assert_eq!(common::read_file(&out)?, "name,desc\n");

    Ok(())
}

/// Test that CRLF files are written back with CRLF terminators
#[test]
fn test_write_withCrlfInput_shouldKeepCrlf() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "name,desc\r\nChair,\"two\nlines\"\r\nLamp,\r\n";
    let path = common::create_test_file(temp_dir.path(), "crlf.csv", content)?;
    let out = temp_dir.path().join("out.csv");

    let table = Table::load(&path, b',')?;
    assert_eq!(table.line_ending(), LineEnding::CrLf);
    assert_eq!(table.cell(0, "desc"), Some("two\nlines"));
    table.write(&out, b',')?;

    assert_eq!(common::read_file(&out)?, content);

    Ok(())
}

/// Test that a missing final newline stays missing
#[test]
fn test_toCsvString_withoutFinalNewline_shouldNotAddOne() -> Result<()> {
    let table = Table::from_csv_str("name,desc", b',')?;
    assert_eq!(table.to_csv_string(b',')?, "name,desc");

    let table = Table::from_csv_str("name,desc\r\nChair,oak", b',')?;
    assert_eq!(table.to_csv_string(b',')?, "name,desc\r\nChair,oak");

    Ok(())
}

/// Test line ending detection and override
#[test]
fn test_lineEnding_detect_shouldUseFirstLine() -> Result<()> {
    assert_eq!(LineEnding::detect("a,b\r\n1,2\n"), LineEnding::CrLf);
    assert_eq!(LineEnding::detect("a,b\n1,2\r\n"), LineEnding::Lf);
    assert_eq!(LineEnding::detect("a,b"), LineEnding::Lf);

    let table = Table::new(vec!["a".to_string()])?.with_line_ending(LineEnding::CrLf);
    assert_eq!(table.to_csv_string(b',')?, "a\r\n");

    Ok(())
}

/// Test loading with a different delimiter
#[test]
fn test_load_withSemicolonDelimiter_shouldSplitFields() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "semi.csv", "id;text\n1;a, b\n")?;

    let table = Table::load(&path, b';')?;
    assert_eq!(table.cell(0, "text"), Some("a, b"));

    Ok(())
}

/// Test that invalid UTF-8 is reported as a parse error naming the file
#[test]
fn test_load_withInvalidUtf8_shouldFailWithParseError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("latin1.csv");
    std::fs::write(&path, b"id,text\n1,caf\xe9\n")?;

    match Table::load(&path, b',') {
        Err(TableError::Parse { path: failed, message }) => {
            assert_eq!(failed, path);
            assert!(message.contains("UTF-8"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }

    Ok(())
}

/// Test that a missing file is a parse error
#[test]
fn test_load_withMissingFile_shouldFail() {
    assert!(matches!(Table::load("does/not/exist.csv", b','), Err(TableError::Parse { .. })));
}

/// Test building a table row by row
#[test]
fn test_pushRow_shouldCheckWidthAndNumberLines() -> Result<()> {
    let mut table = Table::new(vec!["id".to_string(), "text".to_string()])?;
    table.push_row(vec!["1".to_string(), "one".to_string()])?;
    table.push_row(vec!["2".to_string(), "two".to_string()])?;

    assert_eq!(table.rows()[1].line(), 3);
    assert!(matches!(table.push_row(vec!["3".to_string()]), Err(TableError::Schema(_))));
    assert_eq!(table.to_csv_string(b',')?, "id,text\n1,one\n2,two\n");

    Ok(())
}

/// Test editing cells and locating them for errors
#[test]
fn test_setCell_andCellRef_shouldUseRowAndColumn() -> Result<()> {
    let mut table = Table::from_csv_str("id,text\n1,one\n2,two\n", b',')?;
    table.set_cell(1, 1, "deux".to_string());
    table.set_cell(9, 1, "ignored".to_string());

    assert_eq!(table.cell(1, "text"), Some("deux"));
    assert_eq!(table.cell_ref(1, 1).to_string(), "row 2 (line 3), column 'text'");
    assert_eq!(table.column_values(0).collect::<Vec<_>>(), vec!["1", "2"]);

    Ok(())
}

/// Test that empty and duplicate headers are rejected
#[test]
fn test_new_withInvalidHeaders_shouldFailWithSchemaError() {
    assert!(matches!(Table::new(Vec::new()), Err(TableError::Schema(_))));
    assert!(matches!(Table::new(vec!["a".to_string(), " ".to_string()]), Err(TableError::Schema(_))));
    assert!(matches!(Table::new(vec!["a".to_string(), "a".to_string()]), Err(TableError::Schema(_))));
}

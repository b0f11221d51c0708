//! Spreadsheet emitter
//!
//! Writes a single-sheet SpreadsheetML workbook directly with zip. Cells use inline
//! strings so no shared-string table is needed.

use super::EmitError;
use crate::requirements::RequirementSet;
use quick_xml::escape::escape;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SHEET_NAME: &str = "Requirements";
pub const HEADER: [&str; 3] = ["Type", "Requirement", "Priority"];

const COLUMNS: [&str; 3] = ["A", "B", "C"];
const HEADER_STYLE: u32 = 1;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs></styleSheet>"#;

/// Placeholder priority: requirements phrased with "should" are flagged Must Have
pub fn priority_for(requirement: &str) -> &'static str {
    if requirement.to_lowercase().contains("should") {
        "Must Have"
    } else {
        "Should Have"
    }
}

/// Write the requirements spreadsheet to `path`, replacing any existing file
pub fn render_spreadsheet(set: &RequirementSet, path: &Path) -> Result<(), EmitError> {
    let file = File::create(path).map_err(|source| EmitError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let pack_err = |reason: String| EmitError::Spreadsheet {
        path: path.to_path_buf(),
        reason,
    };

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.to_string()),
        ("xl/styles.xml", STYLES_XML.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(set)),
    ];

    let mut zip = ZipWriter::new(file);
    for (name, xml) in parts {
        zip.start_file(name, part_options())
            .map_err(|e| pack_err(e.to_string()))?;
        zip.write_all(xml.as_bytes())
            .map_err(|e| pack_err(e.to_string()))?;
    }
    zip.finish().map_err(|e| pack_err(e.to_string()))?;

    tracing::debug!(
        "[Emitter] Spreadsheet: {} rows -> {}",
        set.len(),
        path.display()
    );

    Ok(())
}

/// Fixed timestamp keeps output byte-identical across runs
fn part_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
}

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        SHEET_NAME
    )
}

fn sheet_xml(set: &RequirementSet) -> String {
    let mut rows = String::new();
    push_row(&mut rows, 1, HEADER, Some(HEADER_STYLE));

    for (index, (category, requirement)) in set.rows().enumerate() {
        push_row(
            &mut rows,
            index + 2,
            [category.label(), requirement, priority_for(requirement)],
            None,
        );
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cols><col min="1" max="1" width="18" customWidth="1"/><col min="2" max="2" width="80" customWidth="1"/><col min="3" max="3" width="14" customWidth="1"/></cols><sheetData>{}</sheetData></worksheet>"#,
        rows
    )
}

fn push_row(out: &mut String, row: usize, cells: [&str; 3], style: Option<u32>) {
    out.push_str(&format!(r#"<row r="{}">"#, row));

    for (column, value) in COLUMNS.iter().zip(cells) {
        let style_attr = style.map(|s| format!(r#" s="{}""#, s)).unwrap_or_default();
        out.push_str(&format!(
            r#"<c r="{}{}" t="inlineStr"{}><is><t xml:space="preserve">{}</t></is></c>"#,
            column,
            row,
            style_attr,
            escape(&xml_safe(value))
        ));
    }

    out.push_str("</row>");
}

/// Drop control characters that are not allowed in XML 1.0
fn xml_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| matches!(c, '\t' | '\n' | '\r') || !c.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use tempfile::tempdir;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);

        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Data::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_rows_in_category_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user_stories.xlsx");
        let set = RequirementSet::new(
            vec!["Login".into(), "Logout".into()],
            vec!["Fast response".into()],
        );

        render_spreadsheet(&set, &path).unwrap();
        let rows = read_rows(&path);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["Type", "Requirement", "Priority"]);
        assert_eq!(rows[1], vec!["Functional", "Login", "Should Have"]);
        assert_eq!(rows[2], vec!["Functional", "Logout", "Should Have"]);
        assert_eq!(rows[3], vec!["Non-Functional", "Fast response", "Should Have"]);
    }

    #[test]
    fn test_special_characters_survive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user_stories.xlsx");
        let set = RequirementSet::new(
            vec!["Totals < 100 & \"quoted\" <b>tags</b>".into()],
            vec!["Bell\u{7} removed".into()],
        );

        render_spreadsheet(&set, &path).unwrap();
        let rows = read_rows(&path);

        assert_eq!(rows[1][1], "Totals < 100 & \"quoted\" <b>tags</b>");
        assert_eq!(rows[2][1], "Bell removed");
    }

    #[test]
    fn test_priority_placeholder() {
        assert_eq!(priority_for("The system SHOULD encrypt data"), "Must Have");
        assert_eq!(priority_for("Users can log in"), "Should Have");
    }
}

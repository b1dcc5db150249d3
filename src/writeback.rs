//! Writes live counts back into the original workbook.
//!
//! The input bytes are never modified. A new container is assembled in which
//! every part except the selected worksheet is copied raw, and inside the
//! worksheet XML only the targeted count cells are replaced or inserted. All
//! other XML events are re-emitted as read, so formulas, styles and the rest of
//! the sheet stay as they were.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::address::{decode_cell, encode_cell};
use crate::error::ExportError;
use crate::models::CountsByRow;
use crate::sheet::{locate_header_row, map_columns};
use crate::workbook::load_sheet;

/// Cell edits keyed by 1-based row number (the worksheet's own `r` numbering),
/// then by zero-based column.
type CellEdits = BTreeMap<u32, BTreeMap<u32, f64>>;

type XmlWriter = Writer<Vec<u8>>;

/// Applies `counts` to the count column of the selected sheet and returns the
/// new workbook bytes. Header row and count column are derived afresh from
/// `workbook`. Row indices are not checked against any item list, so category
/// and blank rows can be written too.
pub fn apply_counts(
    workbook: &[u8],
    counts: &CountsByRow,
    requested_sheet: Option<&str>,
) -> Result<Vec<u8>, ExportError> {
    let loaded = load_sheet(workbook, requested_sheet)?;
    let header_row = locate_header_row(&loaded.grid).ok_or(ExportError::HeaderRowNotFound)?;
    let count_col = map_columns(&loaded.grid, header_row).count_column();
    let edits = count_edits(counts, count_col)?;
    debug!(sheet = %loaded.name, header_row, count_col, cells = counts.len(), "writing counts");

    let mut archive = ZipArchive::new(Cursor::new(workbook))?;
    let part = worksheet_part(&mut archive, &loaded.name)?;
    let out = rewrite_archive(&mut archive, &part, &edits)?;
    info!(sheet = %loaded.name, part = %part, cells = counts.len(), "exported workbook");
    Ok(out)
}

fn count_edits(counts: &CountsByRow, col: u32) -> Result<CellEdits, ExportError> {
    let mut edits = CellEdits::new();
    for (&row, &value) in counts {
        if row == 0 {
            return Err(ExportError::InvalidRow(row));
        }
        if !value.is_finite() {
            return Err(ExportError::InvalidCount { row, value });
        }
        edits.entry(row).or_default().insert(col, value);
    }
    Ok(edits)
}

fn rewrite_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
    edits: &CellEdits,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut patched_part = false;
    for index in 0..archive.len() {
        let name = archive.by_index_raw(index)?.name().to_string();
        if name == part {
            let mut xml = Vec::new();
            archive.by_index(index)?.read_to_end(&mut xml)?;
            let patched = patch_sheet_xml(&xml, edits)?;
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(name, options)?;
            writer.write_all(&patched)?;
            patched_part = true;
        } else {
            writer.raw_copy_file(archive.by_index_raw(index)?)?;
        }
    }
    if !patched_part {
        return Err(ExportError::SheetNotFound);
    }
    Ok(writer.finish()?.into_inner())
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>, ExportError> {
    let mut entry = archive.by_name(name)?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Resolves a sheet name to its part path, e.g. "xl/worksheets/sheet2.xml",
/// through `xl/workbook.xml` and its relationships.
fn worksheet_part<R: Read + Seek>(archive: &mut ZipArchive<R>, sheet_name: &str) -> Result<String, ExportError> {
    let workbook_xml = read_entry(archive, "xl/workbook.xml")?;
    let rels_xml = read_entry(archive, "xl/_rels/workbook.xml.rels")?;
    let rel_id = sheet_relationship_id(&workbook_xml, sheet_name)?.ok_or(ExportError::SheetNotFound)?;
    let target = relationship_target(&rels_xml, &rel_id)?.ok_or(ExportError::SheetNotFound)?;
    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    })
}

fn sheet_relationship_id(xml: &[u8], sheet_name: &str) -> Result<Option<String>, ExportError> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let key = attr.key;
                    if key.as_ref() == b"name" {
                        name = Some(attr.unescape_value()?.into_owned());
                    } else if key.prefix().is_some() && key.local_name().as_ref() == b"id" {
                        rel_id = Some(attr.unescape_value()?.into_owned());
                    }
                }
                if name.as_deref() == Some(sheet_name) {
                    return Ok(rel_id);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn relationship_target(xml: &[u8], rel_id: &str) -> Result<Option<String>, ExportError> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = e.try_get_attribute("Id")?;
                let matches = match &id {
                    Some(attr) => attr.unescape_value()? == rel_id,
                    None => false,
                };
                if matches {
                    return match e.try_get_attribute("Target")? {
                        Some(target) => Ok(Some(target.unescape_value()?.into_owned())),
                        None => Ok(None),
                    };
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

fn element_prefix(e: &BytesStart) -> String {
    e.name()
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
        .unwrap_or_default()
}

fn attr_text(e: &BytesStart, key: &str) -> Result<Option<String>, ExportError> {
    match e.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Row number from `r`, or the one after the previous row when absent.
fn row_number(e: &BytesStart, previous: u32) -> Result<u32, ExportError> {
    match attr_text(e, "r")? {
        Some(r) => r
            .trim()
            .parse()
            .map_err(|_| ExportError::MalformedSheet(format!("bad row number {r:?}"))),
        None => Ok(previous + 1),
    }
}

/// Column of a `<c>` from its reference, or the one after the previous cell.
fn cell_column(e: &BytesStart, previous: Option<u32>) -> Result<u32, ExportError> {
    match attr_text(e, "r")? {
        Some(r) => decode_cell(r.trim())
            .map(|(_, col)| col)
            .ok_or_else(|| ExportError::MalformedSheet(format!("bad cell reference {r:?}"))),
        None => Ok(previous.map_or(0, |c| c + 1)),
    }
}

/// The `<f t="shared" ref="..">` of a replaced cell. Other cells in `ref` point
/// at it through `si`, so it has to stay on the cell.
struct SharedFormula {
    start: BytesStart<'static>,
    text: String,
}

fn is_shared_master(e: &BytesStart) -> Result<bool, ExportError> {
    Ok(attr_text(e, "t")?.as_deref() == Some("shared") && attr_text(e, "ref")?.is_some())
}

/// Writes `<c r=".."><v>value</v></c>`. With a template, the original cell's
/// attributes are kept except its type, which no longer applies to a number.
/// A shared formula master is written back ahead of the new value.
fn write_number_cell(
    writer: &mut XmlWriter,
    prefix: &str,
    template: Option<&BytesStart>,
    formula: Option<&SharedFormula>,
    row: u32,
    col: u32,
    value: f64,
) -> Result<(), ExportError> {
    let c_name = qualified(prefix, "c");
    let v_name = qualified(prefix, "v");
    let mut start = BytesStart::new(c_name.as_str());
    match template {
        Some(original) => {
            for attr in original.attributes() {
                let attr = attr?;
                if attr.key.local_name().as_ref() != b"t" {
                    start.push_attribute(attr);
                }
            }
        }
        None => start.push_attribute(("r", encode_cell(row - 1, col).as_str())),
    }
    let text = value.to_string();
    writer.write_event(Event::Start(start))?;
    if let Some(f) = formula {
        let f_name = String::from_utf8_lossy(f.start.name().as_ref()).into_owned();
        writer.write_event(Event::Start(f.start.clone()))?;
        writer.write_event(Event::Text(BytesText::from_escaped(f.text.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new(f_name.as_str())))?;
    }
    writer.write_event(Event::Start(BytesStart::new(v_name.as_str())))?;
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    writer.write_event(Event::End(BytesEnd::new(v_name.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(c_name.as_str())))?;
    Ok(())
}

fn write_new_row(
    writer: &mut XmlWriter,
    prefix: &str,
    row: u32,
    cells: &BTreeMap<u32, f64>,
) -> Result<(), ExportError> {
    let row_name = qualified(prefix, "row");
    let mut start = BytesStart::new(row_name.as_str());
    start.push_attribute(("r", row.to_string().as_str()));
    writer.write_event(Event::Start(start))?;
    for (&col, &value) in cells {
        write_number_cell(writer, prefix, None, None, row, col, value)?;
    }
    writer.write_event(Event::End(BytesEnd::new(row_name.as_str())))?;
    Ok(())
}

/// Emits every pending row numbered below `limit` (all of them when `None`).
fn flush_rows(
    writer: &mut XmlWriter,
    prefix: &str,
    pending: &mut CellEdits,
    limit: Option<u32>,
) -> Result<(), ExportError> {
    let rest = match limit {
        Some(limit) => pending.split_off(&limit),
        None => CellEdits::new(),
    };
    let due = std::mem::replace(pending, rest);
    for (row, cells) in &due {
        write_new_row(writer, prefix, *row, cells)?;
    }
    Ok(())
}

/// Emits pending cells of the current row whose column is below `limit`.
fn flush_cells(
    writer: &mut XmlWriter,
    prefix: &str,
    row: u32,
    pending: &mut BTreeMap<u32, f64>,
    limit: Option<u32>,
) -> Result<(), ExportError> {
    let rest = match limit {
        Some(limit) => pending.split_off(&limit),
        None => BTreeMap::new(),
    };
    let due = std::mem::replace(pending, rest);
    for (col, value) in due {
        write_number_cell(writer, prefix, None, None, row, col, value)?;
    }
    Ok(())
}

/// State of the open `<row>` while streaming through `<sheetData>`.
struct OpenRow {
    number: u32,
    pending: BTreeMap<u32, f64>,
    last_col: Option<u32>,
}

/// A targeted `<c>` whose original children are being read and dropped. It is
/// written once its end tag is reached.
struct ReplacedCell {
    template: BytesStart<'static>,
    row: u32,
    col: u32,
    value: f64,
    depth: usize,
    formula: Option<SharedFormula>,
    in_formula: bool,
}

/// Streams a worksheet part, replacing or inserting the edited cells and
/// passing every other event through untouched.
fn patch_sheet_xml(xml: &[u8], edits: &CellEdits) -> Result<Vec<u8>, ExportError> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + edits.len() * 32));
    let mut pending = edits.clone();
    let mut prefix = String::new();
    let mut in_sheet_data = false;
    let mut last_row = 0u32;
    let mut open_row: Option<OpenRow> = None;
    let mut replacing: Option<ReplacedCell> = None;

    loop {
        let event = reader.read_event()?;
        if let Some(cell) = replacing.as_mut() {
            match event {
                Event::Start(e) => {
                    if cell.depth == 1 && e.local_name().as_ref() == b"f" && is_shared_master(&e)? {
                        cell.formula = Some(SharedFormula { start: e.into_owned(), text: String::new() });
                        cell.in_formula = true;
                    }
                    cell.depth += 1;
                }
                Event::Empty(e) => {
                    if cell.depth == 1 && e.local_name().as_ref() == b"f" && is_shared_master(&e)? {
                        cell.formula = Some(SharedFormula { start: e.into_owned(), text: String::new() });
                    }
                }
                Event::Text(t) if cell.in_formula => {
                    if let Some(f) = cell.formula.as_mut() {
                        f.text.push_str(&String::from_utf8_lossy(&t));
                    }
                }
                Event::End(_) => {
                    cell.in_formula = false;
                    cell.depth -= 1;
                    if cell.depth == 0 {
                        if let Some(done) = replacing.take() {
                            write_number_cell(
                                &mut writer,
                                &prefix,
                                Some(&done.template),
                                done.formula.as_ref(),
                                done.row,
                                done.col,
                                done.value,
                            )?;
                        }
                    }
                }
                Event::Eof => return Err(ExportError::MalformedSheet("unterminated cell".to_string())),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Eof => break,

            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(&e);
                in_sheet_data = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(&e);
                if pending.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    writer.write_event(Event::Start(e))?;
                    flush_rows(&mut writer, &prefix, &mut pending, None)?;
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                flush_rows(&mut writer, &prefix, &mut pending, None)?;
                in_sheet_data = false;
                writer.write_event(Event::End(e))?;
            }

            Event::Start(e) if in_sheet_data && open_row.is_none() && e.local_name().as_ref() == b"row" => {
                let number = row_number(&e, last_row)?;
                last_row = number;
                flush_rows(&mut writer, &prefix, &mut pending, Some(number))?;
                writer.write_event(Event::Start(e))?;
                open_row = Some(OpenRow {
                    number,
                    pending: pending.remove(&number).unwrap_or_default(),
                    last_col: None,
                });
            }
            Event::Empty(e) if in_sheet_data && open_row.is_none() && e.local_name().as_ref() == b"row" => {
                let number = row_number(&e, last_row)?;
                last_row = number;
                flush_rows(&mut writer, &prefix, &mut pending, Some(number))?;
                match pending.remove(&number) {
                    Some(cells) => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        writer.write_event(Event::Start(e))?;
                        for (col, value) in cells {
                            write_number_cell(&mut writer, &prefix, None, None, number, col, value)?;
                        }
                        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                    }
                    None => writer.write_event(Event::Empty(e))?,
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"row" && open_row.is_some() => {
                if let Some(mut row) = open_row.take() {
                    flush_cells(&mut writer, &prefix, row.number, &mut row.pending, None)?;
                }
                writer.write_event(Event::End(e))?;
            }

            Event::Start(e) if e.local_name().as_ref() == b"c" && open_row.is_some() => {
                if let Some(row) = open_row.as_mut() {
                    let col = cell_column(&e, row.last_col)?;
                    row.last_col = Some(col);
                    flush_cells(&mut writer, &prefix, row.number, &mut row.pending, Some(col))?;
                    match row.pending.remove(&col) {
                        Some(value) => {
                            replacing = Some(ReplacedCell {
                                template: e.into_owned(),
                                row: row.number,
                                col,
                                value,
                                depth: 1,
                                formula: None,
                                in_formula: false,
                            });
                        }
                        None => writer.write_event(Event::Start(e))?,
                    }
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" && open_row.is_some() => {
                if let Some(row) = open_row.as_mut() {
                    let col = cell_column(&e, row.last_col)?;
                    row.last_col = Some(col);
                    flush_cells(&mut writer, &prefix, row.number, &mut row.pending, Some(col))?;
                    match row.pending.remove(&col) {
                        Some(value) => {
                            write_number_cell(&mut writer, &prefix, Some(&e), None, row.number, col, value)?
                        }
                        None => writer.write_event(Event::Empty(e))?,
                    }
                }
            }

            other => writer.write_event(other)?,
        }
    }

    if !pending.is_empty() {
        return Err(ExportError::MalformedSheet("worksheet has no sheetData".to_string()));
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::parse_sheet;
    use crate::workbook::tests::count_list_xlsx;
    use crate::workbook::PREFERRED_SHEET;
    use calamine::Data;

    const SHEET_PART: &str = "xl/worksheets/sheet2.xml";

    fn entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        read_entry(&mut archive, name).unwrap()
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(|s| s.to_string()).collect()
    }

    fn counts(pairs: &[(u32, f64)]) -> CountsByRow {
        pairs.iter().copied().collect()
    }

    fn value_at(bytes: &[u8], row: u32, col: u32) -> Option<Data> {
        let loaded = load_sheet(bytes, None).unwrap();
        loaded.grid.get_value((row, col)).cloned()
    }

    #[test]
    fn test_resolves_worksheet_part_by_name() {
        let bytes = count_list_xlsx(PREFERRED_SHEET);
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(worksheet_part(&mut archive, PREFERRED_SHEET).unwrap(), SHEET_PART);
        assert_eq!(worksheet_part(&mut archive, "Info").unwrap(), "xl/worksheets/sheet1.xml");
        assert!(matches!(
            worksheet_part(&mut archive, "Mangler"),
            Err(ExportError::SheetNotFound)
        ));
    }

    #[test]
    fn test_writes_count_into_blank_cell_and_nothing_else() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        let exported = apply_counts(&original, &counts(&[(7, 12.0)]), None).unwrap();

        let before = String::from_utf8(entry(&original, SHEET_PART)).unwrap();
        let after = String::from_utf8(entry(&exported, SHEET_PART)).unwrap();
        let inserted = r#"<c r="F7"><v>12</v></c>"#;
        assert!(after.contains(inserted));
        assert_eq!(after.replacen(inserted, "", 1), before);

        assert_eq!(value_at(&exported, 6, 5), Some(Data::Float(12.0)));
    }

    #[test]
    fn test_other_parts_are_unchanged() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        let exported = apply_counts(&original, &counts(&[(7, 12.0), (8, 6.0)]), None).unwrap();
        assert_eq!(entry_names(&original), entry_names(&exported));
        for name in entry_names(&original) {
            if name != SHEET_PART {
                assert_eq!(entry(&original, &name), entry(&exported, &name), "part changed: {name}");
            }
        }
    }

    #[test]
    fn test_overwrites_existing_count() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        assert_eq!(value_at(&original, 7, 5), Some(Data::Float(4.0)));
        let exported = apply_counts(&original, &counts(&[(8, 10.0)]), None).unwrap();
        assert_eq!(value_at(&exported, 7, 5), Some(Data::Float(10.0)));
        assert_eq!(value_at(&exported, 7, 4), Some(Data::Float(129.0)));
        assert_eq!(value_at(&exported, 7, 2), Some(Data::String("Espresso".to_string())));
    }

    #[test]
    fn test_formulas_survive_export() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        let exported = apply_counts(&original, &counts(&[(7, 2.0)]), None).unwrap();
        let after = String::from_utf8(entry(&exported, SHEET_PART)).unwrap();
        assert!(after.contains("E7*F7"));
        assert!(after.contains("E8*F8"));
    }

    #[test]
    fn test_round_trip_of_file_counts_is_a_no_op() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        let before = parse_sheet(&load_sheet(&original, None).unwrap().grid).unwrap();
        let baseline: CountsByRow = before
            .items
            .iter()
            .filter_map(|item| item.antall.map(|a| (item.row_index, a)))
            .collect();
        assert_eq!(baseline.len(), 2);

        let exported = apply_counts(&original, &baseline, None).unwrap();
        let after = parse_sheet(&load_sheet(&exported, None).unwrap().grid).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_rows_outside_item_list_are_written() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        // Row 6 is the "Kaffe" category row, row 9 is blank, row 14 does not exist.
        let exported = apply_counts(&original, &counts(&[(6, 3.0), (9, 1.0), (14, 9.0)]), None).unwrap();
        assert_eq!(value_at(&exported, 5, 5), Some(Data::Float(3.0)));
        assert_eq!(value_at(&exported, 8, 5), Some(Data::Float(1.0)));
        assert_eq!(value_at(&exported, 13, 5), Some(Data::Float(9.0)));

        let parsed = parse_sheet(&load_sheet(&exported, None).unwrap().grid).unwrap();
        assert_eq!(parsed.items.len(), 3);
        assert_eq!(parsed.items[0].kategori, "Kaffe");
    }

    #[test]
    fn test_fractional_count() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        let exported = apply_counts(&original, &counts(&[(11, 2.5)]), None).unwrap();
        assert_eq!(value_at(&exported, 10, 5), Some(Data::Float(2.5)));
    }

    #[test]
    fn test_empty_counts_reproduce_sheet() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        let exported = apply_counts(&original, &CountsByRow::new(), None).unwrap();
        assert_eq!(entry(&original, SHEET_PART), entry(&exported, SHEET_PART));
    }

    #[test]
    fn test_missing_header_is_an_export_error() {
        let original = count_list_xlsx("Mars");
        let result = apply_counts(&original, &counts(&[(7, 1.0)]), None);
        assert!(matches!(result, Err(ExportError::HeaderRowNotFound)));
    }

    #[test]
    fn test_requested_sheet_is_written() {
        let original = count_list_xlsx("Mars");
        let exported = apply_counts(&original, &counts(&[(7, 5.0)]), Some("Mars")).unwrap();
        let loaded = load_sheet(&exported, Some("Mars")).unwrap();
        assert_eq!(loaded.grid.get_value((6, 5)), Some(&Data::Float(5.0)));
    }

    #[test]
    fn test_rejects_non_finite_and_zero_rows() {
        let original = count_list_xlsx(PREFERRED_SHEET);
        assert!(matches!(
            apply_counts(&original, &counts(&[(7, f64::NAN)]), None),
            Err(ExportError::InvalidCount { row: 7, .. })
        ));
        assert!(matches!(
            apply_counts(&original, &counts(&[(0, 1.0)]), None),
            Err(ExportError::InvalidRow(0))
        ));
    }

    #[test]
    fn test_patch_keeps_style_and_drops_type() {
        let xml = br#"<worksheet><sheetData><row r="2"><c r="A2" s="4" t="s"><v>0</v></c><c r="B2" t="str"><f>1+1</f><v>2</v></c></row></sheetData></worksheet>"#;
        let edits: CellEdits = [(2, [(1, 7.0)].into_iter().collect())].into_iter().collect();
        let out = String::from_utf8(patch_sheet_xml(xml, &edits).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="2"><c r="A2" s="4" t="s"><v>0</v></c><c r="B2"><v>7</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_patch_keeps_shared_formula_master() {
        let xml = concat!(
            r#"<worksheet><sheetData>"#,
            r#"<row r="7"><c r="F7"><f t="shared" ref="F7:F8" si="0">E7*2</f><v>0</v></c></row>"#,
            r#"<row r="8"><c r="F8"><f t="shared" si="0"/><v>0</v></c></row>"#,
            r#"</sheetData></worksheet>"#,
        );
        let edits: CellEdits = [(7, [(5, 12.0)].into_iter().collect())].into_iter().collect();
        let out = String::from_utf8(patch_sheet_xml(xml.as_bytes(), &edits).unwrap()).unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<worksheet><sheetData>"#,
                r#"<row r="7"><c r="F7"><f t="shared" ref="F7:F8" si="0">E7*2</f><v>12</v></c></row>"#,
                r#"<row r="8"><c r="F8"><f t="shared" si="0"/><v>0</v></c></row>"#,
                r#"</sheetData></worksheet>"#,
            )
        );
    }

    #[test]
    fn test_patch_drops_shared_formula_reference() {
        let xml = br#"<worksheet><sheetData><row r="8"><c r="F8" t="n"><f t="shared" si="0"/><v>0</v></c></row></sheetData></worksheet>"#;
        let edits: CellEdits = [(8, [(5, 3.0)].into_iter().collect())].into_iter().collect();
        let out = String::from_utf8(patch_sheet_xml(xml, &edits).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="8"><c r="F8"><v>3</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_patch_inserts_rows_in_order() {
        let xml = br#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v></c></row><row r="5"/></sheetData></worksheet>"#;
        let edits: CellEdits = [
            (3, [(0, 3.0)].into_iter().collect()),
            (5, [(2, 5.0)].into_iter().collect()),
            (9, [(0, 9.0)].into_iter().collect()),
        ]
        .into_iter()
        .collect();
        let out = String::from_utf8(patch_sheet_xml(xml, &edits).unwrap()).unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v></c></row>"#,
                r#"<row r="3"><c r="A3"><v>3</v></c></row>"#,
                r#"<row r="5"><c r="C5"><v>5</v></c></row>"#,
                r#"<row r="9"><c r="A9"><v>9</v></c></row>"#,
                r#"</sheetData></worksheet>"#,
            )
        );
    }

    #[test]
    fn test_patch_fills_empty_sheet_data() {
        let xml = br#"<x:worksheet xmlns:x="ns"><x:sheetData/></x:worksheet>"#;
        let edits: CellEdits = [(1, [(0, 1.0)].into_iter().collect())].into_iter().collect();
        let out = String::from_utf8(patch_sheet_xml(xml, &edits).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<x:worksheet xmlns:x="ns"><x:sheetData><x:row r="1"><x:c r="A1"><x:v>1</x:v></x:c></x:row></x:sheetData></x:worksheet>"#
        );
    }
}

//! First worksheet of an .xlsx workbook as a grid of cell strings.
//!
//! The workbook is a zip archive. `xl/workbook.xml` lists the sheets in tab
//! order, `xl/_rels/workbook.xml.rels` maps each sheet to its part, and
//! string cells point into `xl/sharedStrings.xml`. The grid spans the used
//! range only: leading empty rows and columns are dropped, gaps inside the
//! range come back as empty strings.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::ZipArchive;
use zip::result::ZipError;

use super::ExtractError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn err(part: &str, e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Table(format!("xlsx {part}: {e}"))
}

pub(super) fn first_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| err("archive", e))?;

    let sheet_part = first_sheet_part(&mut archive)?;
    let shared = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };
    let xml = read_part(&mut archive, &sheet_part)?
        .ok_or_else(|| err(&sheet_part, "worksheet part is missing"))?;
    sheet_cells(&xml, &shared, &sheet_part)
}

fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<Option<String>, ExtractError> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(err(name, e)),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml).map_err(|e| err(name, e))?;
    Ok(Some(xml))
}

fn attr(e: &BytesStart<'_>, name: &str, part: &str) -> Result<Option<String>, ExtractError> {
    match e.try_get_attribute(name).map_err(|x| err(part, x))? {
        Some(a) => Ok(Some(a.unescape_value().map_err(|x| err(part, x))?.into_owned())),
        None => Ok(None),
    }
}

/// Zip path of the first sheet in tab order.
fn first_sheet_part(archive: &mut Archive<'_>) -> Result<String, ExtractError> {
    let workbook = read_part(archive, WORKBOOK_PART)?.ok_or_else(|| err(WORKBOOK_PART, "missing"))?;

    let mut rel_id = None;
    let mut reader = Reader::from_str(&workbook);
    loop {
        match reader.read_event().map_err(|e| err(WORKBOOK_PART, e))? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"sheet" => {
                rel_id = attr(&e, "r:id", WORKBOOK_PART)?;
                break;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let rel_id = rel_id.ok_or_else(|| err(WORKBOOK_PART, "workbook has no worksheets"))?;

    let rels = read_part(archive, WORKBOOK_RELS_PART)?
        .ok_or_else(|| err(WORKBOOK_RELS_PART, "missing"))?;
    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event().map_err(|e| err(WORKBOOK_RELS_PART, e))? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                if attr(&e, "Id", WORKBOOK_RELS_PART)?.as_deref() != Some(rel_id.as_str()) {
                    continue;
                }
                let target = attr(&e, "Target", WORKBOOK_RELS_PART)?
                    .ok_or_else(|| err(WORKBOOK_RELS_PART, format!("{rel_id} has no target")))?;
                return Ok(match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{target}"),
                });
            }
            Event::Eof => return Err(err(WORKBOOK_RELS_PART, format!("no relationship {rel_id}"))),
            _ => {}
        }
    }
}

/// One string per `<si>`; rich-text runs are concatenated, phonetic hints
/// (`<rPh>`) are skipped.
fn shared_strings(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().map_err(|e| err(SHARED_STRINGS_PART, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"si" => out.push(String::new()),
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| err(SHARED_STRINGS_PART, e))?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => out.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Zero-based column of a cell reference such as `B7` or `AA12`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference.bytes().take_while(u8::is_ascii_alphabetic).collect();
    if letters.is_empty() {
        return None;
    }
    let col = letters
        .iter()
        .fold(0usize, |acc, b| {
            acc.saturating_mul(26)
                .saturating_add(usize::from(b.to_ascii_uppercase() - b'A' + 1))
        });
    Some(col - 1)
}

/// Display text for a cell's raw value under its `t` type attribute.
fn cell_text(kind: Option<&str>, raw: String, shared: &[String]) -> String {
    match kind {
        Some("s") => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        Some("b") => (raw.trim() == "1").to_string(),
        Some("inlineStr" | "str" | "e") => raw,
        // numbers: `31` rather than `31.0`
        _ => match raw.trim().parse::<f64>() {
            Ok(n) => n.to_string(),
            Err(_) => raw,
        },
    }
}

fn sheet_cells(xml: &str, shared: &[String], part: &str) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut cells: Vec<(usize, usize, String)> = Vec::new();

    let mut row = 0usize;
    let mut next_row = 0usize;
    let mut next_col = 0usize;
    let mut cell: Option<(usize, Option<String>, String)> = None;
    let mut in_value = false;

    loop {
        match reader.read_event().map_err(|e| err(part, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => {
                    row = attr(&e, "r", part)?
                        .and_then(|r| r.parse::<usize>().ok())
                        .map_or(next_row, |r| r.saturating_sub(1));
                    next_row = row + 1;
                    next_col = 0;
                }
                b"c" => {
                    let col = attr(&e, "r", part)?
                        .and_then(|r| column_index(&r))
                        .unwrap_or(next_col);
                    next_col = col + 1;
                    cell = Some((col, attr(&e, "t", part)?, String::new()));
                }
                b"v" | b"t" if cell.is_some() => in_value = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"c" => {
                next_col = attr(&e, "r", part)?
                    .and_then(|r| column_index(&r))
                    .unwrap_or(next_col)
                    + 1;
            }
            Event::Text(t) if in_value => {
                if let Some((_, _, raw)) = cell.as_mut() {
                    raw.push_str(&t.unescape().map_err(|e| err(part, e))?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some((col, kind, raw)) = cell.take() {
                        let text = cell_text(kind.as_deref(), raw, shared);
                        if !text.is_empty() {
                            cells.push((row, col, text));
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(grid(cells))
}

/// Lay cells out over their bounding box.
fn grid(cells: Vec<(usize, usize, String)>) -> Vec<Vec<String>> {
    let (Some(top), Some(left)) = (
        cells.iter().map(|c| c.0).min(),
        cells.iter().map(|c| c.1).min(),
    ) else {
        return Vec::new();
    };
    let height = cells.iter().map(|c| c.0).max().unwrap_or(top) - top + 1;
    let width = cells.iter().map(|c| c.1).max().unwrap_or(left) - left + 1;

    let mut rows = vec![vec![String::new(); width]; height];
    for (r, c, text) in cells {
        rows[r - top][c - left] = text;
    }
    rows
}

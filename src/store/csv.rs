//! CSV quoting and parsing for the ledger
//!
//! Every field is written quoted, with embedded quotes doubled, so commas,
//! quotes and line breaks in display text survive a round trip.

use std::mem::take;

/// Quotes one field
pub fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Renders one newline-terminated row of quoted fields
pub fn render_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| quote_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Parses CSV text into rows of fields
///
/// Accepts quoted and bare fields, doubled-quote escapes, and LF or CRLF line
/// ends. Blank lines are skipped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                flush_row(&mut rows, &mut row);
            }
            _ => field.push(ch),
        }
    }

    // Unterminated last line
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        flush_row(&mut rows, &mut row);
    }

    rows
}

fn flush_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>) {
    let blank = row.len() == 1 && row[0].is_empty();
    let row = take(row);
    if !blank {
        rows.push(row);
    }
}

// src/utils/import.rs

use crate::{
    error::{AppError, AppResult},
    models::question::{NewOption, NewQuestion},
    utils::html::clean_html,
};

/// Splits a CSV document into records of cells.
/// Supports double-quoted cells with `""` escapes; a quoted cell may span lines.
/// Blank lines are dropped.
pub fn parse_csv(body: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(std::mem::take(&mut buf)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut buf));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => buf.push(ch),
        }
    }
    if !buf.is_empty() || !record.is_empty() {
        record.push(buf);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    if record.iter().any(|cell| !cell.trim().is_empty()) {
        records.push(record);
    }
}

/// Maps a correct-answer letter to an option index (A -> 0, b -> 1, ...).
fn letter_index(cell: &str) -> Option<usize> {
    let mut chars = cell.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
        }
        _ => None,
    }
}

/// Turns tabular rows into questions.
///
/// Rows shorter than three cells (after trailing blanks are dropped) are skipped
/// and counted; any other malformed row fails the whole batch.
pub fn parse_rows(rows: &[Vec<String>]) -> AppResult<(Vec<NewQuestion>, usize)> {
    let mut questions = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for (i, row) in rows.iter().enumerate() {
        let row_no = i + 1;
        let mut cells: Vec<&str> = row.iter().map(|c| c.trim()).collect();
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }

        if cells.len() < 3 {
            tracing::warn!("Skipping import row {}: expected at least 3 cells, got {}", row_no, cells.len());
            skipped += 1;
            continue;
        }

        let question = cells[0];
        let letter = cells[cells.len() - 1];
        let option_cells = &cells[1..cells.len() - 1];

        if question.is_empty() {
            return Err(AppError::BadRequest(format!("row {}: question text is empty", row_no)));
        }
        if let Some(pos) = option_cells.iter().position(|c| c.is_empty()) {
            return Err(AppError::BadRequest(format!(
                "row {}: option {} is empty",
                row_no,
                pos + 1
            )));
        }

        let correct = letter_index(letter)
            .filter(|idx| *idx < option_cells.len())
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "row {}: correct answer '{}' does not name one of {} options",
                    row_no,
                    letter,
                    option_cells.len()
                ))
            })?;

        questions.push(NewQuestion {
            question: clean_html(question),
            options: option_cells
                .iter()
                .enumerate()
                .map(|(idx, text)| NewOption {
                    option_text: clean_html(text),
                    is_correct: idx == correct,
                })
                .collect(),
        });
    }

    Ok((questions, skipped))
}

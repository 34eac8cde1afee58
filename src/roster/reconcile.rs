//! Roster reconciliation: header resolution, row matching and the
//! fill-the-gaps upsert.
//!
//! Everything here works on an in-memory [`Sheet`]; opening and persisting
//! the file is left to [`crate::roster::Roster`].

use super::cell::Cell;
use super::sheet::{Row, Sheet};
use crate::error::{Error, Result};
use crate::user::UserRecord;

pub const USERNAME: &str = "username";
pub const GENDER: &str = "gender";
pub const LASTNAME: &str = "lastname";
pub const CHAT_ID: &str = "chat_id";

/// Header written to a roster that has none.
pub const DEFAULT_HEADERS: [&str; 4] = [USERNAME, GENDER, LASTNAME, CHAT_ID];

/// Column positions of the known roster fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderIndexes {
    pub username: Option<usize>,
    pub gender: Option<usize>,
    pub lastname: Option<usize>,
    pub chat_id: Option<usize>,
}

/// Logical roster field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Gender,
    Lastname,
    ChatId,
}

impl Field {
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Username => USERNAME,
            Field::Gender => GENDER,
            Field::Lastname => LASTNAME,
            Field::ChatId => CHAT_ID,
        }
    }
}

/// What an upsert did to the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was appended.
    Inserted { row: usize, filled: Vec<Field> },
    /// An existing row matched; `filled` lists the blank cells that were set.
    Matched { row: usize, filled: Vec<Field> },
}

impl UpsertOutcome {
    pub fn row(&self) -> usize {
        match self {
            UpsertOutcome::Inserted { row, .. } | UpsertOutcome::Matched { row, .. } => *row,
        }
    }

    pub fn filled(&self) -> &[Field] {
        match self {
            UpsertOutcome::Inserted { filled, .. } | UpsertOutcome::Matched { filled, .. } => {
                filled
            }
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, UpsertOutcome::Inserted { .. })
    }
}

/// Locate the known columns in the header row.
///
/// Names are compared trimmed and lowercased; unknown columns are ignored.
/// When a name repeats, the right-most occurrence wins.
pub fn resolve_header_indexes(header: Option<&Row>) -> HeaderIndexes {
    let mut indexes = HeaderIndexes::default();
    let Some(header) = header else {
        return indexes;
    };

    for (i, cell) in header.cells().iter().enumerate() {
        match cell.as_text().to_lowercase().as_str() {
            USERNAME => indexes.username = Some(i),
            GENDER => indexes.gender = Some(i),
            LASTNAME => indexes.lastname = Some(i),
            CHAT_ID => indexes.chat_id = Some(i),
            _ => {}
        }
    }
    indexes
}

/// First data row matching the record by username or by chat id.
///
/// Within a row the username is checked before the chat id, but the scan is
/// row-major: an earlier row matching on chat id beats a later row matching
/// on username.
pub fn find_matching_row(
    sheet: &Sheet,
    indexes: &HeaderIndexes,
    record: &UserRecord,
) -> Option<usize> {
    let handle = record.normalized_handle();
    sheet
        .rows_from(1)
        .find(|(_, row)| row_matches(row, indexes, handle.as_deref(), record.numeric_id))
        .map(|(index, _)| index)
}

fn row_matches(
    row: &Row,
    indexes: &HeaderIndexes,
    handle: Option<&str>,
    chat_id: Option<i64>,
) -> bool {
    if let (Some(col), Some(handle)) = (indexes.username, handle) {
        let same_handle = row
            .cell(col)
            .and_then(Cell::as_str)
            .is_some_and(|text| text.trim().to_lowercase() == handle);
        if same_handle {
            return true;
        }
    }

    if let (Some(col), Some(chat_id)) = (indexes.chat_id, chat_id) {
        if row.cell(col).and_then(Cell::as_integer) == Some(chat_id) {
            return true;
        }
    }

    false
}

/// Merge `record` into the sheet.
///
/// The matching row (or a freshly appended one) only gets its blank cells
/// filled; values already present are never overwritten.
pub fn upsert(sheet: &mut Sheet, record: &UserRecord) -> Result<UpsertOutcome> {
    if !record.is_valid() {
        return Err(Error::InvalidInput(
            "user record has neither a username nor a chat_id".to_string(),
        ));
    }

    if sheet.row(0).is_none() {
        let header = sheet.row_or_create(0);
        for (i, name) in DEFAULT_HEADERS.iter().enumerate() {
            header.set_cell(i, Cell::text(*name));
        }
    }

    let mut indexes = resolve_header_indexes(sheet.row(0));
    if indexes.chat_id.is_none() {
        indexes.chat_id = Some(add_chat_id_column(sheet));
    }

    let matched = find_matching_row(sheet, &indexes, record);
    let target = match matched {
        Some(index) => index,
        None => sheet.append_row(),
    };
    let row = sheet.row_or_create(target);
    if let Some(column) = indexes.chat_id {
        row.ensure_cell(column);
    }

    let mut filled = Vec::new();
    let updates = [
        (Field::Username, indexes.username, text_value(&record.handle)),
        (Field::Gender, indexes.gender, text_value(&record.display_gender)),
        (Field::Lastname, indexes.lastname, text_value(&record.display_name)),
        (Field::ChatId, indexes.chat_id, record.numeric_id.map(Cell::number)),
    ];
    for (field, column, value) in updates {
        if fill_if_blank(row, column, value) {
            filled.push(field);
        }
    }

    Ok(match matched {
        Some(row) => UpsertOutcome::Matched { row, filled },
        None => UpsertOutcome::Inserted { row: target, filled },
    })
}

/// Records for every data row with a non-empty username.
pub fn read_records(sheet: &Sheet) -> Result<Vec<UserRecord>> {
    let indexes = resolve_header_indexes(sheet.row(0));
    let username_col = indexes
        .username
        .ok_or(Error::MissingRequiredColumn(USERNAME))?;

    let mut records = Vec::new();
    for (_, row) in sheet.rows_from(1) {
        let text_at = |column: Option<usize>| column.and_then(|c| row.cell(c)).map(Cell::as_text);

        let record = UserRecord {
            handle: text_at(Some(username_col)),
            display_gender: text_at(indexes.gender),
            display_name: text_at(indexes.lastname),
            numeric_id: indexes
                .chat_id
                .and_then(|c| row.cell(c))
                .and_then(Cell::as_integer),
        };

        if record.handle.as_deref().is_some_and(|h| !h.is_empty()) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Append a `chat_id` column to the header and allocate its cell in every row.
fn add_chat_id_column(sheet: &mut Sheet) -> usize {
    let header = sheet.row_or_create(0);
    let column = header.len();
    header.set_cell(column, Cell::text(CHAT_ID));

    for row in sheet.data_rows_mut() {
        row.ensure_cell(column);
    }
    column
}

fn text_value(value: &Option<String>) -> Option<Cell> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(Cell::text)
}

fn fill_if_blank(row: &mut Row, column: Option<usize>, value: Option<Cell>) -> bool {
    let (Some(column), Some(value)) = (column, value) else {
        return false;
    };
    if row.cell(column).map_or(true, Cell::is_blank) {
        row.set_cell(column, value);
        true
    } else {
        false
    }
}

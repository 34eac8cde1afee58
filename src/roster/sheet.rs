//! In-memory roster table.

use super::cell::Cell;

/// One roster row. Cells past the end of `cells` are unallocated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn from_texts(values: &[&str]) -> Self {
        Self::new(values.iter().map(|v| Cell::parse(v)).collect())
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Position right after the last allocated cell.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Make sure a cell exists at `index`, padding with blanks.
    /// An existing cell is left as it is.
    pub fn ensure_cell(&mut self, index: usize) -> &mut Cell {
        if self.cells.len() <= index {
            self.cells.resize(index + 1, Cell::Blank);
        }
        &mut self.cells[index]
    }

    pub fn set_cell(&mut self, index: usize, value: Cell) {
        *self.ensure_cell(index) = value;
    }
}

/// Ordered rows of the roster; row 0 is the header. Rows may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Option<Row>>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Option<Row>>) -> Self {
        Self { rows }
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index).and_then(Option::as_ref)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index).and_then(Option::as_mut)
    }

    /// Index of the last row slot, `None` for an empty sheet.
    pub fn last_row_index(&self) -> Option<usize> {
        self.rows.len().checked_sub(1)
    }

    /// Create (or replace) the row at `index`, leaving gaps as missing rows.
    pub fn create_row(&mut self, index: usize) -> &mut Row {
        if self.rows.len() <= index {
            self.rows.resize(index + 1, None);
        }
        self.rows[index].insert(Row::default())
    }

    /// Row at `index`, created empty when missing.
    pub fn row_or_create(&mut self, index: usize) -> &mut Row {
        if self.rows.len() <= index {
            self.rows.resize(index + 1, None);
        }
        self.rows[index].get_or_insert_with(Row::default)
    }

    /// Append an empty row after the last one and return its index.
    pub fn append_row(&mut self) -> usize {
        let index = self.rows.len();
        self.create_row(index);
        index
    }

    /// Present rows from `start` onward, paired with their index.
    pub fn rows_from(&self, start: usize) -> impl Iterator<Item = (usize, &Row)> {
        self.rows
            .iter()
            .enumerate()
            .skip(start)
            .filter_map(|(i, row)| row.as_ref().map(|r| (i, r)))
    }

    pub fn data_rows_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.rows.iter_mut().skip(1).flatten()
    }

    pub(crate) fn slots(&self) -> &[Option<Row>] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_cell_pads_with_blanks_and_keeps_existing() {
        let mut row = Row::from_texts(&["alice"]);
        row.ensure_cell(3);
        assert_eq!(row.len(), 4);
        assert_eq!(row.cell(2), Some(&Cell::Blank));

        row.set_cell(0, Cell::text("bob"));
        row.ensure_cell(0);
        assert_eq!(row.cell(0), Some(&Cell::text("bob")));
    }

    #[test]
    fn create_row_leaves_gaps_missing() {
        let mut sheet = Sheet::new();
        assert_eq!(sheet.last_row_index(), None);

        sheet.create_row(2);
        assert_eq!(sheet.last_row_index(), Some(2));
        assert!(sheet.row(0).is_none());
        assert!(sheet.row(1).is_none());
        assert!(sheet.row(2).is_some());
    }

    #[test]
    fn rows_from_skips_missing_rows() {
        let sheet = Sheet::from_rows(vec![
            Some(Row::from_texts(&["username"])),
            None,
            Some(Row::from_texts(&["alice"])),
        ]);
        let indexes: Vec<usize> = sheet.rows_from(1).map(|(i, _)| i).collect();
        assert_eq!(indexes, vec![2]);
    }

    #[test]
    fn append_row_goes_after_last_slot() {
        let mut sheet = Sheet::from_rows(vec![Some(Row::default()), None]);
        assert_eq!(sheet.append_row(), 2);
    }
}

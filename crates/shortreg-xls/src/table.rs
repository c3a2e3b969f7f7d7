use chrono::NaiveDateTime;

/// A typed cell as seen through a [`SheetTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableCell<'a> {
    Empty,
    Text(&'a str),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl TableCell<'_> {
    /// Text form used in emitted rows.
    ///
    /// Numbers use their shortest decimal representation (`43208`, `1.23`), date-times become
    /// ISO calendar dates (time of day dropped), and text is normalized by
    /// [`normalize_text`].
    pub fn to_text(&self) -> String {
        match self {
            TableCell::Empty => String::new(),
            TableCell::Text(text) => normalize_text(text).to_string(),
            TableCell::Number(n) => n.to_string(),
            TableCell::DateTime(dt) => dt.date().format("%Y-%m-%d").to_string(),
        }
    }

    /// `true` for empty cells and text cells that normalize to nothing.
    pub fn is_blank(&self) -> bool {
        match self {
            TableCell::Empty => true,
            TableCell::Text(text) => normalize_text(text).is_empty(),
            TableCell::Number(_) | TableCell::DateTime(_) => false,
        }
    }
}

/// Strip one trailing no-break space (common in the published sheets) and surrounding
/// whitespace.
pub(crate) fn normalize_text(text: &str) -> &str {
    text.strip_suffix('\u{a0}').unwrap_or(text).trim()
}

/// A fully-loaded sheet with coordinate-addressed, typed cells.
///
/// Coordinates are zero-based and absolute (row 0 / column 0 is `A1`). Cells outside the used
/// range are [`TableCell::Empty`].
pub trait SheetTable {
    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    fn cell(&self, row: usize, col: usize) -> TableCell<'_>;
}

impl<T: SheetTable + ?Sized> SheetTable for &T {
    fn row_count(&self) -> usize {
        (**self).row_count()
    }

    fn column_count(&self) -> usize {
        (**self).column_count()
    }

    fn cell(&self, row: usize, col: usize) -> TableCell<'_> {
        (**self).cell(row, col)
    }
}

/// Owned, in-memory [`SheetTable`]. Useful for tables assembled by other loaders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    rows: Vec<Vec<MemoryCell>>,
}

#[derive(Debug, Clone, PartialEq)]
enum MemoryCell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of text cells. Empty strings are stored as empty cells.
    pub fn push_text_row<S: AsRef<str>>(&mut self, cells: &[S]) -> &mut Self {
        self.rows.push(
            cells
                .iter()
                .map(|c| match c.as_ref() {
                    "" => MemoryCell::Empty,
                    text => MemoryCell::Text(text.to_string()),
                })
                .collect(),
        );
        self
    }

    /// Append an empty row.
    pub fn push_empty_row(&mut self) -> &mut Self {
        self.rows.push(Vec::new());
        self
    }

    pub fn set_text(&mut self, row: usize, col: usize, text: impl Into<String>) -> &mut Self {
        self.set(row, col, MemoryCell::Text(text.into()))
    }

    pub fn set_number(&mut self, row: usize, col: usize, value: f64) -> &mut Self {
        self.set(row, col, MemoryCell::Number(value))
    }

    pub fn set_datetime(&mut self, row: usize, col: usize, value: NaiveDateTime) -> &mut Self {
        self.set(row, col, MemoryCell::DateTime(value))
    }

    fn set(&mut self, row: usize, col: usize, cell: MemoryCell) -> &mut Self {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, MemoryCell::Empty);
        }
        cells[col] = cell;
        self
    }
}

impl SheetTable for MemoryTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn cell(&self, row: usize, col: usize) -> TableCell<'_> {
        match self.rows.get(row).and_then(|cells| cells.get(col)) {
            None | Some(MemoryCell::Empty) => TableCell::Empty,
            Some(MemoryCell::Text(text)) => TableCell::Text(text),
            Some(MemoryCell::Number(n)) => TableCell::Number(*n),
            Some(MemoryCell::DateTime(dt)) => TableCell::DateTime(*dt),
        }
    }
}

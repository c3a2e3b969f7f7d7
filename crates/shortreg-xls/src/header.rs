use crate::table::{normalize_text, SheetTable, TableCell};

/// Column labels identifying the register's header row.
///
/// All comparisons are case-insensitive. Every column except the ISIN column matches by prefix
/// (the published sheets append units and footnote markers, e.g. `Position i procent`); the ISIN
/// label must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPrefixes {
    pub holder: String,
    pub issuer: String,
    pub isin: String,
    pub position: String,
    pub date: String,
}

impl Default for HeaderPrefixes {
    fn default() -> Self {
        Self {
            holder: "Innehavare".to_string(),
            issuer: "Emittent".to_string(),
            isin: "ISIN".to_string(),
            position: "Position".to_string(),
            date: "Datum".to_string(),
        }
    }
}

impl HeaderPrefixes {
    /// Number of leading columns that make up the header.
    pub const WIDTH: usize = 5;

    /// Whether `row` of `table` is the header row.
    pub fn matches_row<T: SheetTable + ?Sized>(&self, table: &T, row: usize) -> bool {
        let label = |col| match table.cell(row, col) {
            TableCell::Text(text) => Some(normalize_text(text)),
            _ => None,
        };
        let (Some(holder), Some(issuer), Some(isin), Some(position), Some(date)) =
            (label(0), label(1), label(2), label(3), label(4))
        else {
            return false;
        };

        starts_with_ignore_case(holder, &self.holder)
            && starts_with_ignore_case(issuer, &self.issuer)
            && isin.to_lowercase() == self.isin.to_lowercase()
            && starts_with_ignore_case(position, &self.position)
            && starts_with_ignore_case(date, &self.date)
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.to_lowercase().starts_with(&prefix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MemoryTable;

    #[test]
    fn matches_published_header_labels() {
        let mut table = MemoryTable::new();
        table.push_text_row(&[
            "Innehavare av positionen",
            "Emittent\u{a0}",
            " isin ",
            "Position i procent",
            "Datum för positionen",
            "Kommentar",
        ]);
        assert!(HeaderPrefixes::default().matches_row(&table, 0));
    }

    #[test]
    fn isin_label_must_match_exactly() {
        let mut table = MemoryTable::new();
        table.push_text_row(&["Innehavare", "Emittent", "ISIN-kod", "Position", "Datum"]);
        assert!(!HeaderPrefixes::default().matches_row(&table, 0));
    }

    #[test]
    fn non_text_or_missing_labels_do_not_match() {
        let mut table = MemoryTable::new();
        table.push_text_row(&["Innehavare", "Emittent", "ISIN", "Position"]);
        table
            .push_text_row(&["Innehavare", "Emittent", "ISIN", "Position", ""])
            .set_number(1, 4, 1.0);
        let header = HeaderPrefixes::default();
        assert!(!header.matches_row(&table, 0));
        assert!(!header.matches_row(&table, 1));
        assert!(!header.matches_row(&table, 7));
    }

    #[test]
    fn labels_are_configurable() {
        let mut table = MemoryTable::new();
        table.push_text_row(&["Holder", "Issuer", "ISIN", "Net short", "Date"]);
        let header = HeaderPrefixes {
            holder: "holder".into(),
            issuer: "issuer".into(),
            isin: "isin".into(),
            position: "net".into(),
            date: "date".into(),
        };
        assert!(header.matches_row(&table, 0));
        assert!(!HeaderPrefixes::default().matches_row(&table, 0));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names from the header row, trimmed.
    pub headers: Vec<String>,
    /// Each data row, one String per header, in file order.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of `name` in the header row.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterate `(record number, cell)` for one column. Record numbers are 1-based.
    pub fn column(&self, index: usize) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(move |(i, row)| (i + 1, row.get(index).map(String::as_str).unwrap_or("")))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

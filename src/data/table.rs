use thiserror::Error;

use super::DataHandle;

/// Errors raised while assembling in-memory tables or hierarchies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("Row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Duplicate attribute name {0:?}")]
    DuplicateAttribute(String),
    #[error("Hierarchy row {row} has {found} levels, expected {expected}")]
    HierarchyWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Hierarchy maps value {0:?} more than once")]
    DuplicateHierarchyValue(String),
    #[error("Input has no header line")]
    MissingHeader,
}

/// Split delimited text into trimmed records, skipping blank lines.
pub(super) fn parse_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(delimiter).map(|cell| cell.trim().to_string()).collect())
        .collect()
}

/// Row-major in-memory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Build a table, checking that every row matches the header width.
    pub fn new<H, R>(header: H, rows: R) -> Result<Self, DataError>
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: Into<String>,
    {
        let header: Vec<String> = header.into_iter().map(Into::into).collect();
        for (idx, name) in header.iter().enumerate() {
            if header[..idx].contains(name) {
                return Err(DataError::DuplicateAttribute(name.clone()));
            }
        }
        let mut collected = Vec::new();
        for (row, cells) in rows.into_iter().enumerate() {
            let cells: Vec<String> = cells.into_iter().map(Into::into).collect();
            if cells.len() != header.len() {
                return Err(DataError::RowWidth {
                    row,
                    expected: header.len(),
                    found: cells.len(),
                });
            }
            collected.push(cells);
        }
        Ok(Self {
            header,
            rows: collected,
        })
    }

    /// Parse delimited text whose first non-blank line is the header.
    pub fn from_delimited(text: &str, delimiter: char) -> Result<Self, DataError> {
        let mut records = parse_records(text, delimiter).into_iter();
        let header = records.next().ok_or(DataError::MissingHeader)?;
        Self::new(header, records)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Iterate the cells of one column from top to bottom.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .filter_map(move |row| row.get(column).map(String::as_str))
    }
}

impl DataHandle for DataTable {
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_columns(&self) -> usize {
        self.header.len()
    }

    fn attribute_name(&self, column: usize) -> Option<&str> {
        self.header.get(column).map(String::as_str)
    }

    fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let err = DataTable::new(["a", "b"], [vec!["1", "2"], vec!["3"]]).unwrap_err();
        assert_eq!(
            err,
            DataError::RowWidth {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn rejects_duplicate_attributes() {
        let err = DataTable::new(["age", "age"], Vec::<Vec<&str>>::new()).unwrap_err();
        assert_eq!(err, DataError::DuplicateAttribute("age".to_string()));
    }

    #[test]
    fn parses_delimited_text() {
        let table = DataTable::from_delimited("age;zip\r\n34;81667\n\n45 ; *\n", ';').unwrap();
        assert_eq!(table.header(), &["age", "zip"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.value(1, 1), Some("*"));
        assert_eq!(
            DataTable::from_delimited("  \n", ';').unwrap_err(),
            DataError::MissingHeader
        );
    }

    #[test]
    fn handle_lookups() {
        let table = DataTable::new(["age", "zip"], [["34", "81667"], ["45", "*"]]).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_index_of("zip"), Some(1));
        assert_eq!(table.column_index_of("sex"), None);
        assert_eq!(table.value(1, 1), Some("*"));
        assert_eq!(table.value(2, 0), None);
        assert_eq!(table.column(0).collect::<Vec<_>>(), vec!["34", "45"]);
    }
}

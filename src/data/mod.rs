//! Tabular data access shared by the statistics and classification jobs.

mod hierarchy;
mod table;

pub use hierarchy::Hierarchy;
pub use table::{DataError, DataTable};

/// Read access to a table of string cells.
///
/// Implementations must be shareable with worker threads, so analysis jobs
/// can read while the owner keeps its own handle.
pub trait DataHandle: Send + Sync {
    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    fn attribute_name(&self, column: usize) -> Option<&str>;

    /// Index of the column named `name`, if present.
    fn column_index_of(&self, name: &str) -> Option<usize> {
        (0..self.num_columns()).find(|&column| self.attribute_name(column) == Some(name))
    }

    /// Cell value, or `None` when `row` or `column` is out of range.
    fn value(&self, row: usize, column: usize) -> Option<&str>;
}

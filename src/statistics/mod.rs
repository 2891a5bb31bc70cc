//! Frequency distributions of attribute values and the view that shows them.

mod builder;
mod distribution;
mod suppression;
mod table_view;

pub use builder::{DistributionComputer, InterruptibleStatistics, StatisticsError};
pub use distribution::{DistributionError, FREQUENCY_TOLERANCE, FrequencyDistribution};
pub use suppression::{SUPPRESSED_VALUE, hide_suppressed, is_suppressed};
pub use table_view::{
    DistributionRow, DistributionTableView, TableSnapshot, TableStatus, format_percentage,
};

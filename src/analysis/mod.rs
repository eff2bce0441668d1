//! Report aggregation.
//!
//! Pure functions from a slice of report records to the summary
//! collections the dashboard charts are drawn from.

pub mod aggregator;
pub mod dashboard;
pub mod demographics;
pub mod filter;
pub mod scatter;

pub use aggregator::*;
pub use dashboard::{Dashboard, DashboardOptions};
pub use demographics::*;
pub use filter::filter_by_ward_and_date_range;
pub use scatter::{scatter_points, AgeSpread};

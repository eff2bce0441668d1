//! Dashboard REST API client.
//!
//! This module talks to the kiosk backend: paging through `/reports` and
//! downloading the server-rendered exports from `/reports/export`.

mod export;
mod reports;

pub use export::{save_export, ExportFile, ExportFormat, ExportRequest};
pub use reports::ReportsClient;

#[cfg(test)]
mod test_server;

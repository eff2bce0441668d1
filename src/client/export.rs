//! Server-rendered exports from `GET /reports/export`.

use super::reports::{check_status, ReportsClient};
use crate::error::{ReportError, Result};
use crate::models::{DateRange, Granularity};
use reqwest::header::CONTENT_DISPOSITION;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// File type produced by the export endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Excel workbook with one sheet per chart
    #[default]
    Xlsx,
    /// Zip archive of CSV files
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    /// Name used when the response does not suggest one.
    pub fn fallback_filename(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "dashboard_inphieu.xlsx",
            ExportFormat::Csv => "dashboard_inphieu.zip",
        }
    }
}

/// Parameters for one export download.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub range: Option<DateRange>,
    pub granularity: Granularity,
    pub ward_id: Option<String>,
}

impl ExportRequest {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("format", self.format.as_str().to_string()),
            ("group_by", self.granularity.api_label().to_string()),
        ];
        if let Some(range) = self.range {
            query.push(("start_date", range.start.format("%Y-%m-%d").to_string()));
            query.push(("end_date", range.end.format("%Y-%m-%d").to_string()));
        }
        if let Some(ref ward_id) = self.ward_id {
            query.push(("ward_id", ward_id.clone()));
        }
        query
    }
}

/// A downloaded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ReportsClient {
    /// Download an export file.
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportFile> {
        let url = format!("{}/reports/export", self.base_url());
        let query = request.query();
        debug!("GET {} {:?}", url, query);

        let response = self
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response).await?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| request.format.fallback_filename().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?
            .to_vec();

        info!("Downloaded {} ({} bytes)", filename, bytes.len());
        Ok(ExportFile { filename, bytes })
    }
}

/// Extract `filename=` from a Content-Disposition value.
///
/// Only the final path component is kept.
fn filename_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim().trim_matches('"'))
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

/// Write an export into `dir` atomically, returning its final path.
pub fn save_export(file: &ExportFile, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
    let target = dir.join(&file.filename);

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ReportError::io(dir, e))?;
    temp.write_all(&file.bytes).map_err(|e| ReportError::io(&target, e))?;
    temp.persist(&target).map_err(|e| ReportError::io(&target, e.error))?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_server::{response, serve};
    use crate::config::ApiConfig;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn client(base_url: &str) -> ReportsClient {
        ReportsClient::new(ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition("attachment; filename=dashboard_inphieu.xlsx"),
            Some("dashboard_inphieu.xlsx".to_string())
        );
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="bao cao.zip""#),
            Some("bao cao.zip".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=../../etc/passwd"),
            Some("passwd".to_string())
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn test_query_sends_range_as_pair() {
        let request = ExportRequest {
            format: ExportFormat::Csv,
            range: Some(DateRange::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )),
            granularity: Granularity::Week,
            ward_id: Some("12".to_string()),
        };
        let query = request.query();

        assert!(query.contains(&("format", "csv".to_string())));
        assert!(query.contains(&("group_by", "Tuần".to_string())));
        assert!(query.contains(&("start_date", "2024-01-01".to_string())));
        assert!(query.contains(&("end_date", "2024-01-31".to_string())));
        assert!(query.contains(&("ward_id", "12".to_string())));

        let query = ExportRequest::default().query();
        assert_eq!(query.len(), 2);
    }

    #[tokio::test]
    async fn test_export_uses_suggested_filename() {
        let (url, requests) = serve(vec![response(
            200,
            &[(
                "Content-Disposition",
                "attachment; filename=dashboard_inphieu.zip",
            )],
            b"PK\x03\x04",
        )])
        .await;

        let request = ExportRequest {
            format: ExportFormat::Csv,
            ..Default::default()
        };
        let file = client(&url).export(&request).await.unwrap();

        assert_eq!(file.filename, "dashboard_inphieu.zip");
        assert_eq!(file.bytes, b"PK\x03\x04");
        let requests = requests.lock().unwrap();
        assert!(requests[0].starts_with("GET /reports/export?format=csv&group_by="));
    }

    #[tokio::test]
    async fn test_export_falls_back_to_default_filename() {
        let (url, _) = serve(vec![response(200, &[], b"xlsx-bytes")]).await;

        let file = client(&url).export(&ExportRequest::default()).await.unwrap();
        assert_eq!(file.filename, "dashboard_inphieu.xlsx");
    }

    #[tokio::test]
    async fn test_export_unauthorized() {
        let (url, _) = serve(vec![response(401, &[], b"")]).await;

        let err = client(&url)
            .export(&ExportRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Unauthorized));
    }

    #[test]
    fn test_save_export() {
        let dir = TempDir::new().unwrap();
        let target_dir = dir.path().join("exports");
        let file = ExportFile {
            filename: "dashboard_inphieu.xlsx".to_string(),
            bytes: vec![1, 2, 3],
        };

        let path = save_export(&file, &target_dir).unwrap();

        assert_eq!(path, target_dir.join("dashboard_inphieu.xlsx"));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(fs::read_dir(&target_dir).unwrap().count(), 1);
    }
}

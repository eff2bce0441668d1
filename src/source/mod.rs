//! Report record sources.
//!
//! Records reach the aggregations either straight from the dashboard API
//! or from JSON snapshots saved on disk. Both go through [`parse_records`],
//! which accepts a bare array or the API envelope and rejects anything
//! else up front.

use crate::error::{ReportError, Result};
use crate::models::ReportRecord;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// How deep snapshot directories are searched.
const MAX_SNAPSHOT_DEPTH: usize = 2;

/// Decode records from an array or a `{success, data, message}` envelope.
pub fn parse_records(value: Value) -> Result<Vec<ReportRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut envelope) => {
            if envelope.get("success") == Some(&Value::Bool(false)) {
                let message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request was not successful")
                    .to_string();
                return Err(ReportError::Api { message });
            }

            match envelope.remove("data") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(ReportError::invalid(format!(
                        "expected `data` to be an array of records, found {}",
                        kind_of(&other)
                    )))
                }
            }
        }
        other => {
            return Err(ReportError::invalid(format!(
                "expected an array of records, found {}",
                kind_of(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(ReportError::invalid(format!(
                    "record {} is {}, not an object",
                    i,
                    kind_of(&item)
                )));
            }
            serde_json::from_value(item).map_err(ReportError::from)
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Load records from a snapshot file, or every `.json` file under a
/// directory in path order.
pub fn load_path(path: &Path) -> Result<Vec<ReportRecord>> {
    if path.is_dir() {
        let files = snapshot_files(path);
        info!("Loading {} snapshot files from {}", files.len(), path.display());

        let mut records = Vec::new();
        for file in files {
            records.extend(load_file(&file)?);
        }
        Ok(records)
    } else {
        load_file(path)
    }
}

fn load_file(path: &Path) -> Result<Vec<ReportRecord>> {
    let content = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let value: Value = serde_json::from_str(&content)?;
    let records = parse_records(value)?;
    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

fn snapshot_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .max_depth(MAX_SNAPSHOT_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_parse_bare_array() {
        let records = assert_ok!(parse_records(json!([
            {"procedure": "Đăng ký khai tử", "count": 2},
            {"procedure": "Đăng ký kết hôn"}
        ])));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].weight(), 1);
    }

    #[test]
    fn test_parse_envelope() {
        let records = assert_ok!(parse_records(json!({
            "success": true,
            "data": [{"ward_id": 3, "hour": 9}],
            "total": 1
        })));
        assert_eq!(records[0].ward_id.as_deref(), Some("3"));
    }

    #[test]
    fn test_envelope_without_data_is_empty() {
        let records = assert_ok!(parse_records(json!({"success": true, "data": null})));
        assert!(records.is_empty());
    }

    #[test]
    fn test_failed_envelope() {
        let err = assert_err!(parse_records(json!({
            "success": false,
            "message": "Lỗi khi truy vấn dữ liệu"
        })));
        assert!(matches!(err, ReportError::Api { .. }));
        assert!(err.to_string().contains("Lỗi khi truy vấn dữ liệu"));
    }

    #[test]
    fn test_rejects_non_array_shapes() {
        let err = assert_err!(parse_records(json!(42)));
        assert!(matches!(err, ReportError::InvalidArgument { .. }));

        let err = assert_err!(parse_records(json!({"data": "nope"})));
        assert!(matches!(err, ReportError::InvalidArgument { .. }));

        let err = assert_err!(parse_records(json!([{"count": 1}, "loose"])));
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn test_bad_field_only_affects_its_record() {
        let records = assert_ok!(parse_records(json!([
            {"procedure": "Đăng ký kết hôn", "domain": "Hộ tịch", "count": 2},
            {"procedure": 42, "domain": "Hộ tịch", "count": 1},
            {"gender": 1, "domain": "Hộ khẩu"}
        ])));

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].procedure, None);
        assert_eq!(records[1].domain.as_deref(), Some("Hộ tịch"));
        assert_eq!(records[2].gender, None);

        let domains = crate::analysis::by_domain(&records);
        assert_eq!(domains[0].name, "Hộ tịch");
        assert_eq!(domains[0].value, 3);
    }

    #[test]
    fn test_empty_array() {
        assert!(assert_ok!(parse_records(json!([]))).is_empty());
    }

    #[test]
    fn test_load_directory_in_path_order() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"success": true, "data": [{"id": 2}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("a.json"), r#"[{"id": 1}]"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join(".hidden.json"), "not json").unwrap();

        let records = load_path(dir.path()).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_path(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{").unwrap();

        let err = load_path(&path).unwrap_err();
        assert!(matches!(err, ReportError::Json(_)));
    }
}

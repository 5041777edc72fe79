//! Document status snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// What is known about a document without reading its content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub size: u64,
    pub size_human: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_locked_by_other: bool,
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document: {}", self.path.display())?;
        if !self.exists {
            writeln!(f, "  Exists:   no")?;
        } else {
            writeln!(f, "  Exists:   yes")?;
            writeln!(f, "  Size:     {} ({} bytes)", self.size_human, self.size)?;
            match self.last_modified {
                Some(ts) => writeln!(f, "  Modified: {}", ts.to_rfc3339())?,
                None => writeln!(f, "  Modified: unknown")?,
            }
        }
        write!(
            f,
            "  Locked:   {}",
            if self.is_locked_by_other {
                "by another holder"
            } else {
                "no"
            }
        )
    }
}

/// Stat `path`. Anything that cannot be determined falls back to "absent".
pub(crate) async fn collect_status(path: &Path, is_locked_by_other: bool) -> StoreStatus {
    let (exists, size, last_modified) = match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let modified = meta.modified().ok().map(DateTime::<Utc>::from);
            (true, meta.len(), modified)
        }
        Err(_) => (false, 0, None),
    };

    StoreStatus {
        path: path.to_path_buf(),
        exists,
        size,
        size_human: format_size(size),
        last_modified,
        is_locked_by_other,
    }
}

/// Format a byte count in human-readable form (1024 base).
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[tokio::test]
    async fn test_missing_file_degrades_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let status = collect_status(&temp_dir.path().join("missing.json"), false).await;

        assert!(!status.exists);
        assert_eq!(status.size, 0);
        assert_eq!(status.size_human, "0 B");
        assert!(status.last_modified.is_none());
    }

    #[tokio::test]
    async fn test_existing_file_reports_size_and_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        std::fs::write(&path, "{\"a\": 1}\n").unwrap();

        let status = collect_status(&path, true).await;
        assert!(status.exists);
        assert_eq!(status.size, 9);
        assert!(status.last_modified.is_some());
        assert!(status.is_locked_by_other);
        assert!(status.to_string().contains("by another holder"));
    }

    #[test]
    fn test_status_serializes_for_json_output() {
        let status = StoreStatus {
            path: PathBuf::from("state.json"),
            exists: false,
            size: 0,
            size_human: format_size(0),
            last_modified: None,
            is_locked_by_other: false,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["exists"], false);
        assert_eq!(json["last_modified"], serde_json::Value::Null);
    }
}

//! Label table loading
//!
//! Each partition's ground truth is a CSV table with one row per word image:
//! an `IMAGE` column holding the file name (relative to the partition's image
//! directory) and a `MEDICINE_NAME` column holding the free-text label.

use std::path::Path;

use serde::Deserialize;

use crate::utils::error::{Error, Result};

/// One row of a partition's label table
#[derive(Debug, Clone, Deserialize)]
pub struct LabelRecord {
    /// Image file name, relative to the partition's image directory
    #[serde(rename = "IMAGE")]
    pub image: String,

    /// Ground-truth medicine name, as written in the table (not yet cleaned)
    #[serde(rename = "MEDICINE_NAME")]
    pub medicine_name: String,
}

/// Load a label table from a CSV file.
///
/// File names are trimmed of surrounding whitespace. A missing file or a row
/// that does not match the expected columns is fatal.
pub fn load_label_table(path: &Path) -> Result<Vec<LabelRecord>> {
    let data_err = |reason: String| Error::DataLoad {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::Reader::from_path(path).map_err(|e| data_err(e.to_string()))?;

    let mut records = Vec::new();
    for row in reader.deserialize::<LabelRecord>() {
        let mut record = row.map_err(|e| data_err(e.to_string()))?;
        record.image = record.image.trim().to_string();
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_label_table() {
        let path = write_temp_csv(
            "medscript_labels_ok.csv",
            "IMAGE,MEDICINE_NAME\n0.png,Napa\n 1.png ,Para-cetamol\n",
        );
        let records = load_label_table(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image, "0.png");
        assert_eq!(records[0].medicine_name, "Napa");
        // file names are trimmed, labels are left raw
        assert_eq!(records[1].image, "1.png");
        assert_eq!(records[1].medicine_name, "Para-cetamol");
    }

    #[test]
    fn test_missing_table_is_data_load_error() {
        let result = load_label_table(Path::new("/nonexistent/labels.csv"));
        assert!(matches!(result, Err(Error::DataLoad { .. })));
    }

    #[test]
    fn test_malformed_table_is_data_load_error() {
        let path = write_temp_csv("medscript_labels_bad.csv", "WRONG,HEADERS\na,b\n");
        let result = load_label_table(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(Error::DataLoad { .. })));
    }
}

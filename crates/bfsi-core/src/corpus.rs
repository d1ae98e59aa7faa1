use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::QaEntry;

/// Read a JSON array of `{instruction, input, output}` objects.
///
/// A missing file is reported as `Error::NotFound` so callers can degrade to
/// an empty index; anything unreadable or malformed is `Error::Operation`.
pub fn load_corpus(path: &Path) -> Result<Vec<QaEntry>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("corpus file {}", path.display())));
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Operation(format!("reading {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Operation(format!("parsing {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_corpus(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn preserves_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dataset.json");
        fs::write(
            &path,
            r#"[{"instruction":"a","input":"","output":"1"},{"instruction":"b","input":"","output":"2"}]"#,
        )
        .unwrap();
        let entries = load_corpus(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].instruction, "a");
        assert_eq!(entries[1].output, "2");
    }

    #[test]
    fn malformed_json_is_operation_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dataset.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_corpus(&path), Err(Error::Operation(_))));
    }
}

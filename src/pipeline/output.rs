//! JSON file output.
//!
//! Every record is written atomically: serialise to `<name>.json.tmp` next to
//! the target, then rename over it, so a reader never sees a half-written
//! file. Parent directories are created on demand.

use crate::error::IngestError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Serialise `value` as UTF-8 JSON with 4-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T, path: &Path) -> Result<Vec<u8>, IngestError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(|e| IngestError::Serialize {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(buf)
}

/// Write `value` to `path` as pretty JSON.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IngestError> {
    let bytes = to_pretty_json(value, path)?;
    let write_err = |e: std::io::Error| IngestError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// `<dir>/<id>.json`. Path separators in `id` become `_`, so the file always
/// lands directly inside `dir`.
pub fn record_path(dir: &Path, id: &str) -> PathBuf {
    let stem: String = id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{stem}.json"))
}

/// File name for a wiki page title: spaces become `_`, `/` becomes `and`.
pub fn wiki_file_name(title: &str) -> String {
    format!("{}.json", title.replace(' ', "_").replace('/', "and"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wiki_names() {
        assert_eq!(wiki_file_name("TFE AWS/Azure setup"), "TFE_AWS_andAzure_setup.json");
        assert_eq!(wiki_file_name("plain"), "plain.json");
    }

    #[test]
    fn record_paths() {
        assert_eq!(record_path(Path::new("/out/articles"), "12"), PathBuf::from("/out/articles/12.json"));
    }

    #[test]
    fn record_ids_cannot_leave_the_directory() {
        let dir = Path::new("/out/articles");
        for id in ["../x", "a/b", "..\\..\\etc", "/abs"] {
            let path = record_path(dir, id);
            assert_eq!(path.parent(), Some(dir), "id {id:?} gave {}", path.display());
        }
        assert_eq!(record_path(dir, "../x"), dir.join(".._x.json"));
    }

    #[test]
    fn pretty_json_uses_four_spaces() {
        let bytes = to_pretty_json(&json!({"a": [1]}), Path::new("x")).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\n    \"a\": [\n        1\n    ]\n}");
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        let bytes = to_pretty_json(&json!({"t": "café"}), Path::new("x")).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("café"));
    }

    #[tokio::test]
    async fn write_creates_dirs_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/7.json");
        write_json(&path, &json!({"id": 7})).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["id"], 7);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.json");
        write_json(&path, &json!({"v": 1})).await.unwrap();
        write_json(&path, &json!({"v": 2})).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains('2'));
    }

    #[tokio::test]
    async fn write_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_json(&blocker.join("1.json"), &json!({})).await.unwrap_err();
        assert!(matches!(err, IngestError::OutputWriteFailed { .. }));
    }
}

//! Append-only newline-delimited JSON files

use crate::error::{LedgerError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Append one record as a single line, then sync it to disk
///
/// Parent directories are created on demand. If the file ends in a torn
/// line (no trailing newline) the record starts on a fresh line, so it
/// never merges with the torn bytes.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| LedgerError::io(path, e))?;
    if has_torn_tail(&mut file).map_err(|e| LedgerError::io(path, e))? {
        tracing::warn!(path = %path.display(), "ledger ends in a partial line; starting a new line");
        line.insert(0, '\n');
    }
    file.write_all(line.as_bytes())
        .map_err(|e| LedgerError::io(path, e))?;
    file.sync_data().map_err(|e| LedgerError::io(path, e))
}

fn has_torn_tail(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Non-blank lines of a JSONL file with their 1-based line numbers
///
/// A missing file has no lines. A line that is not valid UTF-8 is returned
/// as `None` so callers can skip or report it.
///
/// # Errors
/// Returns [`LedgerError::Io`] if the file exists but cannot be read.
pub fn read_lines(path: &Path) -> Result<Vec<(usize, Option<String>)>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LedgerError::io(path, e)),
    };

    Ok(bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(index, raw)| match std::str::from_utf8(raw) {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| (index + 1, Some(text.to_owned())))
            }
            Err(_) => Some((index + 1, None)),
        })
        .collect())
}

/// Read every well-formed record
///
/// A missing file is an empty ledger. Blank lines, lines that are not
/// UTF-8, and lines that do not decode as `T` are skipped.
///
/// # Errors
/// Returns [`LedgerError::Io`] if the file exists but cannot be read.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for (line_no, line) in read_lines(path)? {
        let Some(line) = line else {
            tracing::warn!(path = %path.display(), line = line_no, "skipping non-UTF-8 ledger line");
            continue;
        };
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = line_no, error = %e, "skipping malformed ledger line");
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: String,
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let records: Vec<Entry> = read_records(&dir.path().join("absent.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn append_creates_parents_and_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/log.jsonl");

        append_record(&path, &Entry { id: "a".into() }).unwrap();
        append_record(&path, &Entry { id: "b".into() }).unwrap();

        let records: Vec<Entry> = read_records(&path).unwrap();
        assert_eq!(records, vec![Entry { id: "a".into() }, Entry { id: "b".into() }]);
    }

    #[test]
    fn malformed_and_blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n\nnot json\n{\"other\":1}\r\n{\"id\":\"b\"}\n").unwrap();

        let records: Vec<Entry> = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "b");
    }

    #[test]
    fn non_utf8_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");
        let mut bytes = b"{\"id\":\"a\"}\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe garbage\n{\"id\":\"b\"}\n");
        fs::write(&path, bytes).unwrap();

        let records: Vec<Entry> = read_records(&path).unwrap();
        assert_eq!(records, vec![Entry { id: "a".into() }, Entry { id: "b".into() }]);
    }

    #[test]
    fn append_after_a_torn_tail_starts_a_new_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n{\"id\":\"to").unwrap();

        append_record(&path, &Entry { id: "b".into() }).unwrap();

        let records: Vec<Entry> = read_records(&path).unwrap();
        assert_eq!(records, vec![Entry { id: "a".into() }, Entry { id: "b".into() }]);
        assert!(fs::read_to_string(&path).unwrap().ends_with("{\"id\":\"b\"}\n"));
    }
}

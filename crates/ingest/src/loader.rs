//! Telemetry export loading.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use netsoc_core::{EventRecord, DEFAULT_MAX_LOG_BYTES};

use crate::error::IngestError;
use crate::flatten::{extract_records, flatten_record, FlatRecord};
use crate::normalize::normalize;
use crate::stats::DatasetStats;
use crate::timestamp::{self, Resolution};
use crate::zeek;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    ZeekTsv,
    JsonContainer,
    JsonLines,
}

/// Normalized events plus what was learned while loading them.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Sorted by timestamp (stable).
    pub events: Vec<EventRecord>,
    pub format: SourceFormat,
    /// Records dropped because a time field was present but unparsable.
    pub dropped: usize,
    /// True when no record carried a time field and a synthetic sequence
    /// was assigned.
    pub synthetic_time: bool,
    /// Every flattened attribute name seen in the input.
    pub columns: BTreeSet<String>,
}

impl LoadedDataset {
    pub fn stats(&self) -> DatasetStats {
        DatasetStats::compute(self)
    }
}

/// Load and normalize a telemetry export from disk, refusing anything
/// larger than [`DEFAULT_MAX_LOG_BYTES`].
pub fn load_events(path: &Path) -> Result<LoadedDataset, IngestError> {
    load_events_limited(path, DEFAULT_MAX_LOG_BYTES)
}

/// Load a regular file of at most `max_bytes`. Devices, FIFOs and
/// directories are rejected before any read.
pub fn load_events_limited(path: &Path, max_bytes: u64) -> Result<LoadedDataset, IngestError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(IngestError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
        return Err(IngestError::NotAFile(path.to_path_buf()));
    }
    let too_large = |size| IngestError::TooLarge {
        path: path.to_path_buf(),
        size,
        limit: max_bytes,
    };
    if meta.len() > max_bytes {
        return Err(too_large(meta.len()));
    }

    // The file may grow between stat and read.
    let mut bytes = Vec::with_capacity(meta.len() as usize);
    File::open(path)?
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)?;
    if bytes.len() as u64 > max_bytes {
        return Err(too_large(bytes.len() as u64));
    }
    let text = String::from_utf8_lossy(&bytes);
    let dataset = parse_events(&text)?;

    info!(
        path = %path.display(),
        format = ?dataset.format,
        events = dataset.events.len(),
        dropped = dataset.dropped,
        "telemetry loaded"
    );
    Ok(dataset)
}

/// Resolve a client-supplied path against `root` and refuse anything that
/// lands outside it once symlinks and `..` are resolved.
pub fn resolve_within(root: &Path, requested: &Path) -> Result<PathBuf, IngestError> {
    let canonical = |p: &Path| {
        p.canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => IngestError::NotFound(p.to_path_buf()),
            _ => IngestError::Io(e),
        })
    };
    let root = canonical(root)?;
    let candidate = canonical(&root.join(requested))?;
    if !candidate.starts_with(&root) {
        warn!(requested = %requested.display(), "rejected path outside data directory");
        return Err(IngestError::OutsideDataDir(requested.to_path_buf()));
    }
    Ok(candidate)
}

/// Parse an export already in memory. The format is detected from content.
pub fn parse_events(text: &str) -> Result<LoadedDataset, IngestError> {
    let (format, records) = if zeek::looks_like_zeek(text) {
        (SourceFormat::ZeekTsv, zeek::parse(text)?)
    } else {
        match serde_json::from_str::<Value>(text) {
            Ok(container) => {
                let records = extract_records(container)
                    .into_iter()
                    .filter_map(flatten_record)
                    .collect();
                (SourceFormat::JsonContainer, records)
            }
            Err(_) => (SourceFormat::JsonLines, parse_json_lines(text)),
        }
    };

    if records.is_empty() {
        return Err(IngestError::Empty(format!("{format:?} input")));
    }
    Ok(assemble(format, records))
}

/// One JSON object per line. Array brackets and trailing commas from
/// pretty-printed dumps are tolerated; unparsable lines are skipped.
fn parse_json_lines(text: &str) -> Vec<FlatRecord> {
    let mut skipped = 0usize;
    let records: Vec<FlatRecord> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !matches!(*l, "[" | "]" | ","))
        .filter_map(|line| {
            let parsed = serde_json::from_str::<Value>(line.trim_end_matches(','))
                .ok()
                .and_then(flatten_record);
            if parsed.is_none() {
                skipped += 1;
            }
            parsed
        })
        .collect();

    if skipped > 0 {
        debug!(skipped, "skipped unparsable JSON lines");
    }
    records
}

fn assemble(format: SourceFormat, records: Vec<FlatRecord>) -> LoadedDataset {
    let columns: BTreeSet<String> = records.iter().flat_map(|r| r.keys().cloned()).collect();
    let resolutions: Vec<Resolution> = records.iter().map(timestamp::resolve).collect();
    let synthetic_time = resolutions.iter().all(|r| *r == Resolution::Missing);

    let mut dropped = 0usize;
    let mut events = Vec::with_capacity(records.len());

    for (index, (record, resolution)) in records.into_iter().zip(resolutions).enumerate() {
        let ts = match resolution {
            Resolution::Resolved(ts) => ts,
            Resolution::Missing if synthetic_time => timestamp::synthetic(index),
            Resolution::Missing | Resolution::Invalid => {
                dropped += 1;
                continue;
            }
        };
        events.push(normalize(record, ts));
    }

    if synthetic_time {
        warn!(records = events.len(), "no time field in dataset, assigned synthetic sequence");
    }
    if dropped > 0 {
        warn!(dropped, "dropped records without a usable timestamp");
    }

    events.sort_by_key(|e| e.timestamp);

    LoadedDataset {
        events,
        format,
        dropped,
        synthetic_time,
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsoc_core::EventKind;

    #[test]
    fn json_container_is_unwrapped() {
        let text = r#"{ "count": 2, "results": [
            { "_path": "conn", "ts": 20, "id.orig_h": "a", "id.resp_h": "b", "conn_state": "S0" },
            { "_path": "dns", "ts": 10, "id": { "orig_h": "a", "resp_h": "c" }, "query": "x.onion" }
        ] }"#;
        let ds = parse_events(text).unwrap();
        assert_eq!(ds.format, SourceFormat::JsonContainer);
        assert_eq!(ds.events.len(), 2);
        assert_eq!(ds.events[0].kind(), EventKind::Dns);
        assert_eq!(ds.events[0].dest_host, "c");
        assert!(ds.columns.contains("id.orig_h"));
    }

    #[test]
    fn ndjson_tolerates_brackets_and_garbage() {
        let text = "[\n{\"_path\":\"ssh\",\"ts\":1,\"auth_attempts\":9},\nnot json\n{\"_path\":\"ssh\",\"ts\":2}\n]\n";
        let ds = parse_events(text).unwrap();
        assert_eq!(ds.format, SourceFormat::JsonLines);
        assert_eq!(ds.events.len(), 2);
    }

    #[test]
    fn synthetic_sequence_when_no_record_has_time() {
        let text = "{\"_path\":\"conn\",\"uid\":\"a\"}\n{\"_path\":\"conn\",\"uid\":\"b\"}\n";
        let ds = parse_events(text).unwrap();
        assert!(ds.synthetic_time);
        assert_eq!(ds.events[0].timestamp.timestamp(), 0);
        assert_eq!(ds.events[1].timestamp.timestamp(), 1);
    }

    #[test]
    fn records_with_bad_or_missing_time_are_dropped_when_others_have_it() {
        let text = "{\"ts\":5}\n{\"ts\":\"garbage\"}\n{\"uid\":\"no-time\"}\n";
        let ds = parse_events(text).unwrap();
        assert!(!ds.synthetic_time);
        assert_eq!(ds.events.len(), 1);
        assert_eq!(ds.dropped, 2);
    }

    #[test]
    fn output_is_sorted_by_timestamp() {
        let text = "{\"ts\":30}\n{\"ts\":10}\n{\"ts\":20}\n";
        let ds = parse_events(text).unwrap();
        let secs: Vec<i64> = ds.events.iter().map(|e| e.timestamp.timestamp()).collect();
        assert_eq!(secs, vec![10, 20, 30]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_events(""), Err(IngestError::Empty(_))));
        assert!(matches!(parse_events("[]"), Err(IngestError::Empty(_))));
    }

    #[test]
    fn load_from_disk_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.log");
        std::fs::write(
            &path,
            "#separator \\x09\n#path\tconn\n#fields\tts\tid.orig_h\tid.resp_h\tconn_state\n#types\ttime\taddr\taddr\tstring\n1.5\ta\tb\tREJ\n",
        )
        .unwrap();
        let ds = load_events(&path).unwrap();
        assert_eq!(ds.format, SourceFormat::ZeekTsv);
        assert_eq!(ds.events[0].kind(), EventKind::Connection);

        let missing = dir.path().join("nope.json");
        assert!(matches!(load_events(&missing), Err(IngestError::NotFound(_))));
    }

    #[test]
    fn oversized_and_non_regular_files_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        std::fs::write(&path, "{\"ts\":1}\n{\"ts\":2}\n").unwrap();

        assert!(matches!(
            load_events_limited(&path, 8),
            Err(IngestError::TooLarge { limit: 8, .. })
        ));
        assert_eq!(load_events_limited(&path, 1024).unwrap().events.len(), 2);
        assert!(matches!(
            load_events(dir.path()),
            Err(IngestError::NotAFile(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn character_devices_are_not_read() {
        assert!(matches!(
            load_events(Path::new("/dev/zero")),
            Err(IngestError::NotAFile(_))
        ));
    }

    #[test]
    fn requested_paths_stay_inside_the_root() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("data");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("conn.json"), "{}").unwrap();
        std::fs::write(outer.path().join("secret.json"), "{}").unwrap();

        let inside = resolve_within(&root, Path::new("conn.json")).unwrap();
        assert!(inside.ends_with("data/conn.json"));

        assert!(matches!(
            resolve_within(&root, Path::new("../secret.json")),
            Err(IngestError::OutsideDataDir(_))
        ));
        let absolute = outer.path().join("secret.json");
        assert!(matches!(
            resolve_within(&root, &absolute),
            Err(IngestError::OutsideDataDir(_))
        ));
        assert!(matches!(
            resolve_within(&root, Path::new("missing.json")),
            Err(IngestError::NotFound(_))
        ));
    }
}

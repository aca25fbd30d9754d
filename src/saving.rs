use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::error::Result;
use crate::records::TaxonomyRow;

/// A taxonomy list captured from the catalog API, kept for offline browsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// RFC 3339 timestamp, UTC.
    pub saved_at: String,
    /// Base URL or file the rows came from.
    pub source: String,
    pub rows: Vec<TaxonomyRow>,
}

impl Snapshot {
    pub fn new(source: impl Into<String>, rows: Vec<TaxonomyRow>) -> Self {
        Snapshot {
            saved_at: chrono::Utc::now().to_rfc3339(),
            source: source.into(),
            rows,
        }
    }
}

pub fn save_snapshot(snapshot: &Snapshot, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    write_snapshot(snapshot, file)
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Snapshot> {
    let file = File::open(path)?;
    read_snapshot(file)
}

pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_snapshot(snapshot, &mut buffer)?;
    Ok(buffer)
}

pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot> {
    read_snapshot(Cursor::new(bytes))
}

fn write_snapshot<W: Write>(snapshot: &Snapshot, sink: W) -> Result<()> {
    let encoder = GzEncoder::new(sink, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, snapshot)?;

    // Flush explicitly so the gzip trailer errors surface here rather than on drop.
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?;
    Ok(())
}

fn read_snapshot<R: Read>(source: R) -> Result<Snapshot> {
    let decoder = GzDecoder::new(source);
    let mut reader = BufReader::new(decoder);

    Ok(deserialize_from(&mut reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;

    fn rows() -> Vec<TaxonomyRow> {
        vec![
            TaxonomyRow {
                id: 1,
                dept: "Footwear".to_string(),
                typ: "EMPTY".to_string(),
                subtyp1: "EMPTY".to_string(),
                subtyp2: String::new(),
                subtyp3: String::new(),
                url: "/footwear".to_string(),
                active: true,
            },
            TaxonomyRow {
                id: 2,
                dept: "Footwear".to_string(),
                typ: "Shoes".to_string(),
                subtyp1: "EMPTY".to_string(),
                subtyp2: "EMPTY".to_string(),
                subtyp3: "EMPTY".to_string(),
                url: "/shoes".to_string(),
                active: false,
            },
        ]
    }

    #[test]
    fn file_snapshot_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.bin.gz");

        let snapshot = Snapshot::new("http://catalog.local", rows());
        save_snapshot(&snapshot, &path).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert!(!loaded.rows[1].active);
    }

    #[test]
    fn in_memory_snapshot_is_gzip() {
        let bytes = snapshot_to_bytes(&Snapshot::new("test", rows())).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert_eq!(snapshot_from_bytes(&bytes).unwrap().rows.len(), 2);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(snapshot_from_bytes(b"not a snapshot").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(dir.path().join("absent.bin.gz")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}

//! SQLite persistence for the vector index.
//!
//! One `index.sqlite` file per index directory holds a key/value manifest
//! and the chunks with their embeddings as little-endian `f32` blobs. A new
//! index is written to a temporary file and renamed over the old one, so a
//! failed write never replaces a good index.

use crate::config::INDEX_FILE;
use crate::index::VectorIndex;
use crate::types::{Chunk, IndexEntry, IndexStats};
use chrono::{DateTime, Utc};
use ragchat_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Bumped whenever the schema changes.
pub const FORMAT_VERSION: u32 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE manifest (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE chunks (
        id INTEGER PRIMARY KEY,
        source_id TEXT NOT NULL,
        sequence_index INTEGER NOT NULL,
        text TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX idx_chunks_source ON chunks(source_id);
"#;

/// Manifest of a persisted index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexManifest {
    pub format_version: u32,
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

/// Path of the index database inside `dir`.
pub fn index_file(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

/// Whether a persisted index file exists in `dir`.
pub fn exists(dir: &Path) -> bool {
    index_file(dir).is_file()
}

fn build_err(e: impl std::fmt::Display) -> AppError {
    AppError::IndexBuild(format!("Failed to persist index: {}", e))
}

fn load_err(e: impl std::fmt::Display) -> AppError {
    AppError::IndexLoad(e.to_string())
}

/// Write `index` to `dir`, replacing any previous index atomically.
pub fn persist(index: &VectorIndex, dir: &Path) -> AppResult<PathBuf> {
    fs::create_dir_all(dir).map_err(build_err)?;

    let final_path = index_file(dir);
    let tmp_path = dir.join(format!("{}.tmp", INDEX_FILE));
    if tmp_path.exists() {
        fs::remove_file(&tmp_path).map_err(build_err)?;
    }

    if let Err(e) = write_database(index, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, &final_path).map_err(build_err)?;

    tracing::info!(
        "Persisted {} chunks to {:?}",
        index.len(),
        final_path
    );
    Ok(final_path)
}

fn write_database(index: &VectorIndex, path: &Path) -> AppResult<()> {
    let mut conn = Connection::open(path).map_err(build_err)?;
    conn.execute_batch(SCHEMA).map_err(build_err)?;

    let tx = conn.transaction().map_err(build_err)?;
    {
        let manifest = [
            ("format_version", FORMAT_VERSION.to_string()),
            ("provider", index.provider().to_string()),
            ("model", index.model().to_string()),
            ("dimensions", index.dimensions().to_string()),
            ("chunk_count", index.len().to_string()),
            ("built_at", Utc::now().to_rfc3339()),
        ];
        let mut stmt = tx
            .prepare("INSERT INTO manifest (key, value) VALUES (?1, ?2)")
            .map_err(build_err)?;
        for (key, value) in manifest {
            stmt.execute(params![key, value]).map_err(build_err)?;
        }

        let mut stmt = tx
            .prepare(
                "INSERT INTO chunks (id, source_id, sequence_index, text, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(build_err)?;
        for (id, entry) in index.entries().iter().enumerate() {
            let metadata = serde_json::to_string(&entry.chunk.metadata).map_err(build_err)?;
            stmt.execute(params![
                id as i64,
                entry.chunk.source(),
                entry.chunk.sequence_index as i64,
                entry.chunk.text,
                metadata,
                embedding_to_bytes(&entry.embedding),
            ])
            .map_err(build_err)?;
        }
    }
    tx.commit().map_err(build_err)?;
    Ok(())
}

fn open_read_only(path: &Path) -> AppResult<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| load_err(format!("Cannot open {:?}: {}", path, e)))
}

/// Read and validate the manifest.
pub fn read_manifest(conn: &Connection) -> AppResult<IndexManifest> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM manifest")
        .map_err(|e| load_err(format!("Index has no readable manifest: {}", e)))?;
    let pairs: HashMap<String, String> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .and_then(|rows| rows.collect())
        .map_err(load_err)?;

    let get = |key: &str| {
        pairs
            .get(key)
            .cloned()
            .ok_or_else(|| load_err(format!("Manifest is missing '{}'", key)))
    };
    let parse_num = |key: &str| -> AppResult<usize> {
        get(key)?
            .parse()
            .map_err(|_| load_err(format!("Manifest value '{}' is not a number", key)))
    };

    let format_version: u32 = get("format_version")?
        .parse()
        .map_err(|_| load_err("Manifest value 'format_version' is not a valid version"))?;
    if format_version != FORMAT_VERSION {
        return Err(load_err(format!(
            "Unsupported index format version {} (expected {})",
            format_version, FORMAT_VERSION
        )));
    }

    let built_at = DateTime::parse_from_rfc3339(&get("built_at")?)
        .map_err(|e| load_err(format!("Manifest has invalid built_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(IndexManifest {
        format_version,
        provider: get("provider")?,
        model: get("model")?,
        dimensions: parse_num("dimensions")?,
        chunk_count: parse_num("chunk_count")?,
        built_at,
    })
}

/// Load the index in `dir` for the given embedding model.
///
/// Returns `Ok(None)` when there is no index or it holds no chunks. A
/// corrupt index, or one built by a different provider, model or
/// dimensionality, is an `IndexLoad` error.
pub fn load(
    dir: &Path,
    provider: &str,
    model: &str,
    dimensions: usize,
) -> AppResult<Option<VectorIndex>> {
    let path = index_file(dir);
    if !path.is_file() {
        return Ok(None);
    }

    let conn = open_read_only(&path)?;
    let manifest = read_manifest(&conn)?;

    if manifest.provider != provider || manifest.model != model {
        return Err(load_err(format!(
            "Index was built with {}/{}, but the active embedding model is {}/{}. Rebuild the index.",
            manifest.provider, manifest.model, provider, model
        )));
    }
    if manifest.dimensions != dimensions {
        return Err(load_err(format!(
            "Index has {} dimensions, but the active embedding model has {}. Rebuild the index.",
            manifest.dimensions, dimensions
        )));
    }

    let mut stmt = conn
        .prepare("SELECT text, metadata, sequence_index, embedding FROM chunks ORDER BY id")
        .map_err(load_err)?;
    let rows: Vec<(String, String, i64, Vec<u8>)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .and_then(|rows| rows.collect())
        .map_err(load_err)?;

    if rows.is_empty() {
        tracing::info!("Index at {:?} is empty", path);
        return Ok(None);
    }
    if rows.len() != manifest.chunk_count {
        return Err(load_err(format!(
            "Manifest lists {} chunks but the index holds {}",
            manifest.chunk_count,
            rows.len()
        )));
    }

    let mut entries = Vec::with_capacity(rows.len());
    for (text, metadata_json, sequence_index, blob) in rows {
        let embedding = bytes_to_embedding(&blob, dimensions)?;
        let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
            .map_err(|e| load_err(format!("Malformed chunk metadata: {}", e)))?;
        entries.push(IndexEntry {
            embedding,
            chunk: Chunk {
                text,
                metadata,
                sequence_index: sequence_index as usize,
            },
        });
    }

    let index = VectorIndex::from_entries(provider, model, dimensions, entries)
        .map_err(load_err)?;
    tracing::info!("Loaded {} chunks from {:?}", index.len(), path);
    Ok(Some(index))
}

/// Summarize the persisted index in `dir`, if any.
pub fn read_stats(dir: &Path) -> AppResult<Option<IndexStats>> {
    let path = index_file(dir);
    if !path.is_file() {
        return Ok(None);
    }

    let conn = open_read_only(&path)?;
    let manifest = read_manifest(&conn)?;

    let source_count: Option<i64> = conn
        .query_row("SELECT COUNT(DISTINCT source_id) FROM chunks", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(load_err)?;

    let db_size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    Ok(Some(IndexStats {
        path,
        provider: manifest.provider,
        model: manifest.model,
        dimensions: manifest.dimensions,
        chunk_count: manifest.chunk_count,
        source_count: source_count.unwrap_or(0) as usize,
        built_at: Some(manifest.built_at),
        db_size_bytes,
    }))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to an embedding of exactly `dimensions` values.
fn bytes_to_embedding(bytes: &[u8], dimensions: usize) -> AppResult<Vec<f32>> {
    if bytes.len() != dimensions * 4 {
        return Err(load_err(format!(
            "Embedding blob has {} bytes, expected {}",
            bytes.len(),
            dimensions * 4
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{META_FILENAME, META_PAGES, META_SOURCE};
    use tempfile::TempDir;

    fn chunk(source: &str, text: &str, seq: usize) -> Chunk {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_SOURCE.to_string(), source.to_string());
        metadata.insert(META_PAGES.to_string(), "2".to_string());
        metadata.insert(META_FILENAME.to_string(), "doc.pdf".to_string());
        Chunk {
            text: text.to_string(),
            metadata,
            sequence_index: seq,
        }
    }

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new("fake", "fake-v1", 3);
        index.push(vec![1.0, 0.0, 0.0], chunk("data/doc.pdf", "alpha", 0)).unwrap();
        index.push(vec![0.0, 1.0, 0.0], chunk("data/doc.pdf", "beta", 1)).unwrap();
        index.push(vec![0.5, 0.5, 0.5], chunk("data/other.txt", "gamma", 0)).unwrap();
        index
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes, 3).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes, 4).is_err());
    }

    #[test]
    fn test_persist_then_load_is_identical() {
        let temp = TempDir::new().unwrap();
        let index = sample_index();

        let path = persist(&index, temp.path()).unwrap();
        assert_eq!(path, temp.path().join("index.sqlite"));
        assert!(!temp.path().join("index.sqlite.tmp").exists());

        let loaded = load(temp.path(), "fake", "fake-v1", 3).unwrap().unwrap();
        assert_eq!(loaded, index);

        let query = [0.9, 0.2, 0.1];
        assert_eq!(
            loaded.search(&query, 3).unwrap(),
            index.search(&query, 3).unwrap()
        );
    }

    #[test]
    fn test_missing_index_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(load(temp.path(), "fake", "fake-v1", 3).unwrap().is_none());
        assert!(read_stats(temp.path()).unwrap().is_none());
        assert!(!exists(temp.path()));
    }

    #[test]
    fn test_empty_index_counts_as_absent() {
        let temp = TempDir::new().unwrap();
        persist(&VectorIndex::new("fake", "fake-v1", 3), temp.path()).unwrap();
        assert!(exists(temp.path()));
        assert!(load(temp.path(), "fake", "fake-v1", 3).unwrap().is_none());
    }

    #[test]
    fn test_model_and_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        persist(&sample_index(), temp.path()).unwrap();

        let err = load(temp.path(), "fake", "other-model", 3).unwrap_err();
        assert!(matches!(err, AppError::IndexLoad(_)));

        let err = load(temp.path(), "fake", "fake-v1", 4).unwrap_err();
        assert!(matches!(err, AppError::IndexLoad(_)));
        assert!(err.to_string().contains("dimensions"));
    }

    #[test]
    fn test_corrupt_file_is_load_error() {
        let temp = TempDir::new().unwrap();
        fs::write(index_file(temp.path()), b"definitely not sqlite").unwrap();

        let err = load(temp.path(), "fake", "fake-v1", 3).unwrap_err();
        assert!(matches!(err, AppError::IndexLoad(_)));
    }

    #[test]
    fn test_out_of_range_format_version_is_load_error() {
        let temp = TempDir::new().unwrap();
        persist(&sample_index(), temp.path()).unwrap();

        // 2^32 + 1 would wrap to 1 if narrowed from a wider integer
        let conn = Connection::open(index_file(temp.path())).unwrap();
        conn.execute(
            "UPDATE manifest SET value = '4294967297' WHERE key = 'format_version'",
            [],
        )
        .unwrap();
        drop(conn);

        let err = load(temp.path(), "fake", "fake-v1", 3).unwrap_err();
        assert!(matches!(err, AppError::IndexLoad(_)));
        assert!(err.to_string().contains("format_version"));
    }

    #[test]
    fn test_persist_replaces_previous_index() {
        let temp = TempDir::new().unwrap();
        persist(&sample_index(), temp.path()).unwrap();

        let mut smaller = VectorIndex::new("fake", "fake-v1", 3);
        smaller.push(vec![0.0, 0.0, 1.0], chunk("data/new.txt", "delta", 0)).unwrap();
        persist(&smaller, temp.path()).unwrap();

        let loaded = load(temp.path(), "fake", "fake-v1", 3).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].chunk.text, "delta");
    }

    #[test]
    fn test_read_stats() {
        let temp = TempDir::new().unwrap();
        persist(&sample_index(), temp.path()).unwrap();

        let stats = read_stats(temp.path()).unwrap().unwrap();
        assert_eq!(stats.provider, "fake");
        assert_eq!(stats.model, "fake-v1");
        assert_eq!(stats.dimensions, 3);
        assert_eq!(stats.chunk_count, 3);
        assert_eq!(stats.source_count, 2);
        assert!(stats.built_at.is_some());
        assert!(stats.db_size_bytes > 0);
    }
}

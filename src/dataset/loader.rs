// Match CSV loading: text acquisition (HTTP or file), CSV parsing, and the
// cache-aware load pipeline.
//
// Parser warnings are logged and non-fatal; malformed rows are dropped and
// the remaining data is returned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::cache::{CacheError, RowCache};
use crate::dataset::normalize::{compute_meta, normalize_rows, NormalizeContext};
use crate::dataset::Dataset;

/// A raw CSV row: header name -> field value, untyped.
pub type RawRow = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} fetching {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

// ---------------------------------------------------------------------------
// Text sources
// ---------------------------------------------------------------------------

/// Seam for acquiring the raw CSV text, so the pipeline can be tested with
/// canned data and the same code path serves both HTTP and local files.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn fetch_text(&self) -> Result<String, LoadError>;

    /// Human-readable description for logs and the error banner.
    fn describe(&self) -> String;
}

/// Fetches the CSV over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TextSource for HttpSource {
    async fn fetch_text(&self) -> Result<String, LoadError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LoadError::Http {
                url: self.url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus {
                url: self.url.clone(),
                status,
            });
        }

        response.text().await.map_err(|e| LoadError::Http {
            url: self.url.clone(),
            source: e,
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the CSV from the local filesystem.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TextSource for FileSource {
    async fn fetch_text(&self) -> Result<String, LoadError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LoadError::Io {
                path: self.path.display().to_string(),
                source: e,
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Build the configured text source: URL wins over path (config validation
/// guarantees exactly one is set).
pub fn source_from_config(data: &crate::config::DataConfig) -> Box<dyn TextSource> {
    if let Some(url) = data.csv_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Box::new(HttpSource::new(url.trim()))
    } else {
        Box::new(FileSource::new(Path::new(
            data.csv_path.as_deref().unwrap_or_default().trim(),
        )))
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Parse CSV text into raw rows. The header row defines field names; rows
/// are keyed by name so exports can reorder or add columns freely.
///
/// Malformed records are skipped with a warning. Records that are entirely
/// empty (a common trailing artifact of spreadsheet exports) are dropped
/// silently.
pub fn parse_csv(text: &str) -> Result<Vec<RawRow>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        match result {
            Ok(record) => {
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                let row: RawRow = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect();
                rows.push(row);
            }
            Err(e) => {
                warn!("skipping malformed CSV record: {e}");
            }
        }
    }

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Load pipeline
// ---------------------------------------------------------------------------

/// Load the dataset: serve normalized rows from the cache when the schema
/// version matches, otherwise fetch, parse, normalize, and refresh the
/// cache. Metadata is always recomputed from the full row set.
///
/// Cache write failures are logged and swallowed; a broken cache must not
/// take down a successful load.
pub async fn load_dataset(
    source: &dyn TextSource,
    cache: Option<&RowCache>,
    ctx: &NormalizeContext,
) -> Result<Dataset, LoadError> {
    if let Some(cache) = cache {
        match cache.load() {
            Ok(Some(rows)) => {
                info!("loaded {} rows from cache", rows.len());
                let meta = compute_meta(&rows);
                return Ok(Dataset { rows, meta });
            }
            Ok(None) => {}
            Err(e) => warn!("cache read failed, falling back to fetch: {e}"),
        }
    }

    info!("fetching match CSV from {}", source.describe());
    let text = source.fetch_text().await?;
    let raw_rows = parse_csv(&text)?;
    info!("parsed {} raw rows", raw_rows.len());

    let (rows, meta) = normalize_rows(&raw_rows, ctx);

    if let Some(cache) = cache {
        if let Err(e) = cache.store_rows(&rows) {
            warn!("failed to store rows in cache: {e}");
        }
    }

    Ok(Dataset { rows, meta })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const CSV: &str = "\
PlayerName,HeroName,Map,Role,FileName,Winner,HeroKills
Indigente,Valla,Cursed Hollow,Ranged Assassin,2025-03-14 20.01.02 Cursed Hollow.StormReplay,TRUE,5
Arthelon,Uther,Cursed Hollow,Healer,2025-03-14 20.01.02 Cursed Hollow.StormReplay,FALSE,1";

    /// Canned source that counts how many times it was fetched.
    struct CountingSource {
        text: String,
        fetches: AtomicUsize,
    }

    impl CountingSource {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextSource for CountingSource {
        async fn fetch_text(&self) -> Result<String, LoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }

        fn describe(&self) -> String {
            "<canned>".to_string()
        }
    }

    // -- parse_csv --

    #[test]
    fn parse_csv_keys_fields_by_header() {
        let rows = parse_csv(CSV).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["PlayerName"], "Indigente");
        assert_eq!(rows[0]["HeroKills"], "5");
        assert_eq!(rows[1]["HeroName"], "Uther");
    }

    #[test]
    fn parse_csv_drops_empty_records() {
        let text = "A,B\n1,2\n,\n3,4\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn parse_csv_short_record_keeps_present_fields() {
        let text = "A,B,C\n1,2\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["A"], "1");
        assert_eq!(rows[0]["B"], "2");
        assert!(!rows[0].contains_key("C"));
    }

    #[test]
    fn parse_csv_header_only_is_empty() {
        let rows = parse_csv("A,B,C").unwrap();
        assert!(rows.is_empty());
    }

    // -- load_dataset --

    #[tokio::test]
    async fn load_without_cache_fetches_and_normalizes() {
        let source = CountingSource::new(CSV);
        let ctx = NormalizeContext::default();

        let dataset = load_dataset(&source, None, &ctx).await.unwrap();
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.meta.total_rows, 2);
        assert_eq!(dataset.meta.players, vec!["Arthelon", "Indigente"]);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn second_load_hits_cache() {
        let source = CountingSource::new(CSV);
        let ctx = NormalizeContext::default();
        let cache = RowCache::new(Arc::new(MemoryStore::new()), "1");

        let first = load_dataset(&source, Some(&cache), &ctx).await.unwrap();
        let second = load_dataset(&source, Some(&cache), &ctx).await.unwrap();

        assert_eq!(source.fetch_count(), 1, "second load must not re-fetch");
        assert_eq!(first.rows, second.rows);
        // Meta is recomputed from the cached rows, not cached itself
        assert_eq!(first.meta, second.meta);
    }

    #[tokio::test]
    async fn version_bump_forces_refetch() {
        let source = CountingSource::new(CSV);
        let ctx = NormalizeContext::default();
        let store = Arc::new(MemoryStore::new());

        let cache_v1 = RowCache::new(store.clone(), "1");
        load_dataset(&source, Some(&cache_v1), &ctx).await.unwrap();
        load_dataset(&source, Some(&cache_v1), &ctx).await.unwrap();
        assert_eq!(source.fetch_count(), 1);

        // Same store, new schema version: the stored cache is ignored and a
        // fresh fetch occurs.
        let cache_v2 = RowCache::new(store, "2");
        let dataset = load_dataset(&source, Some(&cache_v2), &ctx).await.unwrap();
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(dataset.rows.len(), 2);
    }
}

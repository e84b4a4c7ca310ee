// Dataset pipeline: CSV loading, row normalization, and optional side files.

pub mod loader;
pub mod normalize;
pub mod sidecar;

pub use loader::{load_dataset, parse_csv, FileSource, HttpSource, LoadError, RawRow, TextSource};
pub use normalize::{
    compute_meta, normalize_rows, DatasetMeta, MatchRow, NormalizeContext, Role,
};

/// Bump whenever the serialized shape of `MatchRow` changes. A stored cache
/// written under any other version is discarded unconditionally.
pub const CACHE_SCHEMA_VERSION: &str = "3";

/// A fully loaded dataset: normalized rows plus metadata derived from them.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub rows: Vec<MatchRow>,
    pub meta: DatasetMeta,
}

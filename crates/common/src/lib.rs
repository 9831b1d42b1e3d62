
pub mod pretty;

use serde::{Deserialize, Serialize};
use std::{io, path::PathBuf};
use thiserror::Error;
use types::Value;

/// Sentinel page id used before a page has been allocated.
pub const INVALID_PAGE_ID: i32 = -1;

/// Logical identifier for a page, assigned monotonically starting at 0.
///
/// Examples:
/// - `let root = PageId(0);`
/// - `let none = PageId::INVALID;`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub i32);

impl PageId {
    pub const INVALID: PageId = PageId(INVALID_PAGE_ID);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for PageId {
    fn default() -> Self {
        PageId::INVALID
    }
}

/// Fully-qualified identifier for a record within a heap file.
///
/// Examples:
/// - `let rid = RecordId { page_id: PageId(0), slot: 0 };`
/// - `let none = RecordId::none();`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: i32,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: i32) -> Self {
        Self { page_id, slot }
    }

    /// The RID meaning "no record", mirroring the default-constructed RID in
    /// the original implementation.
    pub fn none() -> Self {
        Self {
            page_id: PageId::INVALID,
            slot: -1,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.page_id.is_valid() && self.slot >= 0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId::none()
    }
}

/// Positional row representation backed by `types::Value`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
    #[serde(skip)]
    #[serde(default)]
    rid: Option<RecordId>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, rid: None }
    }

    pub fn with_rid(mut self, rid: RecordId) -> Self {
        self.rid = Some(rid);
        self
    }

    pub fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

/// Rectangular result set carrying column labels and rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Canonical error type shared across the storage core and the application layer.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("parse: {0}")]
    Parser(String),
    #[error("plan: {0}")]
    Planner(String),
    #[error("exec: {0}")]
    Executor(String),
    #[error("catalog: {0}")]
    Catalog(String),
    #[error("storage: {0}")]
    Storage(String),
    /// Fetch found every frame pinned and had nothing it could evict.
    /// This is the one core error that must always be surfaced, never absorbed.
    #[error("buffer pool exhausted: all frames pinned")]
    AllFramesPinned,
    /// Insert found the key already present in the tree.
    #[error("duplicate key: {0}")]
    DuplicateKey(i32),
    /// A record did not fit on the page chosen to hold it.
    #[error("no free space for record of {0} bytes")]
    NoFreeSpace(usize),
    /// Read/Delete addressed a slot beyond a page's record count.
    #[error("invalid slot {0} in page {1}")]
    InvalidSlot(i32, i32),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for the database components.
///
/// # Example
/// ```
/// use common::Config;
/// use std::path::PathBuf;
///
/// let config = Config::builder()
///     .data_dir(PathBuf::from("./my_db"))
///     .buffer_pool_pages(64)
///     .build();
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Directory where catalog metadata lives (the core itself holds no files).
    #[builder(default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Fixed page size in bytes; matches `storage::PAGE_SIZE`.
    #[builder(default = 4096)]
    pub page_size: usize,
    /// Default number of frames a freshly constructed buffer pool holds.
    #[builder(default = 32)]
    pub buffer_pool_pages: usize,
    /// Default B+Tree order for newly created indexes.
    #[builder(default = 100)]
    pub btree_order: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            page_size: 4096,
            buffer_pool_pages: 32,
            btree_order: 100,
        }
    }
}

/// Installs the process-wide `tracing` subscriber. Library crates never call
/// this themselves; only a binary entry point (the CLI, or a test harness
/// that wants captured output) should.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{Config, DbError, DbResult, PageId, RecordBatch, RecordId, Row};
    pub use types::{SqlType, Value};
}

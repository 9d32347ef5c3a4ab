//! # Polarway Fusion
//!
//! Handle-based session bridge over [DataFusion](https://datafusion.apache.org):
//! native engine objects live in a process-wide handle table, the host holds
//! typed proxies that destroy each object exactly once, and asynchronous
//! engine work is delivered through single-fire completions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 session façade                  │
//! │  SessionContext · DataFrame · SessionConfig     │
//! │  RecordBatchStream · CsvFormat · ListingTable   │
//! ├────────────────────────┬────────────────────────┤
//! │   Proxy (close once,   │  SyncSlot · Completer  │
//! │   children reversed,   │  Pending<T>            │
//! │   in-flight drain)     │  (exactly-once result) │
//! ├────────────────────────┴────────────────────────┤
//! │  native: Handle ──► DashMap<u64, NativeObject>  │
//! │  DataFusion SessionContext on a tokio Runtime   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polarway_fusion::SessionContext;
//!
//! #[tokio::main]
//! async fn main() -> polarway_fusion::Result<()> {
//!     let ctx = SessionContext::new()?;
//!     ctx.register_csv("test", "/data/test")?.await?;
//!
//!     let df = ctx.sql("SELECT y FROM test WHERE x = 3 ORDER BY y")?.await?;
//!     let batches = df.collect()?.await?;
//!     println!("{} batches", batches.len());
//!
//!     // closes the runtime first, after in-flight work has drained
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Exactly-once teardown**: `close()` is idempotent and thread-safe; the
//!   native destroy runs once even under concurrent closes
//! - **Ordered teardown**: children close before their parent, last registered first
//! - **Drain before destroy**: a runtime is stopped only after every operation
//!   dispatched on it has completed
//! - **Single-fire results**: every dispatched operation resolves once, with a
//!   value or with the native error message verbatim

pub mod channel;
pub mod config;
pub mod error;
pub mod handle;
pub mod native;
pub mod proxy;
pub(crate) mod runtime;
pub mod session;

// Re-exports for convenience
pub use channel::{Pending, SyncSlot};
pub use config::FusionConfig;
pub use error::{FusionError, Result};
pub use handle::Handle;
pub use native::{init, is_live, live_handles};
pub use proxy::{Closeable, NativeResource};
pub use session::config::{
    ExecutionOptions, OptimizerOptions, ParquetOptions, SessionConfig, SqlParserOptions,
};
pub use session::context::SessionContext;
pub use session::dataframe::DataFrame;
pub use session::format::{ArrowFormat, CsvFormat, FileFormat, ParquetFormat};
pub use session::listing::{
    ListingOptions, ListingOptionsBuilder, ListingTable, ListingTableConfig,
    ListingTableConfigBuilder, TableProvider,
};
pub use session::stream::RecordBatchStream;

/// Arrow re-exports for downstream use
pub mod arrow {
    pub use ::arrow::*;
}

//! Engine options, grouped into views over one native config handle
//!
//! ```rust,no_run
//! use polarway_fusion::{SessionConfig, SessionContext};
//!
//! # fn main() -> polarway_fusion::Result<()> {
//! let config = SessionConfig::new()?;
//! config
//!     .execution_options()
//!     .with_batch_size(1024)?
//!     .with_target_partitions(4)?;
//! config.parquet_options().with_pruning(false)?;
//! let context = SessionContext::with_config(&config)?;
//! # Ok(())
//! # }
//! ```

use crate::channel::{check_error, SyncSlot};
use crate::error::{FusionError, Result};
use crate::handle::Handle;
use crate::native;
use crate::native::session_config as options;
use crate::proxy::{native_resource, Proxy};

/// Proxy over native engine options
#[derive(Debug)]
pub struct SessionConfig {
    proxy: Proxy,
}

native_resource!(SessionConfig);

impl SessionConfig {
    /// Create a config holding the engine defaults
    pub fn new() -> Result<Self> {
        native::init();
        let mut slot = SyncSlot::new();
        options::create_session_config(&mut slot);
        let handle = slot.read()?;
        Ok(Self {
            proxy: Proxy::new("SessionConfig", handle, options::destroy_session_config),
        })
    }

    pub fn execution_options(&self) -> ExecutionOptions<'_> {
        ExecutionOptions { config: self }
    }

    pub fn optimizer_options(&self) -> OptimizerOptions<'_> {
        OptimizerOptions { config: self }
    }

    pub fn parquet_options(&self) -> ParquetOptions<'_> {
        ParquetOptions { config: self }
    }

    pub fn sql_parser_options(&self) -> SqlParserOptions<'_> {
        SqlParserOptions { config: self }
    }

    fn get<T>(&self, getter: impl FnOnce(Handle, &mut SyncSlot<T>)) -> Result<T> {
        let guard = self.proxy.enter()?;
        let mut slot = SyncSlot::new();
        getter(guard.handle(), &mut slot);
        slot.read_with(FusionError::Config)
    }

    fn set<T>(&self, setter: impl FnOnce(Handle, T) -> String, value: T) -> Result<()> {
        let guard = self.proxy.enter()?;
        check_error(setter(guard.handle(), value), FusionError::Config)
    }
}

macro_rules! option_view {
    (
        $(#[$meta:meta])*
        $view:ident {
            $( $(#[$field_meta:meta])* $name:ident, $with:ident: $ty:ty => $get:path, $set:path; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $view<'a> {
            config: &'a SessionConfig,
        }

        impl<'a> $view<'a> {
            $(
                $(#[$field_meta])*
                pub fn $name(&self) -> Result<$ty> {
                    self.config.get($get)
                }

                pub fn $with(&self, value: $ty) -> Result<&Self> {
                    self.config.set($set, value)?;
                    Ok(self)
                }
            )*
        }
    };
}

option_view! {
    /// Execution options
    ExecutionOptions {
        /// Rows per record batch; must be positive
        batch_size, with_batch_size: usize =>
            options::get_batch_size, options::set_batch_size;
        /// Partitions used for repartitioning and parallel scans; must be positive
        target_partitions, with_target_partitions: usize =>
            options::get_target_partitions, options::set_target_partitions;
        collect_statistics, with_collect_statistics: bool =>
            options::get_collect_statistics, options::set_collect_statistics;
    }
}

option_view! {
    /// Optimizer options
    OptimizerOptions {
        repartition_joins, with_repartition_joins: bool =>
            options::get_repartition_joins, options::set_repartition_joins;
        repartition_aggregations, with_repartition_aggregations: bool =>
            options::get_repartition_aggregations, options::set_repartition_aggregations;
        repartition_file_scans, with_repartition_file_scans: bool =>
            options::get_repartition_file_scans, options::set_repartition_file_scans;
    }
}

option_view! {
    /// Parquet reader options
    ParquetOptions {
        enable_page_index, with_enable_page_index: bool =>
            options::get_parquet_enable_page_index, options::set_parquet_enable_page_index;
        pruning, with_pruning: bool =>
            options::get_parquet_pruning, options::set_parquet_pruning;
        skip_metadata, with_skip_metadata: bool =>
            options::get_parquet_skip_metadata, options::set_parquet_skip_metadata;
        /// Bytes to read from the end of a file when fetching its footer; `None` = engine default
        metadata_size_hint, with_metadata_size_hint: Option<usize> =>
            options::get_parquet_metadata_size_hint, options::set_parquet_metadata_size_hint;
        pushdown_filters, with_pushdown_filters: bool =>
            options::get_parquet_pushdown_filters, options::set_parquet_pushdown_filters;
        reorder_filters, with_reorder_filters: bool =>
            options::get_parquet_reorder_filters, options::set_parquet_reorder_filters;
    }
}

option_view! {
    /// SQL parser options
    SqlParserOptions {
        parse_float_as_decimal, with_parse_float_as_decimal: bool =>
            options::get_sql_parser_parse_float_as_decimal,
            options::set_sql_parser_parse_float_as_decimal;
        enable_ident_normalization, with_enable_ident_normalization: bool =>
            options::get_sql_parser_enable_ident_normalization,
            options::set_sql_parser_enable_ident_normalization;
        /// Dialect name, e.g. `generic`, `postgresql`, `mysql`
        dialect, with_dialect: String =>
            options::get_sql_parser_dialect, options::set_sql_parser_dialect;
    }
}

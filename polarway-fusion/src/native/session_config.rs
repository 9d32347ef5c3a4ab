//! Native engine options: one get/set pair per option

use datafusion::prelude::SessionConfig;

use super::{library, NativeObject};
use crate::channel::SyncSlot;
use crate::handle::Handle;

const KIND: &str = "SessionConfig";

pub(crate) fn create_session_config(slot: &mut SyncSlot<Handle>) {
    slot.set_ok(library().insert(NativeObject::Config(SessionConfig::new())));
}

pub(crate) fn destroy_session_config(handle: Handle) -> Option<String> {
    super::destroy(handle, KIND)
}

fn read<T>(handle: Handle, slot: &mut SyncSlot<T>, pick: impl FnOnce(&SessionConfig) -> T) {
    let outcome = library().get(handle, KIND, |object| match object {
        NativeObject::Config(cfg) => Some(pick(cfg)),
        _ => None,
    });
    match outcome {
        Ok(value) => slot.set_ok(value),
        Err(msg) => slot.set_error(msg),
    }
}

fn write(handle: Handle, apply: impl FnOnce(&mut SessionConfig)) -> String {
    let outcome = library().update(handle, KIND, |object| match object {
        NativeObject::Config(cfg) => {
            apply(cfg);
            Some(())
        }
        _ => None,
    });
    outcome.err().unwrap_or_default()
}

fn positive(name: &str, value: usize) -> Result<(), String> {
    if value == 0 {
        Err(format!("{name} must be greater than zero"))
    } else {
        Ok(())
    }
}

/// Generate `get_<name>` / `set_<name>` for one field of `ConfigOptions`
macro_rules! config_option {
    ($get:ident, $set:ident, $ty:ty, $($field:ident).+) => {
        config_option!($get, $set, $ty, $($field).+, |_value: &$ty| Ok(()));
    };
    ($get:ident, $set:ident, $ty:ty, $($field:ident).+, $check:expr) => {
        pub(crate) fn $get(handle: Handle, slot: &mut SyncSlot<$ty>) {
            read(handle, slot, |cfg| cfg.options().$($field).+.clone());
        }

        pub(crate) fn $set(handle: Handle, value: $ty) -> String {
            let check: fn(&$ty) -> Result<(), String> = $check;
            if let Err(msg) = check(&value) {
                return msg;
            }
            write(handle, |cfg| cfg.options_mut().$($field).+ = value)
        }
    };
}

// execution
config_option!(
    get_batch_size,
    set_batch_size,
    usize,
    execution.batch_size,
    |v: &usize| positive("batch_size", *v)
);
config_option!(
    get_target_partitions,
    set_target_partitions,
    usize,
    execution.target_partitions,
    |v: &usize| positive("target_partitions", *v)
);
config_option!(
    get_collect_statistics,
    set_collect_statistics,
    bool,
    execution.collect_statistics
);

// optimizer
config_option!(
    get_repartition_joins,
    set_repartition_joins,
    bool,
    optimizer.repartition_joins
);
config_option!(
    get_repartition_aggregations,
    set_repartition_aggregations,
    bool,
    optimizer.repartition_aggregations
);
config_option!(
    get_repartition_file_scans,
    set_repartition_file_scans,
    bool,
    optimizer.repartition_file_scans
);

// parquet
config_option!(
    get_parquet_enable_page_index,
    set_parquet_enable_page_index,
    bool,
    execution.parquet.enable_page_index
);
config_option!(
    get_parquet_pruning,
    set_parquet_pruning,
    bool,
    execution.parquet.pruning
);
config_option!(
    get_parquet_skip_metadata,
    set_parquet_skip_metadata,
    bool,
    execution.parquet.skip_metadata
);
config_option!(
    get_parquet_metadata_size_hint,
    set_parquet_metadata_size_hint,
    Option<usize>,
    execution.parquet.metadata_size_hint
);
config_option!(
    get_parquet_pushdown_filters,
    set_parquet_pushdown_filters,
    bool,
    execution.parquet.pushdown_filters
);
config_option!(
    get_parquet_reorder_filters,
    set_parquet_reorder_filters,
    bool,
    execution.parquet.reorder_filters
);

// sql parser
config_option!(
    get_sql_parser_parse_float_as_decimal,
    set_sql_parser_parse_float_as_decimal,
    bool,
    sql_parser.parse_float_as_decimal
);
config_option!(
    get_sql_parser_enable_ident_normalization,
    set_sql_parser_enable_ident_normalization,
    bool,
    sql_parser.enable_ident_normalization
);
config_option!(
    get_sql_parser_dialect,
    set_sql_parser_dialect,
    String,
    sql_parser.dialect
);

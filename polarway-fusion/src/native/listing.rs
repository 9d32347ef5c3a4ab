//! Native listing options, listing table configs and listing tables

use std::sync::Arc;

use datafusion::datasource::listing::{
    ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl,
};
use datafusion::datasource::TableProvider;

use super::{error_string, library, spawn_on, NativeObject};
use crate::channel::{Completer, SyncSlot};
use crate::handle::Handle;

// ─── Listing Options ───

/// Build listing options over `format`. The format handle stays with the caller.
pub(crate) fn create_listing_options(
    format: Handle,
    file_extension: &str,
    collect_stat: bool,
    slot: &mut SyncSlot<Handle>,
) {
    let format = library().get(format, "FileFormat", |object| match object {
        NativeObject::Format(format) => Some(Arc::clone(format)),
        _ => None,
    });
    match format {
        Ok(format) => {
            let options = ListingOptions::new(format)
                .with_file_extension(file_extension)
                .with_collect_stat(collect_stat);
            slot.set_ok(library().insert(NativeObject::ListingOptions(options)));
        }
        Err(msg) => slot.set_error(msg),
    }
}

pub(crate) fn destroy_listing_options(handle: Handle) -> Option<String> {
    super::destroy(handle, "ListingOptions")
}

// ─── Listing Table Config ───

/// Resolve `paths` and infer the table schema; the value is a new config handle.
///
/// Without options the file format is inferred from the first file found.
pub(crate) fn build_listing_table_config(
    runtime: Handle,
    context: Handle,
    paths: Vec<String>,
    options: Option<Handle>,
    completer: Completer<Handle>,
) {
    let lib = library();
    let work = prepare_config(context, &paths, options).map(|(ctx, config)| async move {
        let state = ctx.state();
        let config = if config.options.is_some() {
            config.infer_schema(&state).await
        } else {
            config.infer(&state).await
        }
        .map_err(error_string)?;

        match &config.file_schema {
            Some(schema) if !schema.fields().is_empty() => {}
            _ => {
                return Err(format!(
                    "no data files found to infer a schema from under {}",
                    paths.join(", ")
                ))
            }
        }
        Ok(lib.insert(NativeObject::TableConfig(config)))
    });
    spawn_on(runtime, completer, work);
}

fn prepare_config(
    context: Handle,
    paths: &[String],
    options: Option<Handle>,
) -> Result<(datafusion::prelude::SessionContext, ListingTableConfig), String> {
    let lib = library();
    if paths.is_empty() {
        return Err("a listing table needs at least one path".to_string());
    }
    let ctx = lib.context(context)?;
    let urls = paths
        .iter()
        .map(|path| ListingTableUrl::parse(path).map_err(error_string))
        .collect::<Result<Vec<_>, _>>()?;

    let config = ListingTableConfig::new_with_multi_paths(urls);
    let config = match options {
        Some(handle) => {
            let options = lib.get(handle, "ListingOptions", |object| match object {
                NativeObject::ListingOptions(options) => Some(options.clone()),
                _ => None,
            })?;
            config.with_listing_options(options)
        }
        None => config,
    };
    Ok((ctx, config))
}

pub(crate) fn destroy_listing_table_config(handle: Handle) -> Option<String> {
    super::destroy(handle, "ListingTableConfig")
}

// ─── Listing Table ───

/// Create a table provider from a built config. The config handle stays with
/// the caller and remains usable.
pub(crate) fn create_listing_table(config: Handle, slot: &mut SyncSlot<Handle>) {
    let lib = library();
    let config = lib.get(config, "ListingTableConfig", |object| match object {
        NativeObject::TableConfig(config) => Some(ListingTableConfig {
            table_paths: config.table_paths.clone(),
            file_schema: config.file_schema.clone(),
            options: config.options.clone(),
        }),
        _ => None,
    });

    let table = config.and_then(|config| ListingTable::try_new(config).map_err(error_string));
    match table {
        Ok(table) => {
            let provider: Arc<dyn TableProvider> = Arc::new(table);
            slot.set_ok(lib.insert(NativeObject::TableProvider(provider)));
        }
        Err(msg) => slot.set_error(msg),
    }
}

pub(crate) fn destroy_table_provider(handle: Handle) -> Option<String> {
    super::destroy(handle, "TableProvider")
}

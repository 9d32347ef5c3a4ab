//! Native session context: creation, SQL and table registration

use std::path::Path;

use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionConfig, SessionContext};

use super::{error_string, library, spawn_on, NativeObject};
use crate::channel::{Completer, SyncSlot};
use crate::handle::Handle;

const KIND: &str = "SessionContext";

/// Create a context, copying the engine options behind `config` when given
pub(crate) fn create_session_context(config: Option<Handle>, slot: &mut SyncSlot<Handle>) {
    let config = match config {
        Some(handle) => library().get(handle, "SessionConfig", |object| match object {
            NativeObject::Config(cfg) => Some(cfg.clone()),
            _ => None,
        }),
        None => Ok(SessionConfig::new()),
    };

    match config {
        Ok(config) => {
            let context = SessionContext::new_with_config(config);
            slot.set_ok(library().insert(NativeObject::Context(context)));
        }
        Err(msg) => slot.set_error(msg),
    }
}

pub(crate) fn destroy_session_context(handle: Handle) -> Option<String> {
    super::destroy(handle, KIND)
}

/// Plan `sql`; the value is a new DataFrame handle
pub(crate) fn query_sql(
    runtime: Handle,
    context: Handle,
    sql: String,
    completer: Completer<Handle>,
) {
    let work = library().context(context).map(|ctx| async move {
        let df = ctx.sql(&sql).await.map_err(error_string)?;
        Ok::<_, String>(library().insert(NativeObject::DataFrame(df)))
    });
    spawn_on(runtime, completer, work);
}

pub(crate) fn register_csv(
    runtime: Handle,
    context: Handle,
    name: String,
    path: String,
    completer: Completer<()>,
) {
    let work = library().context(context).map(|ctx| async move {
        require_exists(&path)?;
        ctx.register_csv(name.as_str(), path.as_str(), CsvReadOptions::new())
            .await
            .map_err(error_string)
    });
    spawn_on(runtime, completer, work);
}

pub(crate) fn register_parquet(
    runtime: Handle,
    context: Handle,
    name: String,
    path: String,
    completer: Completer<()>,
) {
    let work = library().context(context).map(|ctx| async move {
        require_exists(&path)?;
        ctx.register_parquet(name.as_str(), path.as_str(), ParquetReadOptions::default())
            .await
            .map_err(error_string)
    });
    spawn_on(runtime, completer, work);
}

/// Register `provider` under `name`. The provider handle stays owned by the
/// caller; the context keeps its own reference to the table.
///
/// Returns an empty string on success.
pub(crate) fn register_table(context: Handle, name: &str, provider: Handle) -> String {
    let lib = library();
    let outcome = lib.context(context).and_then(|ctx| {
        let table = lib.get(provider, "TableProvider", |object| match object {
            NativeObject::TableProvider(table) => Some(table.clone()),
            _ => None,
        })?;
        ctx.register_table(name, table)
            .map(|_previous| ())
            .map_err(error_string)
    });
    outcome.err().unwrap_or_default()
}

fn require_exists(path: &str) -> Result<(), String> {
    if Path::new(path).exists() {
        Ok(())
    } else {
        Err(format!("Object at location {path} not found: no such file or directory"))
    }
}

//! DataFrame façade

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;

use super::context::SessionContext;
use super::stream::RecordBatchStream;
use super::{absolute_path, start};
use crate::channel::Pending;
use crate::error::{FusionError, Result};
use crate::handle::Handle;
use crate::native;
use crate::proxy::{native_resource, NativeResource, Proxy};
use crate::runtime::RuntimeHandle;

/// A logical plan produced by [`SessionContext::sql`].
///
/// Operations run on the runtime of the context that produced the frame.
#[derive(Debug)]
pub struct DataFrame {
    proxy: Proxy,
    runtime: Arc<RuntimeHandle>,
}

native_resource!(DataFrame);

impl DataFrame {
    pub(crate) fn from_handle(handle: Handle, runtime: Arc<RuntimeHandle>) -> Self {
        Self {
            proxy: Proxy::new("DataFrame", handle, native::dataframe::destroy_dataframe),
            runtime,
        }
    }

    /// Execute the plan and collect every batch
    pub fn collect(&self) -> Result<Pending<Vec<RecordBatch>>> {
        start(
            &self.runtime,
            &[&self.proxy],
            "collect",
            FusionError::Query,
            decode_ipc,
            |rt, targets, completer| native::dataframe::collect(rt, targets[0], completer),
        )
    }

    /// Start executing the plan and pull its batches incrementally.
    ///
    /// The stream is independent of this frame: closing either leaves the
    /// other usable.
    pub fn execute_stream(&self) -> Result<Pending<RecordBatchStream>> {
        let runtime = Arc::clone(&self.runtime);
        start(
            &self.runtime,
            &[&self.proxy],
            "execute_stream",
            FusionError::Query,
            move |handle: Handle| RecordBatchStream::from_handle(handle, runtime),
            |rt, targets, completer| native::dataframe::execute_stream(rt, targets[0], completer),
        )
    }

    /// Execute the plan and print the result to stdout
    pub fn show(&self) -> Result<Pending<()>> {
        start(
            &self.runtime,
            &[&self.proxy],
            "show",
            FusionError::Query,
            Ok,
            |rt, targets, completer| native::dataframe::show(rt, targets[0], completer),
        )
    }

    /// Execute the plan and write the result as Parquet under `path`
    pub fn write_parquet(&self, path: impl AsRef<Path>) -> Result<Pending<()>> {
        let path = absolute_path(path.as_ref())?;
        start(
            &self.runtime,
            &[&self.proxy],
            "write_parquet",
            FusionError::Query,
            Ok,
            |rt, targets, completer| {
                native::dataframe::write_parquet(rt, targets[0], path, completer)
            },
        )
    }

    /// Execute the plan and write the result as CSV under `path`
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<Pending<()>> {
        let path = absolute_path(path.as_ref())?;
        start(
            &self.runtime,
            &[&self.proxy],
            "write_csv",
            FusionError::Query,
            Ok,
            |rt, targets, completer| native::dataframe::write_csv(rt, targets[0], path, completer),
        )
    }

    /// Register this frame as view `name` on `context`
    pub fn register_table(&self, context: &SessionContext, name: &str) -> Result<Pending<()>> {
        let name = name.to_string();
        start(
            context.runtime(),
            &[&self.proxy, context.proxy()],
            "register_view",
            FusionError::Registration,
            Ok,
            |rt, targets, completer| {
                native::dataframe::register_view(rt, targets[0], targets[1], name, completer)
            },
        )
    }
}

fn decode_ipc(bytes: Vec<u8>) -> Result<Vec<RecordBatch>> {
    let reader = FileReader::try_new(Cursor::new(bytes), None)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(batches)
}

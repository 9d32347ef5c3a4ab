//! Incremental execution of a [`DataFrame`](super::dataframe::DataFrame)

use std::io::Cursor;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;

use super::start;
use crate::channel::{Pending, SyncSlot};
use crate::error::{FusionError, Result};
use crate::handle::Handle;
use crate::native;
use crate::proxy::{native_resource, Proxy};
use crate::runtime::RuntimeHandle;

/// An executing plan whose batches are pulled one at a time.
///
/// Produced by [`DataFrame::execute_stream`](super::dataframe::DataFrame::execute_stream)
/// and owned by the caller. Pulls run on the runtime of the originating
/// context; once that context is closed, [`next`](Self::next) fails with a
/// usage error while the stream itself can still be closed.
#[derive(Debug)]
pub struct RecordBatchStream {
    proxy: Proxy,
    runtime: Arc<RuntimeHandle>,
    schema: SchemaRef,
}

native_resource!(RecordBatchStream);

impl RecordBatchStream {
    pub(crate) fn from_handle(handle: Handle, runtime: Arc<RuntimeHandle>) -> Result<Self> {
        let proxy = Proxy::new("RecordBatchStream", handle, native::stream::destroy_stream);
        let mut slot = SyncSlot::new();
        native::stream::stream_schema(handle, &mut slot);
        let bytes = slot.read_with(FusionError::Query)?;
        let schema = FileReader::try_new(Cursor::new(bytes), None)?.schema();
        Ok(Self {
            proxy,
            runtime,
            schema,
        })
    }

    /// Schema of every batch the stream yields
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Pull the next batch. Resolves to `None` once the stream is exhausted.
    pub fn next(&self) -> Result<Pending<Option<RecordBatch>>> {
        start(
            &self.runtime,
            &[&self.proxy],
            "next_batch",
            FusionError::Query,
            decode_batch,
            |rt, targets, completer| native::stream::next_batch(rt, targets[0], completer),
        )
    }
}

fn decode_batch(bytes: Option<Vec<u8>>) -> Result<Option<RecordBatch>> {
    let Some(bytes) = bytes else {
        return Ok(None);
    };
    let mut reader = FileReader::try_new(Cursor::new(bytes), None)?;
    reader.next().transpose().map_err(FusionError::from)
}

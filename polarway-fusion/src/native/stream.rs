//! Native record batch streams produced by executing a dataframe

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use datafusion::physical_plan::{RecordBatchStream, SendableRecordBatchStream};
use futures::StreamExt;

use super::dataframe::encode_ipc;
use super::{error_string, library, spawn_on, NativeObject};
use crate::channel::{Completer, SyncSlot};
use crate::handle::Handle;

const KIND: &str = "RecordBatchStream";

/// An executing plan. Batches are pulled one at a time; the schema is
/// captured up front so it can be read while a pull is in flight.
pub(crate) struct NativeStream {
    schema: SchemaRef,
    batches: Arc<tokio::sync::Mutex<SendableRecordBatchStream>>,
}

impl NativeStream {
    pub(crate) fn new(stream: SendableRecordBatchStream) -> Self {
        Self {
            schema: stream.schema(),
            batches: Arc::new(tokio::sync::Mutex::new(stream)),
        }
    }
}

pub(crate) fn destroy_stream(handle: Handle) -> Option<String> {
    super::destroy(handle, KIND)
}

/// The stream's schema as an Arrow IPC file with no batches
pub(crate) fn stream_schema(stream: Handle, slot: &mut SyncSlot<Vec<u8>>) {
    let schema = library().get(stream, KIND, |object| match object {
        NativeObject::Stream(stream) => Some(Arc::clone(&stream.schema)),
        _ => None,
    });
    match schema.and_then(|schema| encode_ipc(&schema, &[]).map_err(error_string)) {
        Ok(bytes) => slot.set_ok(bytes),
        Err(msg) => slot.set_error(msg),
    }
}

/// Pull the next batch as a one-batch IPC file; `None` once the stream is exhausted
pub(crate) fn next_batch(
    runtime: Handle,
    stream: Handle,
    completer: Completer<Option<Vec<u8>>>,
) {
    let batches = library().get(stream, KIND, |object| match object {
        NativeObject::Stream(stream) => Some(Arc::clone(&stream.batches)),
        _ => None,
    });
    let work = batches.map(|batches| async move {
        let next = batches.lock().await.next().await;
        let batch = match next {
            Some(batch) => batch.map_err(error_string)?,
            None => return Ok(None),
        };
        let bytes = encode_ipc(&batch.schema(), &[batch]).map_err(error_string)?;
        Ok::<_, String>(Some(bytes))
    });
    spawn_on(runtime, completer, work);
}

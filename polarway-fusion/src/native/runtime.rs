//! Native async executor

use tracing::info;

use super::{library, NativeObject};
use crate::channel::SyncSlot;
use crate::handle::Handle;

const KIND: &str = "Runtime";

pub(crate) fn create_runtime(
    worker_threads: Option<usize>,
    thread_name: &str,
    slot: &mut SyncSlot<Handle>,
) {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name(thread_name);
    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }

    match builder.build() {
        Ok(runtime) => {
            let handle = library().insert(NativeObject::Runtime(runtime));
            info!(handle = %handle, ?worker_threads, thread_name, "Native runtime started");
            slot.set_ok(handle);
        }
        Err(err) => slot.set_error(format!("failed to start runtime: {err}")),
    }
}

pub(crate) fn destroy_runtime(handle: Handle) -> Option<String> {
    match library().remove(handle, KIND) {
        Ok(NativeObject::Runtime(runtime)) => {
            // never blocks, so a runtime may be released from inside async code
            runtime.shutdown_background();
            info!(handle = %handle, "Native runtime stopped");
            None
        }
        Ok(other) => Some(format!("native handle {handle} held a {}", other.kind())),
        Err(msg) => Some(msg),
    }
}

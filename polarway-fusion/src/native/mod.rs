//! The native side of the handle boundary
//!
//! Everything in this module speaks the boundary convention only: objects are
//! named by [`Handle`], synchronous results go through a [`SyncSlot`],
//! asynchronous results through a [`Completer`], and failures are plain
//! strings. The host façade in [`crate::session`] never touches DataFusion
//! types directly.
//!
//! ```text
//!   host façade ──Handle──► LIBRARY (DashMap<u64, NativeObject>)
//!        ▲                        │
//!        │                        ▼
//!   Pending<T> ◄──Completer── tokio runtime task (DataFusion)
//! ```

pub(crate) mod context;
pub(crate) mod dataframe;
pub(crate) mod format;
pub(crate) mod listing;
pub(crate) mod runtime;
pub(crate) mod session_config;
pub(crate) mod stream;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use datafusion::datasource::TableProvider;
use datafusion::datasource::file_format::FileFormat;
use datafusion::datasource::listing::{ListingOptions, ListingTableConfig};
use datafusion::prelude::{DataFrame, SessionConfig, SessionContext};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::channel::Completer;
use crate::handle::Handle;

/// One object owned by the native library
pub(crate) enum NativeObject {
    Runtime(tokio::runtime::Runtime),
    Context(SessionContext),
    DataFrame(DataFrame),
    Config(SessionConfig),
    Format(Arc<dyn FileFormat>),
    ListingOptions(ListingOptions),
    TableConfig(ListingTableConfig),
    TableProvider(Arc<dyn TableProvider>),
    Stream(stream::NativeStream),
}

impl NativeObject {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            NativeObject::Runtime(_) => "Runtime",
            NativeObject::Context(_) => "SessionContext",
            NativeObject::DataFrame(_) => "DataFrame",
            NativeObject::Config(_) => "SessionConfig",
            NativeObject::Format(_) => "FileFormat",
            NativeObject::ListingOptions(_) => "ListingOptions",
            NativeObject::TableConfig(_) => "ListingTableConfig",
            NativeObject::TableProvider(_) => "TableProvider",
            NativeObject::Stream(_) => "RecordBatchStream",
        }
    }
}

/// Process-wide table of live native objects
pub(crate) struct Library {
    objects: DashMap<u64, NativeObject>,
    next_id: AtomicU64,
}

static LIBRARY: OnceCell<Library> = OnceCell::new();

pub(crate) fn library() -> &'static Library {
    LIBRARY.get_or_init(|| {
        info!("Native library initialized");
        Library {
            objects: DashMap::new(),
            // handles start at 1 and are never reused
            next_id: AtomicU64::new(1),
        }
    })
}

/// Initialize the native library. Idempotent and safe to call from any thread;
/// every entry point calls it implicitly.
pub fn init() {
    library();
}

/// Number of native objects currently alive
pub fn live_handles() -> usize {
    library().objects.len()
}

/// True while `handle` names a live native object
pub fn is_live(handle: Handle) -> bool {
    library().objects.contains_key(&handle.as_raw())
}

impl Library {
    pub(crate) fn insert(&self, object: NativeObject) -> Handle {
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(kind = object.kind(), handle = raw, "Native object created");
        self.objects.insert(raw, object);
        Handle::from_raw(raw)
    }

    /// Clone something out of the object behind `handle`.
    ///
    /// The map guard is released before this returns, so callers may insert
    /// afterwards.
    pub(crate) fn get<T>(
        &self,
        handle: Handle,
        expected: &'static str,
        pick: impl FnOnce(&NativeObject) -> Option<T>,
    ) -> Result<T, String> {
        let entry = self
            .objects
            .get(&handle.as_raw())
            .ok_or_else(|| unknown_handle(handle))?;
        pick(entry.value()).ok_or_else(|| wrong_kind(handle, expected, entry.value().kind()))
    }

    /// Mutate the object behind `handle` in place
    pub(crate) fn update<T>(
        &self,
        handle: Handle,
        expected: &'static str,
        apply: impl FnOnce(&mut NativeObject) -> Option<T>,
    ) -> Result<T, String> {
        let mut entry = self
            .objects
            .get_mut(&handle.as_raw())
            .ok_or_else(|| unknown_handle(handle))?;
        let actual = entry.value().kind();
        apply(entry.value_mut()).ok_or_else(|| wrong_kind(handle, expected, actual))
    }

    /// Remove the object behind `handle` if it has the expected kind
    pub(crate) fn remove(
        &self,
        handle: Handle,
        expected: &'static str,
    ) -> Result<NativeObject, String> {
        match self
            .objects
            .remove_if(&handle.as_raw(), |_, object| object.kind() == expected)
        {
            Some((_, object)) => {
                debug!(kind = expected, handle = %handle, "Native object destroyed");
                Ok(object)
            }
            None => match self.objects.get(&handle.as_raw()) {
                Some(entry) => Err(wrong_kind(handle, expected, entry.value().kind())),
                None => Err(unknown_handle(handle)),
            },
        }
    }

    pub(crate) fn runtime(&self, handle: Handle) -> Result<tokio::runtime::Handle, String> {
        self.get(handle, "Runtime", |object| match object {
            NativeObject::Runtime(rt) => Some(rt.handle().clone()),
            _ => None,
        })
    }

    pub(crate) fn context(&self, handle: Handle) -> Result<SessionContext, String> {
        self.get(handle, "SessionContext", |object| match object {
            NativeObject::Context(ctx) => Some(ctx.clone()),
            _ => None,
        })
    }

    pub(crate) fn dataframe(&self, handle: Handle) -> Result<DataFrame, String> {
        self.get(handle, "DataFrame", |object| match object {
            NativeObject::DataFrame(df) => Some(df.clone()),
            _ => None,
        })
    }
}

fn unknown_handle(handle: Handle) -> String {
    format!("unknown native handle {handle}")
}

fn wrong_kind(handle: Handle, expected: &str, actual: &str) -> String {
    format!("native handle {handle} is a {actual}, not a {expected}")
}

/// Destroy entry shared by every resource kind: `None` on success
pub(crate) fn destroy(handle: Handle, kind: &'static str) -> Option<String> {
    library().remove(handle, kind).err()
}

/// Fire `completer` with a native outcome
pub(crate) fn deliver<V>(completer: &Completer<V>, outcome: Result<V, String>) {
    let (error, value) = match outcome {
        Ok(value) => (None, Some(value)),
        Err(msg) => (Some(msg), None),
    };
    // a second completion is already logged by the completer
    let _ = completer.complete(error, value);
}

/// Run `work` on the runtime behind `runtime` and fire `completer` with its
/// outcome. Lookup failures fire the completer immediately on the calling thread.
pub(crate) fn spawn_on<V, F>(runtime: Handle, completer: Completer<V>, work: Result<F, String>)
where
    V: Send + 'static,
    F: Future<Output = Result<V, String>> + Send + 'static,
{
    let ready = library()
        .runtime(runtime)
        .and_then(|rt| work.map(|work| (rt, work)));
    match ready {
        Ok((rt, work)) => {
            debug!(operation = completer.operation(), runtime = %runtime, "Dispatching");
            rt.spawn(async move {
                let outcome = work.await;
                deliver(&completer, outcome);
            });
        }
        Err(msg) => deliver(&completer, Err(msg)),
    }
}

/// Render a DataFusion or Arrow error as a boundary message
pub(crate) fn error_string(err: impl std::fmt::Display) -> String {
    err.to_string()
}

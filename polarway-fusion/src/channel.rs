//! Result channels across the native boundary
//!
//! Two primitives carry a value-or-error from a native call back to the host:
//!
//! - [`SyncSlot`]: a single-assignment cell the native side fills before a
//!   blocking call returns. No synchronization, there is never a second writer.
//! - [`completion`]: a single-fire [`Completer`] handed to the native runtime,
//!   paired with a [`Pending`] future the caller awaits. The completer may fire
//!   from any thread, before or after the dispatching call returns.
//!
//! Both speak the native error convention: an absent or empty error string
//! means success, anything else is the error message. [`normalize_error`]
//! turns that sentinel into `Option<String>` right at the boundary.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::error::{FusionError, Result};
use crate::proxy::OperationGuard;

/// Translate the native error sentinel: `None` or `""` is success.
pub fn normalize_error(message: Option<String>) -> Option<String> {
    message.filter(|msg| !msg.is_empty())
}

/// Translate a native error string into a typed error
pub(crate) fn check_error(message: String, reject: fn(String) -> FusionError) -> Result<()> {
    match normalize_error(Some(message)) {
        Some(msg) => Err(reject(msg)),
        None => Ok(()),
    }
}

// ─── Synchronous Slot ───

/// Single-assignment result cell written during a blocking native call
#[derive(Debug)]
pub struct SyncSlot<T> {
    outcome: Option<std::result::Result<T, String>>,
}

impl<T> Default for SyncSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncSlot<T> {
    pub fn new() -> Self {
        Self { outcome: None }
    }

    /// Record a successful result
    pub fn set_ok(&mut self, value: T) {
        self.assign(Ok(value));
    }

    /// Record a failure message
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.assign(Err(message.into()));
    }

    fn assign(&mut self, outcome: std::result::Result<T, String>) {
        if self.outcome.is_some() {
            // first write wins
            error!("Sync slot written twice; keeping the first result");
            return;
        }
        self.outcome = Some(outcome);
    }

    /// Read the slot, mapping a native failure to `CreationError`
    pub fn read(self) -> Result<T> {
        self.read_with(FusionError::Creation)
    }

    /// Read the slot, mapping a native failure with `reject`
    pub fn read_with(self, reject: fn(String) -> FusionError) -> Result<T> {
        match self.outcome {
            Some(Ok(value)) => Ok(value),
            Some(Err(msg)) => match normalize_error(Some(msg)) {
                Some(msg) => Err(reject(msg)),
                None => Err(reject("native call failed without a message".into())),
            },
            None => Err(FusionError::Internal(
                "native call returned without writing its result".into(),
            )),
        }
    }
}

// ─── Asynchronous Completion ───

type Leftover = Option<Box<dyn Send>>;
type Resolve<V> = Box<dyn FnOnce(Option<String>, Option<V>) -> Leftover + Send>;

/// Single-fire completion handed to the native runtime.
///
/// Firing it a second time is a native defect: the call is rejected with
/// [`FusionError::DoubleCompletion`], logged, and the already-delivered
/// result is left untouched. Dropping it without firing rejects the paired
/// [`Pending`].
pub struct Completer<V> {
    operation: &'static str,
    resolve: Mutex<Option<Resolve<V>>>,
    guards: Mutex<Vec<OperationGuard>>,
}

impl<V> Completer<V> {
    /// Deliver the outcome using the native convention: a non-empty `error`
    /// wins, otherwise `value` must be present.
    pub fn complete(&self, error: Option<String>, value: Option<V>) -> Result<()> {
        let resolve = self.resolve.lock().take();
        let Some(resolve) = resolve else {
            error!(
                operation = self.operation,
                "Completion invoked more than once"
            );
            return Err(FusionError::DoubleCompletion(self.operation.to_string()));
        };

        let leftover = resolve(error, value);
        // an unobserved result is torn down before the operation counts as finished
        drop(leftover);
        self.guards.lock().clear();
        Ok(())
    }

    /// Keep `guard` alive until this completion fires or is dropped
    pub(crate) fn hold(&self, guard: OperationGuard) {
        self.guards.lock().push(guard);
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Host-visible future of one dispatched operation. Resolves exactly once.
#[must_use = "a pending result does nothing unless awaited; dropping it abandons the result"]
pub struct Pending<T> {
    operation: &'static str,
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Pending<T> {
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl<V> fmt::Debug for Completer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("operation", &self.operation)
            .field("fired", &self.resolve.lock().is_none())
            .finish()
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.rx.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(FusionError::Internal(format!(
                "{} completion was dropped without a result",
                this.operation
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Create a completer/future pair for one asynchronous native call.
///
/// `reject` types a native error message; `accept` converts the raw native
/// value into the host value (for example wrapping a handle in a proxy). When
/// the caller has already dropped the [`Pending`], the converted value is
/// dropped on the completing thread so any proxy it holds is released.
pub fn completion<V, T, F>(
    operation: &'static str,
    reject: fn(String) -> FusionError,
    accept: F,
) -> (Completer<V>, Pending<T>)
where
    V: Send + 'static,
    T: Send + 'static,
    F: FnOnce(V) -> Result<T> + Send + 'static,
{
    let (tx, rx) = oneshot::channel::<Result<T>>();

    let resolve: Resolve<V> = Box::new(move |error, value| {
        let outcome = match (normalize_error(error), value) {
            (Some(msg), _) => Err(reject(msg)),
            (None, Some(value)) => accept(value),
            (None, None) => Err(FusionError::Internal(format!(
                "{operation} completed without an error or a value"
            ))),
        };

        match tx.send(outcome) {
            Ok(()) => None,
            Err(unobserved) => {
                debug!(operation, "Result abandoned by caller");
                Some(Box::new(unobserved) as Box<dyn Send>)
            }
        }
    });

    let completer = Completer {
        operation,
        resolve: Mutex::new(Some(resolve)),
        guards: Mutex::new(Vec::new()),
    };
    (completer, Pending { operation, rx })
}

//! Host-side proxies owning native handles
//!
//! A [`Proxy`] owns exactly one [`Handle`] plus an ordered list of dependent
//! resources. Teardown is a one-way state machine:
//!
//! ```text
//!   Open ──close()──► Closing ──children (reverse) ──► drain in-flight ──► destroy ──► Closed
//! ```
//!
//! The `Open → Closing` step is a single compare-and-set, so concurrent
//! `close()` calls run the native destroy exactly once and no lock is held
//! across it. Callers that lose the race wait until the winner reaches
//! `Closed`, so `close()` never returns while teardown is still running.
//! Once closing has begun the proxy refuses new children and new operations;
//! operations already in flight are waited for before destroy.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::channel::normalize_error;
use crate::error::{FusionError, Result};
use crate::handle::Handle;

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// A resource that can be torn down. `close` is idempotent and thread-safe.
pub trait Closeable: Send + Sync {
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Short label used in logs and teardown errors, e.g. `SessionContext#4`
    fn describe(&self) -> String;
}

/// A host object backed by a native handle
pub trait NativeResource: Closeable {
    fn proxy(&self) -> &Proxy;

    /// The native handle, or a usage error once closing has begun
    fn handle(&self) -> Result<Handle> {
        self.proxy().handle()
    }
}

/// Native destroy call for one resource kind; returns the native error string
pub type Destroy = Box<dyn Fn(Handle) -> Option<String> + Send + Sync>;

// ─── In-flight Operations ───

#[derive(Default)]
struct Gate {
    pending: usize,
    accepting: bool,
}

/// Counts operations that reference a handle and lets `close` wait for them
struct InFlight {
    gate: Mutex<Gate>,
    drained: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            gate: Mutex::new(Gate {
                pending: 0,
                accepting: true,
            }),
            drained: Condvar::new(),
        }
    }

    fn stop_accepting(&self) {
        self.gate.lock().accepting = false;
    }

    /// Block until every guard has been dropped; returns how many were waited on
    fn wait_drained(&self) -> usize {
        let mut gate = self.gate.lock();
        let outstanding = gate.pending;
        while gate.pending > 0 {
            self.drained.wait(&mut gate);
        }
        outstanding
    }
}

/// Marks one operation as in flight against a handle. Dropping it completes
/// the operation from the proxy's point of view.
pub struct OperationGuard {
    in_flight: Arc<InFlight>,
    handle: Handle,
}

impl OperationGuard {
    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl fmt::Debug for OperationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationGuard")
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let mut gate = self.in_flight.gate.lock();
        gate.pending -= 1;
        if gate.pending == 0 {
            self.in_flight.drained.notify_all();
        }
    }
}

// ─── Proxy ───

/// Host-side owner of one native handle and its dependents
pub struct Proxy {
    kind: &'static str,
    handle: Handle,
    state: AtomicU8,
    children: Mutex<Vec<Arc<dyn Closeable>>>,
    in_flight: Arc<InFlight>,
    settled: Mutex<bool>,
    settled_cv: Condvar,
    destroy: Destroy,
}

impl Proxy {
    /// Wrap a freshly created handle. `destroy` runs at most once.
    pub fn new<D>(kind: &'static str, handle: Handle, destroy: D) -> Self
    where
        D: Fn(Handle) -> Option<String> + Send + Sync + 'static,
    {
        debug!(kind, handle = %handle, "Proxy created");
        Self {
            kind,
            handle,
            state: AtomicU8::new(OPEN),
            children: Mutex::new(Vec::new()),
            in_flight: Arc::new(InFlight::new()),
            settled: Mutex::new(false),
            settled_cv: Condvar::new(),
            destroy: Box::new(destroy),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The handle, as long as the proxy is open
    pub fn handle(&self) -> Result<Handle> {
        if self.state.load(Ordering::Acquire) != OPEN {
            return Err(self.closed_error());
        }
        Ok(self.handle)
    }

    /// Register an operation that references this handle.
    ///
    /// Fails once closing has begun; otherwise `close` will not destroy the
    /// handle until the returned guard is dropped.
    pub fn enter(&self) -> Result<OperationGuard> {
        let mut gate = self.in_flight.gate.lock();
        if !gate.accepting {
            return Err(self.closed_error());
        }
        gate.pending += 1;
        Ok(OperationGuard {
            in_flight: Arc::clone(&self.in_flight),
            handle: self.handle,
        })
    }

    /// Number of operations currently in flight against this handle
    pub fn pending_operations(&self) -> usize {
        self.in_flight.gate.lock().pending
    }

    /// Append a dependent that is closed before this proxy's own destroy
    pub fn register_child(&self, child: Arc<dyn Closeable>) -> Result<()> {
        let mut children = self.children.lock();
        if self.state.load(Ordering::Acquire) != OPEN {
            return Err(FusionError::Usage(format!(
                "cannot register {} on {}: already closing",
                child.describe(),
                self.describe()
            )));
        }
        children.push(child);
        Ok(())
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    fn closed_error(&self) -> FusionError {
        FusionError::Usage(format!("{} is closed", self.describe()))
    }

    /// Block until the caller that won the close race has finished teardown
    fn wait_settled(&self) {
        let mut settled = self.settled.lock();
        while !*settled {
            self.settled_cv.wait(&mut settled);
        }
    }

    fn settle(&self) {
        self.state.store(CLOSED, Ordering::Release);
        *self.settled.lock() = true;
        self.settled_cv.notify_all();
    }
}

impl Closeable for Proxy {
    fn close(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // the winner reports teardown failures; losers only wait for it
            self.wait_settled();
            return Ok(());
        }
        self.in_flight.stop_accepting();

        let children = std::mem::take(&mut *self.children.lock());
        let mut failures = Vec::new();
        for child in children.iter().rev() {
            if let Err(err) = child.close() {
                failures.push(format!("{}: {}", child.describe(), err.message()));
            }
        }
        drop(children);

        let waited = self.in_flight.wait_drained();
        if let Some(msg) = normalize_error((self.destroy)(self.handle)) {
            failures.push(msg);
        }
        self.settle();

        debug!(
            kind = self.kind,
            handle = %self.handle,
            drained = waited,
            failures = failures.len(),
            "Proxy closed"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FusionError::Teardown {
                resource: self.describe(),
                failures,
            })
        }
    }

    fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    fn describe(&self) -> String {
        format!("{}{}", self.kind, self.handle)
    }
}

impl NativeResource for Proxy {
    fn proxy(&self) -> &Proxy {
        self
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .field("state", &self.state.load(Ordering::Acquire))
            .finish()
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(resource = %self.describe(), error = %err, "Teardown failed during drop");
        }
    }
}

/// Implement [`Closeable`] and [`NativeResource`] for a façade with a `proxy` field
macro_rules! native_resource {
    ($ty:ty) => {
        impl $crate::proxy::Closeable for $ty {
            fn close(&self) -> $crate::error::Result<()> {
                $crate::proxy::Closeable::close(&self.proxy)
            }

            fn is_closed(&self) -> bool {
                $crate::proxy::Closeable::is_closed(&self.proxy)
            }

            fn describe(&self) -> String {
                $crate::proxy::Closeable::describe(&self.proxy)
            }
        }

        impl $crate::proxy::NativeResource for $ty {
            fn proxy(&self) -> &$crate::proxy::Proxy {
                &self.proxy
            }
        }
    };
}

pub(crate) use native_resource;

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    fn counting_proxy(id: u64, destroys: &Arc<AtomicUsize>) -> Proxy {
        let destroys = Arc::clone(destroys);
        Proxy::new("Test", Handle::from_raw(id), move |_| {
            destroys.fetch_add(1, Ordering::SeqCst);
            None
        })
    }

    fn recording_proxy(id: u64, log: &Arc<Mutex<Vec<u64>>>) -> Arc<Proxy> {
        let log = Arc::clone(log);
        Arc::new(Proxy::new("Test", Handle::from_raw(id), move |h| {
            log.lock().push(h.as_raw());
            None
        }))
    }

    #[test]
    fn test_close_many_times_destroys_once() {
        let destroys = Arc::new(AtomicUsize::new(0));
        let proxy = counting_proxy(1, &destroys);
        for _ in 0..5 {
            proxy.close().unwrap();
        }
        assert!(proxy.is_closed());
        drop(proxy);
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_close_destroys_once() {
        let destroys = Arc::new(AtomicUsize::new(0));
        let proxy = Arc::new(counting_proxy(1, &destroys));
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let proxy = Arc::clone(&proxy);
                std::thread::spawn(move || proxy.close())
            })
            .collect();
        for t in threads {
            t.join().unwrap().unwrap();
        }
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_children_closed_in_reverse_before_parent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let parent = recording_proxy(100, &log);
        for id in 1..=4 {
            parent.register_child(recording_proxy(id, &log)).unwrap();
        }
        parent.close().unwrap();
        assert_eq!(*log.lock(), vec![4, 3, 2, 1, 100]);
    }

    #[test]
    fn test_child_closed_early_is_not_destroyed_twice() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let parent = recording_proxy(10, &log);
        let child = recording_proxy(11, &log);
        parent.register_child(child.clone()).unwrap();

        child.close().unwrap();
        parent.close().unwrap();
        child.close().unwrap();
        assert_eq!(*log.lock(), vec![11, 10]);
    }

    #[test]
    fn test_register_after_close_is_usage_error() {
        let destroys = Arc::new(AtomicUsize::new(0));
        let parent = counting_proxy(1, &destroys);
        parent.close().unwrap();
        let child = Arc::new(counting_proxy(2, &destroys));
        let err = parent.register_child(child.clone()).unwrap_err();
        assert!(err.is_usage());
        assert!(!child.is_closed());
    }

    #[test]
    fn test_handle_and_enter_fail_after_close() {
        let destroys = Arc::new(AtomicUsize::new(0));
        let proxy = counting_proxy(9, &destroys);
        assert_eq!(proxy.handle().unwrap(), Handle::from_raw(9));
        proxy.close().unwrap();
        assert!(proxy.handle().unwrap_err().is_usage());
        assert!(proxy.enter().unwrap_err().is_usage());
    }

    #[test]
    fn test_failed_destroy_is_reported_and_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let proxy = Proxy::new("Test", Handle::from_raw(5), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("native destroy exploded".to_string())
        });

        match proxy.close() {
            Err(FusionError::Teardown { resource, failures }) => {
                assert_eq!(resource, "Test#5");
                assert_eq!(failures, vec!["native destroy exploded".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(proxy.is_closed());
        proxy.close().unwrap();
        drop(proxy);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_child_failure_does_not_stop_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let parent = recording_proxy(1, &log);
        parent.register_child(recording_proxy(2, &log)).unwrap();
        let failing = Arc::new(Proxy::new("Broken", Handle::from_raw(3), |_| {
            Some("cannot free".to_string())
        }));
        parent.register_child(failing).unwrap();
        parent.register_child(recording_proxy(4, &log)).unwrap();

        let err = parent.close().unwrap_err();
        assert_eq!(*log.lock(), vec![4, 2, 1]);
        match err {
            FusionError::Teardown { failures, .. } => {
                assert_eq!(failures, vec!["Broken#3: cannot free".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(parent.is_closed());
    }

    #[test]
    fn test_empty_destroy_message_is_success() {
        let proxy = Proxy::new("Test", Handle::from_raw(6), |_| Some(String::new()));
        proxy.close().unwrap();
    }

    #[test]
    fn test_close_waits_for_in_flight_operations() {
        let destroys = Arc::new(AtomicUsize::new(0));
        let proxy = Arc::new(counting_proxy(7, &destroys));
        let guards: Vec<_> = (0..3).map(|_| proxy.enter().unwrap()).collect();
        assert_eq!(proxy.pending_operations(), 3);

        let closer = {
            let proxy = Arc::clone(&proxy);
            std::thread::spawn(move || proxy.close())
        };

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(destroys.load(Ordering::SeqCst), 0);
        assert!(!proxy.is_closed());
        assert!(proxy.enter().unwrap_err().is_usage());

        let mut guards = guards;
        while let Some(guard) = guards.pop() {
            std::thread::sleep(Duration::from_millis(10));
            assert_eq!(destroys.load(Ordering::SeqCst), 0);
            drop(guard);
        }

        closer.join().unwrap().unwrap();
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
        assert!(proxy.is_closed());
    }

    #[test]
    fn test_parent_close_waits_for_child_close_in_progress() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let child = {
            let order = Arc::clone(&order);
            Arc::new(Proxy::new("Child", Handle::from_raw(31), move |_| {
                order.lock().push("child destroy start");
                std::thread::sleep(Duration::from_millis(200));
                order.lock().push("child destroy end");
                None
            }))
        };
        let parent = {
            let order = Arc::clone(&order);
            Proxy::new("Parent", Handle::from_raw(30), move |_| {
                order.lock().push("parent destroy");
                None
            })
        };
        parent.register_child(child.clone()).unwrap();

        let child_closer = {
            let child = Arc::clone(&child);
            std::thread::spawn(move || child.close())
        };
        std::thread::sleep(Duration::from_millis(50));
        parent.close().unwrap();

        assert!(child.is_closed());
        assert_eq!(
            *order.lock(),
            vec!["child destroy start", "child destroy end", "parent destroy"]
        );
        child_closer.join().unwrap().unwrap();
    }

    #[test]
    fn test_losing_closer_returns_only_after_destroy() {
        let destroys = Arc::new(AtomicUsize::new(0));
        let proxy = {
            let destroys = Arc::clone(&destroys);
            Arc::new(Proxy::new("Slow", Handle::from_raw(32), move |_| {
                std::thread::sleep(Duration::from_millis(100));
                destroys.fetch_add(1, Ordering::SeqCst);
                None
            }))
        };
        let winner = {
            let proxy = Arc::clone(&proxy);
            std::thread::spawn(move || proxy.close())
        };
        std::thread::sleep(Duration::from_millis(20));

        proxy.close().unwrap();
        assert!(proxy.is_closed());
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
        winner.join().unwrap().unwrap();
    }

    #[test]
    fn test_drop_closes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let parent = recording_proxy(20, &log);
            parent.register_child(recording_proxy(21, &log)).unwrap();
        }
        assert_eq!(*log.lock(), vec![21, 20]);
    }
}

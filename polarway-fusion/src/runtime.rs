//! The native executor shared by a session and everything dispatched on it

use std::sync::Arc;

use tracing::debug;

use crate::channel::{Completer, SyncSlot};
use crate::config::FusionConfig;
use crate::error::Result;
use crate::handle::Handle;
use crate::native;
use crate::proxy::{native_resource, OperationGuard, Proxy};

/// Proxy over a native tokio runtime.
///
/// Never handed to callers; operations reach it through [`RuntimeHandle::begin`],
/// which records them as in flight until their completion fires.
#[derive(Debug)]
pub(crate) struct RuntimeHandle {
    proxy: Proxy,
}

native_resource!(RuntimeHandle);

impl RuntimeHandle {
    pub(crate) fn create(config: &FusionConfig) -> Result<Arc<Self>> {
        native::init();
        let mut slot = SyncSlot::new();
        native::runtime::create_runtime(config.worker_threads, &config.thread_name, &mut slot);
        let handle = slot.read()?;
        Ok(Arc::new(Self {
            proxy: Proxy::new("Runtime", handle, native::runtime::destroy_runtime),
        }))
    }

    /// Start one operation on this runtime against `targets`.
    ///
    /// Fails with a usage error if the runtime or any target has begun closing.
    /// On success neither the runtime nor the targets are destroyed until the
    /// returned [`Dispatch`] (or the completer it is bound to) is released.
    pub(crate) fn begin(&self, targets: &[&Proxy]) -> Result<Dispatch> {
        let mut guards = Vec::with_capacity(targets.len() + 1);
        guards.push(self.proxy.enter()?);
        for target in targets {
            guards.push(target.enter()?);
        }
        Ok(Dispatch { guards })
    }

    pub(crate) fn pending_operations(&self) -> usize {
        self.proxy.pending_operations()
    }
}

/// Handles for one in-flight operation, pinned open by their guards
#[derive(Debug)]
pub(crate) struct Dispatch {
    // guards[0] is the runtime, then the targets in order
    guards: Vec<OperationGuard>,
}

impl Dispatch {
    pub(crate) fn runtime(&self) -> Handle {
        self.guards[0].handle()
    }

    pub(crate) fn target(&self, index: usize) -> Handle {
        self.guards[index + 1].handle()
    }

    /// Hand the guards to `completer`; they are released when it fires
    pub(crate) fn bind<V>(self, completer: &Completer<V>) {
        debug!(
            operation = completer.operation(),
            runtime = %self.runtime(),
            "Operation in flight"
        );
        for guard in self.guards {
            completer.hold(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::channel::completion;
    use crate::error::FusionError;
    use crate::proxy::{Closeable, NativeResource};

    fn test_runtime() -> Arc<RuntimeHandle> {
        RuntimeHandle::create(&FusionConfig::new().with_worker_threads(1)).unwrap()
    }

    #[test]
    fn test_create_and_close() {
        let rt = test_runtime();
        let handle = rt.handle().unwrap();
        assert!(native::is_live(handle));
        rt.close().unwrap();
        assert!(!native::is_live(handle));
        assert!(rt.handle().unwrap_err().is_usage());
    }

    #[test]
    fn test_begin_after_close_is_usage_error() {
        let rt = test_runtime();
        rt.close().unwrap();
        assert!(rt.begin(&[]).unwrap_err().is_usage());
    }

    #[test]
    fn test_begin_fails_on_closed_target_and_releases_runtime() {
        let rt = test_runtime();
        let target = Proxy::new("Target", Handle::from_raw(u64::MAX - 1), |_| None);
        target.close().unwrap();
        assert!(rt.begin(&[&target]).unwrap_err().is_usage());
        assert_eq!(rt.pending_operations(), 0);
    }

    #[test]
    fn test_close_waits_for_outstanding_operations() {
        let rt = test_runtime();
        let handle = rt.handle().unwrap();
        let dispatches: Vec<_> = (0..3).map(|_| rt.begin(&[]).unwrap()).collect();
        assert_eq!(rt.pending_operations(), 3);

        let closer = {
            let rt = Arc::clone(&rt);
            std::thread::spawn(move || rt.close())
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(native::is_live(handle));
        assert!(rt.begin(&[]).unwrap_err().is_usage());

        drop(dispatches);
        closer.join().unwrap().unwrap();
        assert!(!native::is_live(handle));
    }

    #[tokio::test]
    async fn test_bound_guards_release_on_completion() {
        let rt = test_runtime();
        let target_destroys = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&target_destroys);
        let target = Proxy::new("Target", Handle::from_raw(u64::MAX - 2), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        let (completer, pending) = completion("test", FusionError::Query, |v: u8| Ok(v));
        let dispatch = rt.begin(&[&target]).unwrap();
        assert_eq!(dispatch.target(0), Handle::from_raw(u64::MAX - 2));
        dispatch.bind(&completer);
        assert_eq!(rt.pending_operations(), 1);
        assert_eq!(target.pending_operations(), 1);

        completer.complete(None, Some(9)).unwrap();
        assert_eq!(pending.await.unwrap(), 9);
        assert_eq!(rt.pending_operations(), 0);
        target.close().unwrap();
        assert_eq!(target_destroys.load(Ordering::SeqCst), 1);
        rt.close().unwrap();
    }
}

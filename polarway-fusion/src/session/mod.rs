//! Typed session façade over the native handles
//!
//! Every type here owns one [`Proxy`] and forwards to [`crate::native`].
//! Synchronous factories read a [`SyncSlot`](crate::channel::SyncSlot);
//! everything that touches the engine's planner or files runs on the
//! session's runtime and returns a [`Pending`].

pub mod config;
pub mod context;
pub mod dataframe;
pub mod format;
pub mod listing;
pub mod stream;

use std::path::Path;

use crate::channel::{completion, Completer, Pending};
use crate::error::{FusionError, Result};
use crate::handle::Handle;
use crate::proxy::Proxy;
use crate::runtime::RuntimeHandle;

/// Dispatch one asynchronous native call.
///
/// The runtime and every target stay open until the completion fires. `call`
/// receives the runtime handle, the target handles in order and the completer.
pub(crate) fn start<V, T, A, C>(
    runtime: &RuntimeHandle,
    targets: &[&Proxy],
    operation: &'static str,
    reject: fn(String) -> FusionError,
    accept: A,
    call: C,
) -> Result<Pending<T>>
where
    V: Send + 'static,
    T: Send + 'static,
    A: FnOnce(V) -> Result<T> + Send + 'static,
    C: FnOnce(Handle, &[Handle], Completer<V>),
{
    let dispatch = runtime.begin(targets)?;
    let runtime_handle = dispatch.runtime();
    let target_handles: Vec<Handle> = (0..targets.len()).map(|i| dispatch.target(i)).collect();

    let (completer, pending) = completion(operation, reject, accept);
    dispatch.bind(&completer);
    call(runtime_handle, &target_handles, completer);
    Ok(pending)
}

/// Absolute UTF-8 form of `path`, as the native side expects it
pub(crate) fn absolute_path(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    absolute.into_os_string().into_string().map_err(|raw| {
        FusionError::Usage(format!(
            "path is not valid UTF-8: {}",
            raw.to_string_lossy()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_keeps_absolute_input() {
        let dir = std::env::temp_dir();
        let expected = dir.to_str().unwrap().trim_end_matches('/').to_string();
        assert_eq!(absolute_path(&dir).unwrap().trim_end_matches('/'), expected);
    }

    #[test]
    fn test_absolute_path_resolves_relative_input() {
        let resolved = absolute_path(Path::new("data/0.csv")).unwrap();
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("data/0.csv"));
    }
}

//! Session context: the root of a session's resource tree

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::config::SessionConfig;
use super::dataframe::DataFrame;
use super::listing::TableProvider;
use super::{absolute_path, start};
use crate::channel::{check_error, Pending, SyncSlot};
use crate::config::FusionConfig;
use crate::error::{FusionError, Result};
use crate::handle::Handle;
use crate::native;
use crate::proxy::{native_resource, Closeable, NativeResource, Proxy};
use crate::runtime::RuntimeHandle;

/// A query session backed by a native DataFusion context and its own runtime.
///
/// The runtime is registered as the context's child, so closing the context
/// first drains every operation dispatched through it and stops the runtime,
/// then destroys the native context. DataFrames produced by [`sql`](Self::sql)
/// are owned by the caller; once the context is closed they reject further
/// operations with a usage error.
#[derive(Debug)]
pub struct SessionContext {
    proxy: Proxy,
    runtime: Arc<RuntimeHandle>,
}

native_resource!(SessionContext);

impl SessionContext {
    /// Create a context with default engine options and a runtime configured
    /// from the environment
    pub fn new() -> Result<Self> {
        Self::with_options(&FusionConfig::from_env())
    }

    /// Create a context whose runtime follows `options`
    pub fn with_options(options: &FusionConfig) -> Result<Self> {
        Self::create(None, options)
    }

    /// Create a context from a copy of `config`. The caller keeps ownership of
    /// `config`; later changes to it do not affect this context.
    pub fn with_config(config: &SessionConfig) -> Result<Self> {
        let guard = config.proxy().enter()?;
        Self::create(Some(guard.handle()), &FusionConfig::from_env())
    }

    /// Build a temporary [`SessionConfig`], let `configure` adjust it, and
    /// create a context from it. The temporary config is closed afterwards.
    pub fn with_configuration<F>(configure: F) -> Result<Self>
    where
        F: FnOnce(&SessionConfig) -> Result<()>,
    {
        let config = SessionConfig::new()?;
        configure(&config)?;
        let context = Self::with_config(&config)?;
        config.close()?;
        Ok(context)
    }

    fn create(config: Option<Handle>, options: &FusionConfig) -> Result<Self> {
        native::init();
        let mut slot = SyncSlot::new();
        native::context::create_session_context(config, &mut slot);
        let handle = slot.read()?;
        let proxy = Proxy::new(
            "SessionContext",
            handle,
            native::context::destroy_session_context,
        );

        let runtime = RuntimeHandle::create(options)?;
        proxy.register_child(runtime.clone())?;

        info!(
            context = %handle,
            runtime = %runtime.describe(),
            thread_name = %options.thread_name,
            "Session context created"
        );
        Ok(Self { proxy, runtime })
    }

    /// Plan `query`. Resolves to a new [`DataFrame`] owned by the caller.
    pub fn sql(&self, query: &str) -> Result<Pending<DataFrame>> {
        let sql = query.to_string();
        let runtime = Arc::clone(&self.runtime);
        start(
            &self.runtime,
            &[&self.proxy],
            "sql",
            FusionError::Query,
            move |handle: Handle| Ok(DataFrame::from_handle(handle, runtime)),
            |rt, targets, completer| native::context::query_sql(rt, targets[0], sql, completer),
        )
    }

    /// Register the CSV file or directory at `path` as table `name`.
    ///
    /// On failure nothing is registered under `name`.
    pub fn register_csv(&self, name: &str, path: impl AsRef<Path>) -> Result<Pending<()>> {
        let name = name.to_string();
        let path = absolute_path(path.as_ref())?;
        start(
            &self.runtime,
            &[&self.proxy],
            "register_csv",
            FusionError::Registration,
            Ok,
            |rt, targets, completer| {
                native::context::register_csv(rt, targets[0], name, path, completer)
            },
        )
    }

    /// Register the Parquet file or directory at `path` as table `name`
    pub fn register_parquet(&self, name: &str, path: impl AsRef<Path>) -> Result<Pending<()>> {
        let name = name.to_string();
        let path = absolute_path(path.as_ref())?;
        start(
            &self.runtime,
            &[&self.proxy],
            "register_parquet",
            FusionError::Registration,
            Ok,
            |rt, targets, completer| {
                native::context::register_parquet(rt, targets[0], name, path, completer)
            },
        )
    }

    /// Register `provider` as table `name`.
    ///
    /// The provider is borrowed: the context never closes it, and closing the
    /// provider later does not unregister the table.
    pub fn register_table(&self, name: &str, provider: &dyn TableProvider) -> Result<()> {
        let context = self.proxy.enter()?;
        let table = provider.proxy().enter()?;
        let message = native::context::register_table(context.handle(), name, table.handle());
        check_error(message, FusionError::Registration)
    }

    /// Operations dispatched through this context that have not completed yet
    pub fn pending_operations(&self) -> usize {
        self.runtime.pending_operations()
    }

    pub(crate) fn runtime(&self) -> &Arc<RuntimeHandle> {
        &self.runtime
    }
}

//! Listing options, listing table configs and listing tables
//!
//! ```text
//!   FileFormat ──► ListingOptions ──► ListingTableConfig::build (infers schema)
//!                                               │
//!                                               ▼
//!                  SessionContext::register_table ◄── ListingTable
//! ```
//!
//! Each stage borrows its input; the caller closes every stage independently.

use std::path::Path;

use super::context::SessionContext;
use super::format::FileFormat;
use super::{absolute_path, start};
use crate::channel::{Pending, SyncSlot};
use crate::error::{FusionError, Result};
use crate::handle::Handle;
use crate::native;
use crate::proxy::{native_resource, NativeResource, Proxy};

/// A native object that can be registered as a table
pub trait TableProvider: NativeResource {}

// ─── Listing Options ───

/// How files under a listing path are selected and read
#[derive(Debug)]
pub struct ListingOptions {
    proxy: Proxy,
}

native_resource!(ListingOptions);

impl ListingOptions {
    pub fn builder(format: &dyn FileFormat) -> ListingOptionsBuilder<'_> {
        ListingOptionsBuilder {
            format,
            file_extension: format.default_extension().to_string(),
            collect_stat: true,
        }
    }
}

pub struct ListingOptionsBuilder<'a> {
    format: &'a dyn FileFormat,
    file_extension: String,
    collect_stat: bool,
}

impl ListingOptionsBuilder<'_> {
    /// Only list files ending with `extension`; empty lists everything
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Gather file statistics when the table is scanned
    pub fn with_collect_stat(mut self, collect_stat: bool) -> Self {
        self.collect_stat = collect_stat;
        self
    }

    pub fn build(self) -> Result<ListingOptions> {
        native::init();
        let format = self.format.proxy().enter()?;
        let mut slot = SyncSlot::new();
        native::listing::create_listing_options(
            format.handle(),
            &self.file_extension,
            self.collect_stat,
            &mut slot,
        );
        let handle = slot.read()?;
        Ok(ListingOptions {
            proxy: Proxy::new(
                "ListingOptions",
                handle,
                native::listing::destroy_listing_options,
            ),
        })
    }
}

// ─── Listing Table Config ───

/// Table paths plus an inferred schema, ready to back a [`ListingTable`]
#[derive(Debug)]
pub struct ListingTableConfig {
    proxy: Proxy,
}

native_resource!(ListingTableConfig);

impl ListingTableConfig {
    /// Config over one file or directory
    pub fn builder(path: impl AsRef<Path>) -> ListingTableConfigBuilder<'static> {
        Self::builder_with_paths([path])
    }

    /// Config over several files or directories read as one table
    pub fn builder_with_paths<P>(
        paths: impl IntoIterator<Item = P>,
    ) -> ListingTableConfigBuilder<'static>
    where
        P: AsRef<Path>,
    {
        let locations = paths
            .into_iter()
            .map(|path| absolute_path(path.as_ref()))
            .collect();
        ListingTableConfigBuilder {
            locations,
            options: None,
        }
    }

    /// Config over a URL such as `file:///data/events/`, passed through verbatim
    pub fn builder_with_url(url: impl Into<String>) -> ListingTableConfigBuilder<'static> {
        ListingTableConfigBuilder {
            locations: Ok(vec![url.into()]),
            options: None,
        }
    }
}

pub struct ListingTableConfigBuilder<'a> {
    locations: Result<Vec<String>>,
    options: Option<&'a ListingOptions>,
}

impl<'a> ListingTableConfigBuilder<'a> {
    /// Use `options` instead of inferring the format from the first file found
    pub fn with_listing_options<'b>(
        self,
        options: &'b ListingOptions,
    ) -> ListingTableConfigBuilder<'b>
    where
        'a: 'b,
    {
        ListingTableConfigBuilder {
            locations: self.locations,
            options: Some(options),
        }
    }

    /// Resolve the paths and infer the schema on `context`'s runtime.
    ///
    /// Rejects with a registration error when nothing under the paths yields
    /// a schema, for example an empty directory.
    pub fn build(self, context: &SessionContext) -> Result<Pending<ListingTableConfig>> {
        let locations = self.locations?;
        let mut targets = vec![context.proxy()];
        if let Some(options) = self.options {
            targets.push(options.proxy());
        }
        let with_options = self.options.is_some();

        start(
            context.runtime(),
            &targets,
            "build_listing_table_config",
            FusionError::Registration,
            |handle: Handle| {
                Ok(ListingTableConfig {
                    proxy: Proxy::new(
                        "ListingTableConfig",
                        handle,
                        native::listing::destroy_listing_table_config,
                    ),
                })
            },
            |rt, targets, completer| {
                let options = with_options.then(|| targets[1]);
                native::listing::build_listing_table_config(
                    rt, targets[0], locations, options, completer,
                )
            },
        )
    }
}

// ─── Listing Table ───

/// A table provider reading the files described by a [`ListingTableConfig`]
#[derive(Debug)]
pub struct ListingTable {
    proxy: Proxy,
}

native_resource!(ListingTable);

impl TableProvider for ListingTable {}

impl ListingTable {
    /// Create a table from `config`. The config stays open and reusable.
    pub fn new(config: &ListingTableConfig) -> Result<Self> {
        native::init();
        let guard = config.proxy().enter()?;
        let mut slot = SyncSlot::new();
        native::listing::create_listing_table(guard.handle(), &mut slot);
        let handle = slot.read()?;
        Ok(Self {
            proxy: Proxy::new("ListingTable", handle, native::listing::destroy_table_provider),
        })
    }
}

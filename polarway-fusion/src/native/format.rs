//! Native file formats

use std::sync::Arc;

use datafusion::datasource::file_format::arrow::ArrowFormat;
use datafusion::datasource::file_format::csv::CsvFormat;
use datafusion::datasource::file_format::parquet::ParquetFormat;
use datafusion::datasource::file_format::FileFormat;

use super::{library, NativeObject};
use crate::channel::SyncSlot;
use crate::handle::Handle;

const KIND: &str = "FileFormat";

fn register(format: Arc<dyn FileFormat>, slot: &mut SyncSlot<Handle>) {
    slot.set_ok(library().insert(NativeObject::Format(format)));
}

pub(crate) fn create_csv_format(has_header: bool, delimiter: u8, slot: &mut SyncSlot<Handle>) {
    let format = CsvFormat::default()
        .with_has_header(has_header)
        .with_delimiter(delimiter);
    register(Arc::new(format), slot);
}

pub(crate) fn create_parquet_format(slot: &mut SyncSlot<Handle>) {
    register(Arc::new(ParquetFormat::default()), slot);
}

pub(crate) fn create_arrow_format(slot: &mut SyncSlot<Handle>) {
    register(Arc::new(ArrowFormat::default()), slot);
}

pub(crate) fn destroy_format(handle: Handle) -> Option<String> {
    super::destroy(handle, KIND)
}

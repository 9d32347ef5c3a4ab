//! File formats for listing tables

use crate::channel::SyncSlot;
use crate::error::Result;
use crate::handle::Handle;
use crate::native;
use crate::proxy::{native_resource, NativeResource, Proxy};

/// A native file format usable by [`ListingOptions`](super::listing::ListingOptions)
pub trait FileFormat: NativeResource {
    /// Extension listing options use unless told otherwise, e.g. `.csv`
    fn default_extension(&self) -> &'static str;
}

fn create(kind: &'static str, factory: impl FnOnce(&mut SyncSlot<Handle>)) -> Result<Proxy> {
    native::init();
    let mut slot = SyncSlot::new();
    factory(&mut slot);
    let handle = slot.read()?;
    Ok(Proxy::new(kind, handle, native::format::destroy_format))
}

/// CSV files
#[derive(Debug)]
pub struct CsvFormat {
    proxy: Proxy,
}

native_resource!(CsvFormat);

impl CsvFormat {
    /// Comma-delimited with a header row
    pub fn new() -> Result<Self> {
        Self::with_options(true, b',')
    }

    pub fn with_options(has_header: bool, delimiter: u8) -> Result<Self> {
        let proxy = create("CsvFormat", |slot| {
            native::format::create_csv_format(has_header, delimiter, slot)
        })?;
        Ok(Self { proxy })
    }
}

impl FileFormat for CsvFormat {
    fn default_extension(&self) -> &'static str {
        ".csv"
    }
}

/// Parquet files
#[derive(Debug)]
pub struct ParquetFormat {
    proxy: Proxy,
}

native_resource!(ParquetFormat);

impl ParquetFormat {
    pub fn new() -> Result<Self> {
        let proxy = create("ParquetFormat", native::format::create_parquet_format)?;
        Ok(Self { proxy })
    }
}

impl FileFormat for ParquetFormat {
    fn default_extension(&self) -> &'static str {
        ".parquet"
    }
}

/// Arrow IPC files
#[derive(Debug)]
pub struct ArrowFormat {
    proxy: Proxy,
}

native_resource!(ArrowFormat);

impl ArrowFormat {
    pub fn new() -> Result<Self> {
        let proxy = create("ArrowFormat", native::format::create_arrow_format)?;
        Ok(Self { proxy })
    }
}

impl FileFormat for ArrowFormat {
    fn default_extension(&self) -> &'static str {
        ".arrow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::Closeable;

    #[test]
    fn test_formats_create_and_close() {
        let csv = CsvFormat::with_options(false, b';').unwrap();
        let parquet = ParquetFormat::new().unwrap();
        let arrow = ArrowFormat::new().unwrap();

        let handles = [
            csv.handle().unwrap(),
            parquet.handle().unwrap(),
            arrow.handle().unwrap(),
        ];
        assert!(handles.iter().all(|h| native::is_live(*h)));
        assert_eq!(csv.describe(), format!("CsvFormat{}", handles[0]));

        csv.close().unwrap();
        parquet.close().unwrap();
        arrow.close().unwrap();
        assert!(handles.iter().all(|h| !native::is_live(*h)));
    }

    #[test]
    fn test_default_extensions() {
        assert_eq!(CsvFormat::new().unwrap().default_extension(), ".csv");
        assert_eq!(ParquetFormat::new().unwrap().default_extension(), ".parquet");
        assert_eq!(ArrowFormat::new().unwrap().default_extension(), ".arrow");
    }
}

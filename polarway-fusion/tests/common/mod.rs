//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::Int64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::parquet::arrow::ArrowWriter;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; `RUST_LOG=polarway_fusion=debug` shows proxy lifecycles
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Rows of the two-file `test` table: file 0 and file 1
pub const FILE_0: &[(i64, i64)] = &[(1, 2), (3, 4)];
pub const FILE_1: &[(i64, i64)] = &[(1, 12), (3, 14)];

pub const QUERY: &str = "SELECT y FROM test WHERE x = 3 ORDER BY y";

pub fn write_csv_file(path: &Path, rows: &[(i64, i64)]) {
    let mut body = String::from("x,y\n");
    for (x, y) in rows {
        body.push_str(&format!("{x},{y}\n"));
    }
    std::fs::write(path, body).unwrap();
}

pub fn write_parquet_file(path: &Path, rows: &[(i64, i64)]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Int64, false),
        Field::new("y", DataType::Int64, false),
    ]));
    let xs: Vec<i64> = rows.iter().map(|(x, _)| *x).collect();
    let ys: Vec<i64> = rows.iter().map(|(_, y)| *y).collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(Int64Array::from(xs)), Arc::new(Int64Array::from(ys))],
    )
    .unwrap();

    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Directory holding `0.csv` and `1.csv`
pub fn csv_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_csv_file(&dir.path().join("0.csv"), FILE_0);
    write_csv_file(&dir.path().join("1.csv"), FILE_1);
    dir
}

/// Directory holding `0.parquet` and `1.parquet`
pub fn parquet_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_parquet_file(&dir.path().join("0.parquet"), FILE_0);
    write_parquet_file(&dir.path().join("1.parquet"), FILE_1);
    dir
}

/// Values of an Int64 column across all batches
pub fn int64_column(batches: &[RecordBatch], column: &str) -> Vec<i64> {
    batches
        .iter()
        .flat_map(|batch| {
            let index = batch.schema().index_of(column).unwrap();
            batch
                .column(index)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .values()
                .to_vec()
        })
        .collect()
}

pub fn row_count(batches: &[RecordBatch]) -> usize {
    batches.iter().map(RecordBatch::num_rows).sum()
}

pub fn test_context() -> polarway_fusion::SessionContext {
    init_tracing();
    let options = polarway_fusion::FusionConfig::new()
        .with_worker_threads(2)
        .with_thread_name("fusion-test");
    polarway_fusion::SessionContext::with_options(&options).unwrap()
}

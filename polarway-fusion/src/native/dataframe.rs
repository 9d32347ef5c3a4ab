//! Native dataframe operations

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrameWriteOptions;

use super::stream::NativeStream;
use super::{error_string, library, spawn_on, NativeObject};
use crate::channel::Completer;
use crate::handle::Handle;

const KIND: &str = "DataFrame";

pub(crate) fn destroy_dataframe(handle: Handle) -> Option<String> {
    super::destroy(handle, KIND)
}

/// Execute the plan; the value is the result encoded as an Arrow IPC file
pub(crate) fn collect(runtime: Handle, dataframe: Handle, completer: Completer<Vec<u8>>) {
    let work = library().dataframe(dataframe).map(|df| async move {
        let declared: SchemaRef = Arc::new(df.schema().as_arrow().clone());
        let batches = df.collect().await.map_err(error_string)?;
        let schema = batches.first().map(RecordBatch::schema).unwrap_or(declared);
        encode_ipc(&schema, &batches).map_err(error_string)
    });
    spawn_on(runtime, completer, work);
}

/// Start executing the plan; the value is a new record batch stream handle
pub(crate) fn execute_stream(runtime: Handle, dataframe: Handle, completer: Completer<Handle>) {
    let work = library().dataframe(dataframe).map(|df| async move {
        let stream = df.execute_stream().await.map_err(error_string)?;
        let stream = NativeStream::new(stream);
        Ok::<_, String>(library().insert(NativeObject::Stream(stream)))
    });
    spawn_on(runtime, completer, work);
}

pub(crate) fn encode_ipc(
    schema: &SchemaRef,
    batches: &[RecordBatch],
) -> arrow::error::Result<Vec<u8>> {
    let mut writer = FileWriter::try_new(Vec::new(), schema)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    writer.into_inner()
}

/// Print the frame to stdout
pub(crate) fn show(runtime: Handle, dataframe: Handle, completer: Completer<()>) {
    let work = library()
        .dataframe(dataframe)
        .map(|df| async move { df.show().await.map_err(error_string) });
    spawn_on(runtime, completer, work);
}

pub(crate) fn write_parquet(
    runtime: Handle,
    dataframe: Handle,
    path: String,
    completer: Completer<()>,
) {
    let work = library().dataframe(dataframe).map(|df| async move {
        df.write_parquet(&path, DataFrameWriteOptions::new(), None)
            .await
            .map(|_| ())
            .map_err(error_string)
    });
    spawn_on(runtime, completer, work);
}

pub(crate) fn write_csv(
    runtime: Handle,
    dataframe: Handle,
    path: String,
    completer: Completer<()>,
) {
    let work = library().dataframe(dataframe).map(|df| async move {
        df.write_csv(&path, DataFrameWriteOptions::new(), None)
            .await
            .map(|_| ())
            .map_err(error_string)
    });
    spawn_on(runtime, completer, work);
}

/// Register the frame's plan as a view named `name` on `context`
pub(crate) fn register_view(
    runtime: Handle,
    dataframe: Handle,
    context: Handle,
    name: String,
    completer: Completer<()>,
) {
    let lib = library();
    let work = lib.dataframe(dataframe).and_then(|df| {
        let ctx = lib.context(context)?;
        Ok(async move {
            ctx.register_table(name.as_str(), df.into_view())
                .map(|_previous| ())
                .map_err(error_string)
        })
    });
    spawn_on(runtime, completer, work);
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::ipc::reader::FileReader;

    use super::*;

    #[test]
    fn test_ipc_encoding_keeps_schema_without_batches() {
        let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new("y", DataType::Int64, true)]));
        let bytes = encode_ipc(&schema, &[]).unwrap();
        let reader = FileReader::try_new(Cursor::new(bytes), None).unwrap();
        assert_eq!(reader.schema(), schema);
        assert_eq!(reader.count(), 0);
    }

    #[test]
    fn test_ipc_encoding_round_trips_batches() {
        let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new("y", DataType::Int64, true)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int64Array::from(vec![4, 14]))])
                .unwrap();
        let bytes = encode_ipc(&schema, &[batch.clone()]).unwrap();
        let decoded: Vec<RecordBatch> = FileReader::try_new(Cursor::new(bytes), None)
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, vec![batch]);
    }
}

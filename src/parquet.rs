use crate::types::{ColumnData, Table};
use crate::{Error, Result};
use arrow2::array::{Array, BooleanArray, Float64Array, Int32Array, Int64Array, Utf8Array};
use arrow2::chunk::Chunk;
use arrow2::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow2::io::parquet::write::{
    transverse, CompressionOptions, Encoding, FileWriter, RowGroupIterator, Version, WriteOptions,
};
use chrono::NaiveDate;
use std::io::Cursor;

fn write_options() -> WriteOptions {
    WriteOptions {
        write_statistics: true,
        compression: CompressionOptions::Snappy,
        version: Version::V2,
        data_pagesize_limit: None,
    }
}

/// Serializes a table into a fully materialized in-memory parquet file,
/// preserving column names, order and logical types.
pub fn encode_table(table: &Table) -> Result<Vec<u8>> {
    let schema = schema_for(table);

    let encodings = schema
        .fields
        .iter()
        .map(|field| transverse(&field.data_type, |_| Encoding::Plain))
        .collect::<Vec<_>>();

    let chunk = Chunk::new(
        table
            .columns
            .iter()
            .map(|col| to_arrow(&col.data))
            .collect(),
    );

    let row_groups = RowGroupIterator::try_new(
        vec![Ok(chunk)].into_iter(),
        &schema,
        write_options(),
        encodings,
    )
    .map_err(Error::EncodeParquet)?;

    let mut writer = FileWriter::try_new(Cursor::new(Vec::new()), schema, write_options())
        .map_err(Error::EncodeParquet)?;

    for group in row_groups {
        writer
            .write(group.map_err(Error::EncodeParquet)?)
            .map_err(Error::EncodeParquet)?;
    }
    writer.end(None).map_err(Error::EncodeParquet)?;

    Ok(writer.into_inner().into_inner())
}

fn schema_for(table: &Table) -> Schema {
    let fields = table
        .columns
        .iter()
        .map(|col| Field::new(col.name.clone(), data_type_for(&col.data), true))
        .collect::<Vec<_>>();

    Schema::from(fields)
}

fn data_type_for(data: &ColumnData) -> DataType {
    match data {
        ColumnData::Boolean(_) => DataType::Boolean,
        ColumnData::Int32(_) => DataType::Int32,
        ColumnData::Int64(_) => DataType::Int64,
        ColumnData::Float64(_) => DataType::Float64,
        ColumnData::Utf8(_) => DataType::Utf8,
        ColumnData::Date(_) => DataType::Date32,
        ColumnData::Timestamp(_) => DataType::Timestamp(TimeUnit::Microsecond, None),
    }
}

fn to_arrow(data: &ColumnData) -> Box<dyn Array> {
    match data {
        ColumnData::Boolean(v) => BooleanArray::from(v.as_slice()).boxed(),
        ColumnData::Int32(v) => Int32Array::from(v.as_slice()).boxed(),
        ColumnData::Int64(v) => Int64Array::from(v.as_slice()).boxed(),
        ColumnData::Float64(v) => Float64Array::from(v.as_slice()).boxed(),
        ColumnData::Utf8(v) => Utf8Array::<i32>::from(v.as_slice()).boxed(),
        ColumnData::Date(v) => v
            .iter()
            .map(|d| d.map(days_since_epoch))
            .collect::<Int32Array>()
            .to(DataType::Date32)
            .boxed(),
        ColumnData::Timestamp(v) => v
            .iter()
            .map(|t| t.map(|t| t.and_utc().timestamp_micros()))
            .collect::<Int64Array>()
            .to(DataType::Timestamp(TimeUnit::Microsecond, None))
            .boxed(),
    }
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - unix_epoch()).num_days() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use arrow2::array::PrimitiveArray;
    use arrow2::io::parquet::read::{infer_schema, read_columns_many, read_metadata};
    use chrono::{DateTime, Duration, NaiveDate};

    fn decode_table(buf: &[u8]) -> Result<Table> {
        let mut cursor = Cursor::new(buf);
        let metadata = read_metadata(&mut cursor).map_err(Error::ReadParquet)?;
        let schema = infer_schema(&metadata).map_err(Error::ReadParquet)?;

        let mut columns = schema
            .fields
            .iter()
            .map(|field| Column {
                name: field.name.clone(),
                data: empty_column(&field.data_type),
            })
            .collect::<Vec<_>>();

        for row_group in metadata.row_groups {
            let column_iters = read_columns_many(
                &mut cursor,
                &row_group,
                schema.fields.clone(),
                None,
                None,
                None,
            )
            .map_err(Error::ReadParquet)?;

            for (column, iters) in columns.iter_mut().zip(column_iters) {
                for array in iters {
                    push_array(
                        &mut column.data,
                        array.map_err(Error::ReadParquet)?.as_ref(),
                    );
                }
            }
        }

        Ok(Table { columns })
    }

    fn empty_column(data_type: &DataType) -> ColumnData {
        match data_type {
            DataType::Boolean => ColumnData::Boolean(Vec::new()),
            DataType::Int32 => ColumnData::Int32(Vec::new()),
            DataType::Int64 => ColumnData::Int64(Vec::new()),
            DataType::Float64 => ColumnData::Float64(Vec::new()),
            DataType::Utf8 => ColumnData::Utf8(Vec::new()),
            DataType::Date32 => ColumnData::Date(Vec::new()),
            DataType::Timestamp(TimeUnit::Microsecond, None) => {
                ColumnData::Timestamp(Vec::new())
            }
            other => panic!("unexpected data type {:?}", other),
        }
    }

    fn push_array(data: &mut ColumnData, array: &dyn Array) {
        match data {
            ColumnData::Boolean(v) => {
                let arr = array.as_any().downcast_ref::<BooleanArray>().unwrap();
                v.extend(arr.iter());
            }
            ColumnData::Int32(v) => {
                let arr = array.as_any().downcast_ref::<PrimitiveArray<i32>>().unwrap();
                v.extend(arr.iter().map(|x| x.copied()));
            }
            ColumnData::Int64(v) => {
                let arr = array.as_any().downcast_ref::<PrimitiveArray<i64>>().unwrap();
                v.extend(arr.iter().map(|x| x.copied()));
            }
            ColumnData::Float64(v) => {
                let arr = array.as_any().downcast_ref::<PrimitiveArray<f64>>().unwrap();
                v.extend(arr.iter().map(|x| x.copied()));
            }
            ColumnData::Utf8(v) => {
                let arr = array.as_any().downcast_ref::<Utf8Array<i32>>().unwrap();
                v.extend(arr.iter().map(|x| x.map(|s| s.to_owned())));
            }
            ColumnData::Date(v) => {
                let arr = array.as_any().downcast_ref::<PrimitiveArray<i32>>().unwrap();
                v.extend(
                    arr.iter()
                        .map(|x| x.map(|days| unix_epoch() + Duration::days(*days as i64))),
                );
            }
            ColumnData::Timestamp(v) => {
                let arr = array.as_any().downcast_ref::<PrimitiveArray<i64>>().unwrap();
                v.extend(arr.iter().map(|x| {
                    x.map(|micros| {
                        DateTime::from_timestamp_micros(*micros).unwrap().naive_utc()
                    })
                }));
            }
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample_table() -> Table {
        Table {
            columns: vec![
                Column {
                    name: "id".to_owned(),
                    data: ColumnData::Int64(vec![Some(1), Some(2), None]),
                },
                Column {
                    name: "name".to_owned(),
                    data: ColumnData::Utf8(vec![
                        Some("alice".to_owned()),
                        None,
                        Some("bob".to_owned()),
                    ]),
                },
                Column {
                    name: "active".to_owned(),
                    data: ColumnData::Boolean(vec![Some(true), Some(false), None]),
                },
                Column {
                    name: "score".to_owned(),
                    data: ColumnData::Float64(vec![Some(0.5), None, Some(-3.25)]),
                },
                Column {
                    name: "count".to_owned(),
                    data: ColumnData::Int32(vec![None, Some(7), Some(-1)]),
                },
                Column {
                    name: "day".to_owned(),
                    data: ColumnData::Date(vec![
                        Some(date(2024, 3, 15)),
                        Some(date(1969, 12, 31)),
                        None,
                    ]),
                },
                Column {
                    name: "created_at".to_owned(),
                    data: ColumnData::Timestamp(vec![
                        Some(date(2024, 3, 15).and_hms_opt(13, 37, 1).unwrap()),
                        None,
                        Some(date(1970, 1, 1).and_hms_opt(0, 0, 0).unwrap()),
                    ]),
                },
            ],
        }
    }

    #[test]
    fn test_round_trip() {
        let table = sample_table();

        let buf = encode_table(&table).unwrap();
        let decoded = decode_table(&buf).unwrap();

        assert_eq!(decoded, table);
    }

    #[test]
    fn test_round_trip_preserves_column_order() {
        let table = sample_table();

        let buf = encode_table(&table).unwrap();
        let decoded = decode_table(&buf).unwrap();

        let names = decoded
            .columns
            .iter()
            .map(|col| col.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["id", "name", "active", "score", "count", "day", "created_at"]
        );
        assert_eq!(decoded.num_rows(), 3);
    }

    #[test]
    fn test_empty_table_keeps_schema() {
        let table = Table {
            columns: vec![
                Column {
                    name: "id".to_owned(),
                    data: ColumnData::Int64(Vec::new()),
                },
                Column {
                    name: "day".to_owned(),
                    data: ColumnData::Date(Vec::new()),
                },
            ],
        };

        let buf = encode_table(&table).unwrap();
        let decoded = decode_table(&buf).unwrap();

        assert_eq!(decoded, table);
        assert_eq!(decoded.num_rows(), 0);
    }

    #[test]
    fn test_days_since_epoch() {
        assert_eq!(days_since_epoch(date(1970, 1, 1)), 0);
        assert_eq!(days_since_epoch(date(1970, 1, 2)), 1);
        assert_eq!(days_since_epoch(date(1969, 12, 31)), -1);
    }
}

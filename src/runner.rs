use crate::config::{Config, QueryConfig};
use crate::db::QueryRunner;
use crate::options::Options;
use crate::parquet;
use crate::s3::S3Client;
use crate::types::{ColumnData, Table};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::future::Future;

const PARTITION_COLUMN: &str = "distinct_value";
const PARTITION_SLOT: &str = "{distinct_value}";

pub struct ExportRunner {
    db: QueryRunner,
    s3: S3Client,
    query: QueryConfig,
}

impl ExportRunner {
    pub async fn new(options: &Options) -> Result<Self> {
        let config = tokio::fs::read_to_string(&options.cfg_path)
            .await
            .map_err(Error::ReadConfigFile)?;
        let config: Config = toml::de::from_str(&config).map_err(Error::ParseConfig)?;

        let params = config.db.connection_params()?;
        let s3 = S3Client::new(&config.s3).await;

        Ok(Self {
            db: QueryRunner::new(params),
            s3,
            query: config.query,
        })
    }

    /// Runs the export to completion. A failure in one partition skips its
    /// remaining stages and moves on to the next partition.
    pub async fn run(&self) -> Result<()> {
        log::info!("querying for distinct partition values");

        let partitions = match self.enumerate_partitions().await {
            Ok(partitions) => partitions,
            Err(e) => {
                log::error!("failed to enumerate partitions:\n{}", e);
                Vec::new()
            }
        };

        log::info!("{} partitions to export", partitions.len());

        let num_failed =
            export_partitions(&partitions, |value| self.export_partition(value)).await;

        log::info!(
            "finished export. {} partitions succeeded, {} failed.",
            partitions.len() - num_failed,
            num_failed
        );

        Ok(())
    }

    async fn enumerate_partitions(&self) -> Result<Vec<NaiveDate>> {
        let table = self.db.run_query(&self.query.loop_query, &[]).await?;

        partition_values(&table)
    }

    async fn export_partition(&self, value: NaiveDate) -> Result<()> {
        log::info!("..querying for partition {}", value);
        let sql = bind_partition_slot(&self.query.export_query)?;
        let table = self.db.run_query(&sql, &[&value]).await?;

        log::info!("....encoding {} rows to parquet", table.num_rows());
        let buf = parquet::encode_table(&table)?;

        let file_name = partition_file_name(value);
        log::info!("....uploading {}", file_name);
        self.s3.upload(&file_name, buf).await
    }
}

/// Attempts every partition in order. A failure skips that partition's
/// remaining stages and moves on. Returns the number of failed partitions.
async fn export_partitions<F, Fut>(partitions: &[NaiveDate], mut export: F) -> usize
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut num_failed = 0;
    for value in partitions.iter() {
        if let Err(e) = export(*value).await {
            log::error!("failed to export partition {}:\n{}", value, e);
            num_failed += 1;
        }
    }

    num_failed
}

/// Values of the loop query's `distinct_value` column, in result order.
/// NULLs are skipped.
fn partition_values(table: &Table) -> Result<Vec<NaiveDate>> {
    let column = table
        .columns
        .iter()
        .find(|col| col.name == PARTITION_COLUMN)
        .ok_or(Error::NoPartitionColumn)?;

    match &column.data {
        ColumnData::Date(values) => Ok(values.iter().flatten().copied().collect()),
        _ => Err(Error::PartitionColumnNotDate(column.name.clone())),
    }
}

/// Replaces the single named slot in the export query template with a bind
/// marker. The partition value itself is passed as a query parameter, never
/// formatted into the statement.
fn bind_partition_slot(template: &str) -> Result<String> {
    if template.matches(PARTITION_SLOT).count() != 1 {
        return Err(Error::InvalidExportQuery);
    }

    Ok(template.replace(PARTITION_SLOT, "$1"))
}

fn partition_file_name(value: NaiveDate) -> String {
    format!("{}.parquet", value.format("%Y%m%d"))
}

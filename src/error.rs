use std::result::Result as StdResult;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("failed to read config file:\n{0}")]
    ReadConfigFile(std::io::Error),
    #[error("failed to parse config:\n{0}")]
    ParseConfig(toml::de::Error),
    #[error("failed to parse database uri:\n{0}")]
    ParseDbUri(url::ParseError),
    #[error("database uri doesn't specify a host")]
    DbUriMissingHost,
    #[error("missing database connection parameter \"{0}\"")]
    MissingDbParam(&'static str),
    #[error("failed to connect to database:\n{0}")]
    ConnectDb(tokio_postgres::Error),
    #[error("failed to execute query:\n{0}")]
    DbQuery(tokio_postgres::Error),
    #[error("column \"{0}\" has unsupported type {1}")]
    UnsupportedColumnType(String, tokio_postgres::types::Type),
    #[error("loop query result has no \"distinct_value\" column")]
    NoPartitionColumn,
    #[error("partition column \"{0}\" is not a date column")]
    PartitionColumnNotDate(String),
    #[error("export query must contain exactly one {{distinct_value}} slot")]
    InvalidExportQuery,
    #[error("failed to encode parquet file:\n{0}")]
    EncodeParquet(arrow2::error::Error),
    #[error("failed to read parquet file:\n{0}")]
    ReadParquet(arrow2::error::Error),
    #[error("failed to upload object to s3:\n{0}")]
    S3Put(aws_sdk_s3::types::SdkError<aws_sdk_s3::error::PutObjectError>),
}

pub type Result<T> = StdResult<T, Error>;

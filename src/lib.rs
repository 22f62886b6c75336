pub mod config;
pub mod db;
pub mod error;
pub mod options;
pub mod parquet;
pub mod runner;
pub mod s3;
pub mod types;

pub use error::{Error, Result};
pub use options::Options;
pub use runner::ExportRunner;

use crate::config::S3Config;
use crate::{Error, Result};
use aws_sdk_s3::Credentials;
use aws_sdk_s3::types::ByteStream;

pub struct S3Client {
    config: S3Config,
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub async fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "pg-parquet-export-config",
        );

        let cfg = aws_config::from_env()
            .region(aws_types::region::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        let client = aws_sdk_s3::Client::new(&cfg);

        Self {
            config: config.clone(),
            client,
        }
    }

    /// Writes the buffer to `{bucket}/{key_prefix}{file_name}`. Re-running
    /// with the same file name overwrites the same key.
    pub async fn upload(&self, file_name: &str, buf: Vec<u8>) -> Result<()> {
        let key = object_key(&self.config.key_prefix, file_name);

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .body(ByteStream::from(buf))
            .send()
            .await
            .map_err(Error::S3Put)?;

        log::info!(
            "uploaded object to bucket {} with key {}",
            self.config.bucket,
            key
        );

        Ok(())
    }
}

pub fn object_key(key_prefix: &str, file_name: &str) -> String {
    format!("{}{}", key_prefix, file_name)
}

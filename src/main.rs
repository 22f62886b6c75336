use pg_parquet_export::{ExportRunner, Options};

#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    env_logger::init();

    let options = Options::parse();

    let runner = match ExportRunner::new(&options).await {
        Ok(runner) => runner,
        Err(e) => {
            log::error!("failed to create export runner:\n{}", e);
            return;
        }
    };

    if let Err(e) = runner.run().await {
        log::error!("failed to run export:\n{}", e);
    }
}

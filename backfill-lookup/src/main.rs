use std::sync::Arc;

use anyhow::{Context, Error};
use aws_sdk_dynamodb::Client as DynamoClient;
use backfill_common::logging::setup_tracing;
use backfill_common::metrics::install_prometheus_exporter;
use backfill_common::staging::{open_input, read_lookup_keys, CsvStagingWriter};
use backfill_common::time::SystemTime;
use backfill_lookup::config::Config;
use backfill_lookup::retriever::PartitionedRetriever;
use backfill_lookup::runner::{summarize, BatchLookupRunner};
use backfill_lookup::store::DynamoStore;
use envconfig::Envconfig;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_tracing();

    let config = Config::init_from_env().context("invalid lookup configuration")?;
    let locale = config.locale;

    if let Some(bind) = config.metrics_bind {
        install_prometheus_exporter(bind).context("failed to install metrics exporter")?;
    }

    info!("{}", locale.reading_keys(&config.input_file));
    let input = open_input(&config.input_file).map_err(|e| {
        error!("{}", locale.input_missing(&config.input_file));
        e
    })?;
    let keys = read_lookup_keys(input, &config.input_key_column)
        .with_context(|| format!("failed to read keys from {}", config.input_file))?;

    let sdk_config = config.aws.load().await;
    let store = DynamoStore::new(
        DynamoClient::new(&sdk_config),
        config.table_name.as_str(),
        config.partition_key_name.as_str(),
    );
    let runner = BatchLookupRunner::new(
        PartitionedRetriever::new(store, config.request_timeout.0),
        Arc::new(SystemTime::default()),
        config.max_concurrent_lookups,
    )
    .with_locale(locale);

    let mut staging = CsvStagingWriter::create(&config.output_file)
        .with_context(|| format!("failed to create {}", config.output_file))?;
    let outcomes = runner
        .run(keys, &mut staging)
        .await
        .with_context(|| format!("failed to stage results to {}", config.output_file))?;
    staging
        .into_inner()
        .with_context(|| format!("failed to flush {}", config.output_file))?;

    info!("{}", locale.lookup_finished(&summarize(&outcomes)));
    Ok(())
}

use anyhow::{Context, Error};
use aws_sdk_sqs::Client as SqsClient;
use backfill_common::logging::setup_tracing;
use backfill_common::metrics::install_prometheus_exporter;
use backfill_common::staging::{open_input, read_staged_rows};
use backfill_publish::config::Config;
use backfill_publish::publisher::QueuePublisher;
use backfill_publish::queue::SqsQueue;
use backfill_publish::report::write_report_file;
use backfill_publish::runner::BatchPublishRunner;
use envconfig::Envconfig;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_tracing();

    let config = Config::init_from_env().context("invalid publish configuration")?;
    let locale = config.locale;

    if let Some(bind) = config.metrics_bind {
        install_prometheus_exporter(bind).context("failed to install metrics exporter")?;
    }

    info!("{}", locale.publishing_from(&config.input_file));
    let input = open_input(&config.input_file).map_err(|e| {
        error!("{}", locale.input_missing(&config.input_file));
        e
    })?;
    let rows = read_staged_rows(input)
        .with_context(|| format!("failed to read staged rows from {}", config.input_file))?;

    let sdk_config = config.aws.load().await;
    let queue = SqsQueue::new(SqsClient::new(&sdk_config), config.queue_url.as_str());
    let runner = BatchPublishRunner::new(
        QueuePublisher::new(queue, config.request_timeout.0),
        config.max_concurrent_groups,
    )
    .with_locale(locale);

    let report = runner.run(rows).await;

    if let Some(path) = &config.report_file {
        write_report_file(path, &report)
            .with_context(|| format!("failed to write report to {}", path))?;
        info!("wrote report to {}", path);
    }

    info!("{}", locale.publish_finished(&report.summary()));
    Ok(())
}

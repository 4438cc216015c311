use std::net::SocketAddr;

use backfill_common::config::{AwsConfig, EnvMsDuration, NonEmptyString};
use backfill_common::locale::Locale;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "INPUT_FILE", default = "output_data.csv")]
    pub input_file: String,

    #[envconfig(from = "QUEUE_URL")]
    pub queue_url: NonEmptyString,

    #[envconfig(from = "REQUEST_TIMEOUT", default = "5000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "MAX_CONCURRENT_GROUPS", default = "16")]
    pub max_concurrent_groups: usize,

    // Audit CSV, one line per staged row
    #[envconfig(from = "REPORT_FILE")]
    pub report_file: Option<String>,

    #[envconfig(from = "LOCALE", default = "en")]
    pub locale: Locale,

    #[envconfig(from = "METRICS_BIND")]
    pub metrics_bind: Option<SocketAddr>,

    #[envconfig(nested = true)]
    pub aws: AwsConfig,
}

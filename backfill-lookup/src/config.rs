use std::net::SocketAddr;

use backfill_common::config::{AwsConfig, EnvMsDuration, NonEmptyString};
use backfill_common::locale::Locale;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "INPUT_FILE", default = "iks_example.csv")]
    pub input_file: String,

    #[envconfig(from = "OUTPUT_FILE", default = "output_data.csv")]
    pub output_file: String,

    #[envconfig(from = "INPUT_KEY_COLUMN", default = "Idempotency Key")]
    pub input_key_column: String,

    #[envconfig(from = "TABLE_NAME")]
    pub table_name: NonEmptyString,

    #[envconfig(from = "PARTITION_KEY_NAME", default = "PK")]
    pub partition_key_name: NonEmptyString,

    #[envconfig(from = "REQUEST_TIMEOUT", default = "5000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "MAX_CONCURRENT_LOOKUPS", default = "16")]
    pub max_concurrent_lookups: usize,

    #[envconfig(from = "LOCALE", default = "en")]
    pub locale: Locale,

    #[envconfig(from = "METRICS_BIND")]
    pub metrics_bind: Option<SocketAddr>,

    #[envconfig(nested = true)]
    pub aws: AwsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let env = HashMap::from([("TABLE_NAME".to_owned(), "transactions".to_owned())]);
        let config = Config::init_from_hashmap(&env).unwrap();

        assert_eq!(config.input_file, "iks_example.csv");
        assert_eq!(config.output_file, "output_data.csv");
        assert_eq!(config.input_key_column, "Idempotency Key");
        assert_eq!(config.table_name.as_str(), "transactions");
        assert_eq!(config.partition_key_name.as_str(), "PK");
        assert_eq!(config.request_timeout.0, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_lookups, 16);
        assert_eq!(config.locale, Locale::English);
        assert!(config.metrics_bind.is_none());
        assert_eq!(config.aws.region, "us-east-1");
    }

    #[test]
    fn test_table_name_is_required() {
        assert!(Config::init_from_hashmap(&HashMap::new()).is_err());

        let env = HashMap::from([("TABLE_NAME".to_owned(), String::new())]);
        assert!(Config::init_from_hashmap(&env).is_err());
    }

    #[test]
    fn test_overrides() {
        let env = HashMap::from([
            ("TABLE_NAME".to_owned(), "t".to_owned()),
            ("LOCALE".to_owned(), "es-MX".to_owned()),
            ("REQUEST_TIMEOUT".to_owned(), "250".to_owned()),
            ("METRICS_BIND".to_owned(), "127.0.0.1:9102".to_owned()),
        ]);
        let config = Config::init_from_hashmap(&env).unwrap();

        assert_eq!(config.locale, Locale::Spanish);
        assert_eq!(config.request_timeout.0, Duration::from_millis(250));
        assert_eq!(
            config.metrics_bind,
            Some("127.0.0.1:9102".parse().unwrap())
        );
    }
}

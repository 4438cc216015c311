//! User-facing status lines, in every language the tooling is operated in.
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{0} is not a supported locale")]
pub struct UnsupportedLocaleError(String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    English,
    Spanish,
}

impl FromStr for Locale {
    type Err = UnsupportedLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept region-qualified tags like es-MX or en_GB
        let language = s.split(['-', '_']).next().unwrap_or_default();
        match language.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::English),
            "es" => Ok(Locale::Spanish),
            _ => Err(UnsupportedLocaleError(s.to_owned())),
        }
    }
}

/// Tallies shown at the end of a lookup run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupSummary {
    pub keys: usize,
    pub found: usize,
    pub not_found: usize,
    pub query_errors: usize,
    pub staged_rows: usize,
}

/// Tallies shown at the end of a publish run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub rows: usize,
    pub published: usize,
    pub skipped: usize,
    pub structural_errors: usize,
    pub validation_failures: usize,
    pub transport_failures: usize,
}

impl Locale {
    pub fn reading_keys(&self, path: &str) -> String {
        match self {
            Locale::English => format!("Reading keys from '{path}'"),
            Locale::Spanish => format!("Leyendo claves desde '{path}'"),
        }
    }

    pub fn unique_keys(&self, count: usize) -> String {
        match self {
            Locale::English => format!("Found {count} unique keys to query"),
            Locale::Spanish => format!("Se encontraron {count} claves únicas para consultar"),
        }
    }

    pub fn lookup_finished(&self, summary: &LookupSummary) -> String {
        let LookupSummary {
            keys,
            found,
            not_found,
            query_errors,
            staged_rows,
        } = summary;
        match self {
            Locale::English => format!(
                "Lookup completed: {keys} keys, {found} found, {not_found} not found, \
                 {query_errors} query errors, {staged_rows} rows staged"
            ),
            Locale::Spanish => format!(
                "Consulta finalizada: {keys} claves, {found} encontradas, {not_found} sin resultados, \
                 {query_errors} errores de consulta, {staged_rows} filas escritas"
            ),
        }
    }

    pub fn publishing_from(&self, path: &str) -> String {
        match self {
            Locale::English => format!("Starting to publish to the queue from '{path}'"),
            Locale::Spanish => {
                format!("Iniciando proceso de envío a la cola desde el archivo '{path}'")
            }
        }
    }

    pub fn publish_finished(&self, summary: &PublishSummary) -> String {
        let PublishSummary {
            rows,
            published,
            skipped,
            structural_errors,
            validation_failures,
            transport_failures,
        } = summary;
        match self {
            Locale::English => format!(
                "Publish completed: {rows} rows, {published} published, {skipped} skipped, \
                 {structural_errors} malformed, {validation_failures} invalid, \
                 {transport_failures} failed to send"
            ),
            Locale::Spanish => format!(
                "Proceso finalizado: {rows} filas, {published} enviadas, {skipped} omitidas, \
                 {structural_errors} mal formadas, {validation_failures} inválidas, \
                 {transport_failures} con error de envío"
            ),
        }
    }

    pub fn input_missing(&self, path: &str) -> String {
        match self {
            Locale::English => format!("Input file not found at '{path}'"),
            Locale::Spanish => format!("No se encontró el archivo de entrada '{path}'"),
        }
    }

    pub fn querying_key(&self, key: &str) -> String {
        match self {
            Locale::English => format!("Querying records for PK {key}"),
            Locale::Spanish => format!("Consultando registros para PK {key}"),
        }
    }

    pub fn key_found(&self, key: &str, records: usize) -> String {
        match self {
            Locale::English => format!("Found {records} records for PK {key}"),
            Locale::Spanish => format!("Se encontraron {records} registros para PK {key}"),
        }
    }

    pub fn key_not_found(&self, key: &str) -> String {
        match self {
            Locale::English => format!("No records found for PK {key}"),
            Locale::Spanish => format!("No se encontraron registros para PK {key}"),
        }
    }

    pub fn key_failed(&self, key: &str, reason: &str) -> String {
        match self {
            Locale::English => format!("AWS error while querying PK {key}: {reason}"),
            Locale::Spanish => format!("Error de AWS al consultar PK {key}: {reason}"),
        }
    }

    pub fn row_skipped(&self, row: usize, key: &str, marker: &str) -> String {
        match self {
            Locale::English => format!("Skipping row {row} for PK {key}: {marker}"),
            Locale::Spanish => format!("Saltando fila {row} para PK {key}: {marker}"),
        }
    }

    pub fn row_malformed(&self, row: usize, key: &str, reason: &str) -> String {
        match self {
            Locale::English => {
                format!("Skipping row {row} for PK {key}, the body is not valid JSON: {reason}")
            }
            Locale::Spanish => format!(
                "Saltando fila {row} para PK {key} porque el body no es un JSON válido: {reason}"
            ),
        }
    }

    pub fn row_published(&self, row: usize, key: &str, message_id: &str) -> String {
        match self {
            Locale::English => {
                format!("Row {row} sent to the queue for PK {key}. MessageId: {message_id}")
            }
            Locale::Spanish => {
                format!("Mensaje enviado a la cola para PK {key} (fila {row}). MessageId: {message_id}")
            }
        }
    }

    pub fn row_not_published(&self, row: usize, key: &str, reason: &str) -> String {
        match self {
            Locale::English => format!("Error sending row {row} for PK {key}: {reason}"),
            Locale::Spanish => {
                format!("Error al enviar la fila {row} para PK {key}: {reason}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locale() {
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::English);
        assert_eq!("ES".parse::<Locale>().unwrap(), Locale::Spanish);
        assert_eq!("es-MX".parse::<Locale>().unwrap(), Locale::Spanish);
        assert_eq!("en_GB".parse::<Locale>().unwrap(), Locale::English);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_summaries_mention_counts() {
        let summary = PublishSummary {
            rows: 3,
            published: 2,
            structural_errors: 1,
            ..Default::default()
        };

        for locale in [Locale::English, Locale::Spanish] {
            let line = locale.publish_finished(&summary);
            assert!(line.contains('3') && line.contains('2') && line.contains('1'));
        }

        assert!(Locale::Spanish
            .lookup_finished(&LookupSummary::default())
            .starts_with("Consulta finalizada"));
    }

    #[test]
    fn test_unit_lines_follow_locale() {
        assert_eq!(
            Locale::Spanish.row_published(4, "batch-1", "m-9"),
            "Mensaje enviado a la cola para PK batch-1 (fila 4). MessageId: m-9"
        );
        assert_eq!(
            Locale::English.row_published(4, "batch-1", "m-9"),
            "Row 4 sent to the queue for PK batch-1. MessageId: m-9"
        );
        assert!(Locale::Spanish
            .row_malformed(2, "k", "EOF")
            .starts_with("Saltando fila 2 para PK k"));
        assert_eq!(
            Locale::English.key_failed("k", "Requested resource not found"),
            "AWS error while querying PK k: Requested resource not found"
        );
        assert_eq!(
            Locale::Spanish.key_not_found("k"),
            "No se encontraron registros para PK k"
        );
    }
}

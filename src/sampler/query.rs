//! Fixed query texts, version gates, and the traced executor.

use super::client::{ResultSet, Row, Session};
use super::error::{QueryError, SchemaError};
use tracing::{info_span, warn};
use tracing_futures::Instrument as _;

pub const SHOW_STATUS: &str = "SHOW STATUS";
pub const SHOW_GLOBAL_STATUS: &str = "SHOW GLOBAL STATUS";
pub const SHOW_MASTER_STATUS: &str = "SHOW MASTER STATUS";
pub const SHOW_SLAVE_STATUS: &str = "SHOW SLAVE STATUS";
pub const SHOW_WSREP_STATUS: &str = "SHOW GLOBAL STATUS LIKE 'wsrep_%'";
pub const INNODB_METRICS_ENABLED: &str =
    "SELECT name, count, type FROM information_schema.innodb_metrics WHERE enabled";
pub const INNODB_METRICS_STATUS_ENABLED: &str =
    "SELECT name, count, type FROM information_schema.innodb_metrics WHERE status = 'enabled'";

/// Servers older than 5.0.2 only know the session-scoped `SHOW STATUS`.
pub const GLOBAL_STATUS_MIN_VERSION: u64 = 50_002;
/// `information_schema.innodb_metrics` exists from 5.6.
pub const INNODB_METRICS_MIN_VERSION: u64 = 50_600;
/// From 10.5 the `status` column is gone and `enabled` is a boolean.
pub const INNODB_METRICS_ENABLED_COLUMN_VERSION: u64 = 100_500;

#[must_use]
pub const fn status_query(version: u64) -> &'static str {
    if version < GLOBAL_STATUS_MIN_VERSION {
        SHOW_STATUS
    } else {
        SHOW_GLOBAL_STATUS
    }
}

#[must_use]
pub const fn innodb_metrics_supported(version: u64) -> bool {
    version >= INNODB_METRICS_MIN_VERSION
}

#[must_use]
pub const fn innodb_metrics_query(version: u64) -> &'static str {
    if version >= INNODB_METRICS_ENABLED_COLUMN_VERSION {
        INNODB_METRICS_ENABLED
    } else {
        INNODB_METRICS_STATUS_ENABLED
    }
}

/// Run `query` and materialize its full result.
///
/// # Errors
///
/// Returns a [`QueryError`] if the server rejects the statement or the result
/// cannot be fetched.
pub async fn execute(session: &mut dyn Session, query: &'static str) -> Result<ResultSet, QueryError> {
    let operation = query.split_whitespace().next().unwrap_or("QUERY");
    let span = info_span!(
        "db.query",
        db.system = "mysql",
        db.operation = operation,
        db.statement = query,
        db.rows = tracing::field::Empty,
        otel.kind = "client"
    );

    let result = session.query(query).instrument(span.clone()).await?;
    span.record("db.rows", result.len());
    Ok(result)
}

/// Take the single row a status query is expected to return.
///
/// # Errors
///
/// Returns [`SchemaError::NoRows`] on an empty result, or
/// [`SchemaError::TooFewColumns`] if the result is narrower than `min_columns`.
pub fn single_row<'a>(
    result: &'a ResultSet,
    query: &'static str,
    min_columns: usize,
) -> Result<&'a Row, SchemaError> {
    let row = result.rows().first().ok_or(SchemaError::NoRows { query })?;

    if result.len() > 1 {
        warn!(
            query,
            rows = result.len(),
            "query returned more than one row, using the first one"
        );
    }

    if result.columns() < min_columns {
        return Err(SchemaError::TooFewColumns {
            query,
            expected: min_columns,
            actual: result.columns(),
        });
    }

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_query_gate() {
        assert_eq!(status_query(50_001), SHOW_STATUS);
        assert_eq!(status_query(50_002), SHOW_GLOBAL_STATUS);
        assert_eq!(status_query(100_508), SHOW_GLOBAL_STATUS);
        assert_eq!(status_query(0), SHOW_STATUS);
    }

    #[test]
    fn test_innodb_metrics_gates() {
        assert!(!innodb_metrics_supported(50_599));
        assert!(innodb_metrics_supported(50_600));

        assert_eq!(innodb_metrics_query(50_600), INNODB_METRICS_STATUS_ENABLED);
        assert_eq!(innodb_metrics_query(100_499), INNODB_METRICS_STATUS_ENABLED);
        assert_eq!(innodb_metrics_query(100_500), INNODB_METRICS_ENABLED);
        assert_eq!(innodb_metrics_query(110_400), INNODB_METRICS_ENABLED);
    }

    #[test]
    fn test_single_row_no_rows() {
        let result = ResultSet::new(2, Vec::new());
        assert_eq!(
            single_row(&result, SHOW_MASTER_STATUS, 2),
            Err(SchemaError::NoRows {
                query: SHOW_MASTER_STATUS
            })
        );
    }

    #[test]
    fn test_single_row_too_few_columns() {
        let result = ResultSet::from_rows(&[["log-bin.000123"]]);
        assert_eq!(
            single_row(&result, SHOW_MASTER_STATUS, 2),
            Err(SchemaError::TooFewColumns {
                query: SHOW_MASTER_STATUS,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_single_row_checks_result_width() {
        let row = vec![Some("log-bin.000123".to_string()), Some("4096".to_string())];
        let result = ResultSet::new(1, vec![row]);
        assert_eq!(
            single_row(&result, SHOW_MASTER_STATUS, 2),
            Err(SchemaError::TooFewColumns {
                query: SHOW_MASTER_STATUS,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_single_row_uses_first() {
        let result = ResultSet::from_rows(&[["log-bin.000123", "4096"], ["log-bin.000124", "8"]]);
        let row = single_row(&result, SHOW_MASTER_STATUS, 2).unwrap();
        assert_eq!(row.get(1).cloned().flatten().as_deref(), Some("4096"));
    }
}

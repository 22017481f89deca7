use thiserror::Error;

/// Library-level failures. Data-quality problems (malformed numerics,
/// blank key fields) are not errors; they coerce to null at load time
/// and get counted in the load summary instead.
#[derive(Debug, Error)]
pub enum KpiError {
    #[error("{table} is missing required column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("failed reading {table} from {path}")]
    Csv {
        table: &'static str,
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("no event rows to aggregate")]
    EmptyInput,

    #[error("invalid leaderboard request: {0}")]
    InvalidRequest(String),
}

use std::path::PathBuf;

use thiserror::Error;

/// Input and structural problems. These stop a command before any work is
/// done and exit with status 2.
#[derive(Debug, Error)]
pub enum RescueError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid run_result format: expected schema_version \"{0}\"")]
    SchemaMismatch(&'static str),

    #[error("plan file not found: {0}")]
    PlanNotFound(PathBuf),

    #[error("invalid rescue plan: {0}")]
    InvalidPlan(String),

    #[error("root directory not found: {0}")]
    RootNotFound(PathBuf),
}

impl RescueError {
    pub const EXIT_CODE: u8 = 2;
}

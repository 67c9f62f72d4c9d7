use thiserror::Error;

use wgbs_model::StateError;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("no writable location for the scratch directory (tried: {tried})")]
    TempDir { tried: String },
    #[error("cluster configuration has no '{0}'")]
    MissingClusterSetting(&'static str),
    #[error("invalid setting '{key}': expected {expected}")]
    InvalidSetting { key: String, expected: &'static str },
    #[error("missing program")]
    MissingProgram,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("wait failed: {0}")]
    Wait(String),
    #[error("engine exited with non-zero code: {code}")]
    ChildFailed { code: i32 },
    #[error("interrupted")]
    Interrupted,
    #[error("io error: {0}")]
    Io(String),
    #[error(transparent)]
    State(#[from] StateError),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

pub type ExecResult<T> = Result<T, ExecError>;

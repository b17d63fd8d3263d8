use thiserror::Error;

/// Thread-local last-error code captured right after a failing native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("win32 error {0}")]
pub struct OsError(pub u32);

impl OsError {
    pub fn code(self) -> u32 {
        self.0
    }
}

pub type OsResult<T> = std::result::Result<T, OsError>;

/// Gateway bootstrap errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the {0} backend is not available on this target")]
    BackendUnavailable(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no candidate container found")]
    NoCandidate,
    #[error("cannot synthesize a locator: {0}")]
    Synthesis(String),
    #[error("invalid locator {locator:?}: {reason}")]
    Query { locator: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(String),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("rendering session failed: {0}")]
    Session(String),
    #[error("empty document")]
    Empty,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record file i/o: {0}")]
    Io(#[from] std::io::Error),
}

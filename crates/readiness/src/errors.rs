use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("readiness wait cancelled")]
    Cancelled,

    #[error("poll interval must be positive")]
    ZeroInterval,
}

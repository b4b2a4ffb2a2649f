use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("read failure: {0}")]
    ReadFailure(String),
    #[error("encode failure: {0}")]
    EncodeFailure(String),
}

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("device open failed: {0}")]
    Open(String),

    #[error("frame read failed: {0}")]
    Read(String),

    #[error("device disconnected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("failed to spawn {0} thread: {1}")]
    Spawn(&'static str, std::io::Error),

    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

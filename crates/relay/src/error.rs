use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to encode a broadcast frame: {0}")]
    Encode(#[from] events::EventsError),
}

use thiserror::Error;

/// Terminal conditions the CLI reports distinctly. Recoverable conditions
/// (decode failures, probe errors) are handled in place and never surface
/// through this type.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("unable to retrieve a playable URL; check that the file id is correct and accessible")]
    NoUrlFound,

    #[error("no stream matched the requested format or quality policy")]
    SelectionMiss,

    #[error("failed to merge audio and video streams: {0}")]
    Mux(String),
}

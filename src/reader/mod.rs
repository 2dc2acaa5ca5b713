#[cfg(feature = "csv")]
/// This module provides a record reader over RFC4180 CSV streams.
pub mod csv;

#[cfg(feature = "json")]
/// This module provides a record reader over Apex-flavor pretty JSON arrays.
pub mod json;

#[cfg(any(feature = "csv", feature = "json"))]
use crate::error::RecordError;

/// Where a reader stands relative to its stream's end.
///
/// The flush of buffered complete records always happens in the same call
/// that discovers the terminal condition, so there is no observable
/// "flush pending" state between `Streaming` and `Done`.
#[cfg(any(feature = "csv", feature = "json"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamState {
    /// The source may still produce records.
    Streaming,
    /// The stream stopped: cleanly (`None`), or with a remembered terminal
    /// error replayed on every later call.
    Done(Option<RecordError>),
}

#[cfg(any(feature = "csv", feature = "json"))]
impl StreamState {
    /// The outcome to replay once the stream is done, if it is.
    /// `Ok(())` stands for end of stream.
    pub(crate) fn replay(&self) -> Option<Result<(), RecordError>> {
        match self {
            StreamState::Streaming => None,
            StreamState::Done(None) => Some(Ok(())),
            StreamState::Done(Some(error)) => Some(Err(error.clone())),
        }
    }
}

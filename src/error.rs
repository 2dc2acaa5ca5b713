use thiserror::Error;

/// Terminal conditions a record reader can report.
///
/// End of stream is not an error: readers signal it by returning `Ok(None)`
/// from [`next_group`](crate::core::reader::RecordReader::next_group).
///
/// The variants carry display strings rather than the source error values so
/// that a remembered terminal condition can be replayed on every subsequent
/// call and compared in assertions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The stream ended while a record was only partially formed.
    #[error("stream finished in the middle of a record")]
    IncompleteRecord,

    /// A record was locally malformed (e.g. a CSV row with the wrong shape),
    /// and the underlying source itself did not fail.
    #[error("malformed record: {0}")]
    Parse(String),

    /// The underlying byte source failed; the message is the source error's,
    /// unchanged.
    #[error("stream source failed: {0}")]
    Source(String),
}

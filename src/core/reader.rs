use crate::{core::group::RecordGroup, error::RecordError};

/// Result of one stepping call on a [`RecordReader`].
///
/// - `Ok(Some(group))`: at least one complete record was flushed
///   (`group.count > 0`).
/// - `Ok(None)`: end of stream; repeated calls keep returning it.
/// - `Err(error)`: a terminal failure, reported only once every record
///   completed before the failure has been delivered; repeated calls keep
///   returning the same error.
pub type RecordReaderResult = Result<Option<RecordGroup>, RecordError>;

/// Pull-based iteration over groups of complete records.
///
/// A reader is constructed once per stream, stepped until it reports end of
/// stream or an error, then discarded. Implementations use interior
/// mutability for their buffers and are not safe for concurrent stepping;
/// callers serialize access.
pub trait RecordReader {
    /// Returns the next group of complete records, end of stream, or a
    /// terminal error.
    ///
    /// No record bytes are lost silently: when a terminal condition is
    /// discovered while complete records are buffered, those records are
    /// flushed first (`Ok(Some(_))`) and the condition itself is reported on
    /// the following call.
    fn next_group(&self) -> RecordReaderResult;
}

/// Drains `reader` and concatenates every group it produces.
///
/// Stops at the first terminal condition. On end of stream the error slot is
/// `None`; on any failure it carries the reader's error. Either way the
/// returned group holds every complete record read before the stream stopped,
/// so callers always get the maximal valid prefix alongside the error.
///
/// # Examples
///
/// ```
/// use record_grouper::core::reader::read_all;
/// use record_grouper::reader::csv::CsvRecordReaderBuilder;
///
/// let reader = CsvRecordReaderBuilder::new().from_reader("a,b\n1,2\n".as_bytes());
/// let (group, error) = read_all(&reader);
/// assert!(error.is_none());
/// assert_eq!(group.count, 2);
/// assert_eq!(group.bytes, b"a,b\n1,2\n");
/// ```
pub fn read_all<R: RecordReader + ?Sized>(reader: &R) -> (RecordGroup, Option<RecordError>) {
    let mut composite = RecordGroup::default();
    loop {
        match reader.next_group() {
            Ok(Some(group)) => composite.extend(group),
            Ok(None) => return (composite, None),
            Err(error) => return (composite, Some(error)),
        }
    }
}

use std::{cell::RefCell, fs::File, io::Read, mem, path::Path};

use csv::{ByteRecord, ReaderBuilder, Writer, WriterBuilder};
use log::debug;

use crate::{
    core::{
        group::{GroupOptions, RecordGroup},
        reader::{RecordReader, RecordReaderResult},
    },
    error::RecordError,
    reader::StreamState,
};

/// A record reader that reports each CSV row as one record.
///
/// Rows are delimited by the `csv` crate, not by newlines: a newline can sit
/// inside a quoted cell, and quotes are escaped by doubling, so `","` may be
/// one cell containing a comma or two empty quoted cells depending on what
/// precedes it. Every row that parses is re-serialized through a canonical
/// CSV writer into the group buffer, so the emitted bytes are always
/// well-formed rows regardless of how the input was spaced or terminated.
///
/// A terminal condition (end of input, malformed row, broken source) is
/// remembered and only reported once every previously completed row has been
/// flushed; a malformed or truncated final row never appears in any group.
///
/// # Examples
///
/// ```
/// use record_grouper::core::reader::RecordReader;
/// use record_grouper::reader::csv::CsvRecordReaderBuilder;
///
/// let data = "name,value\nfoo,123\nbar,456\n";
/// let reader = CsvRecordReaderBuilder::new()
///     .group_size(2)
///     .from_reader(data.as_bytes());
///
/// let group = reader.next_group().unwrap().unwrap();
/// assert_eq!(group.count, 2);
/// assert_eq!(group.bytes, b"name,value\nfoo,123\n");
///
/// let group = reader.next_group().unwrap().unwrap();
/// assert_eq!(group.count, 1);
/// assert_eq!(group.bytes, b"bar,456\n");
///
/// assert!(reader.next_group().unwrap().is_none());
/// ```
pub struct CsvRecordReader<R: Read> {
    /// Reader state behind a `RefCell` so `next_group` can take `&self`,
    /// matching the reader trait.
    state: RefCell<CsvState<R>>,
    group_size: usize,
}

struct CsvState<R: Read> {
    rows: csv::Reader<R>,
    /// Scratch row reused across reads; its bytes are re-encoded into the
    /// group writer before the next read overwrites them.
    row: ByteRecord,
    /// Rows of the in-progress group, already in canonical CSV form.
    group: Writer<Vec<u8>>,
    rows_in_group: usize,
    delimiter: u8,
    stream: StreamState,
}

impl<R: Read> RecordReader for CsvRecordReader<R> {
    fn next_group(&self) -> RecordReaderResult {
        self.state.borrow_mut().next_group(self.group_size)
    }
}

impl<R: Read> CsvState<R> {
    fn next_group(&mut self, group_size: usize) -> RecordReaderResult {
        if let Some(outcome) = self.stream.replay() {
            return outcome.map(|()| None);
        }
        loop {
            match self.rows.read_byte_record(&mut self.row) {
                Ok(true) => {
                    if let Err(error) = self.group.write_byte_record(&self.row) {
                        self.stream = StreamState::Done(Some(classify(&error)));
                        break;
                    }
                    self.rows_in_group += 1;
                    if self.rows_in_group == group_size {
                        return Ok(Some(self.flush_group()?));
                    }
                }
                Ok(false) => {
                    self.stream = StreamState::Done(None);
                    break;
                }
                Err(error) => {
                    self.stream = StreamState::Done(Some(self.disambiguate(error)));
                    break;
                }
            }
        }
        // The stream stopped. Deliver buffered rows first; the remembered
        // condition is reported on the next call.
        if self.rows_in_group > 0 {
            return Ok(Some(self.flush_group()?));
        }
        match &self.stream {
            StreamState::Done(Some(error)) => Err(error.clone()),
            _ => Ok(None),
        }
    }

    /// Pins down the true cause of a failed row read.
    ///
    /// When the underlying reader breaks mid-row, the CSV parser sees the
    /// bytes it had already buffered run out and reports a parse error for a
    /// row it only ever received partially; the source's own error would only
    /// surface on the next fill of the parser's buffer. So after a
    /// parse-class error, one more row read is attempted: if that probe fails
    /// with anything other than end of input, its error is the real terminal
    /// condition and replaces the parse error. A row the probe happens to
    /// parse is discarded along with the malformed one.
    fn disambiguate(&mut self, error: csv::Error) -> RecordError {
        let terminal = classify(&error);
        if matches!(error.kind(), csv::ErrorKind::Io(_)) {
            // Already a source failure, nothing is masked.
            return terminal;
        }
        let mut probe = ByteRecord::new();
        match self.rows.read_byte_record(&mut probe) {
            Ok(_) => terminal,
            Err(next_error) => {
                debug!("row parse error hid a later failure: {next_error}");
                classify(&next_error)
            }
        }
    }

    fn flush_group(&mut self) -> Result<RecordGroup, RecordError> {
        let count = self.rows_in_group;
        self.rows_in_group = 0;
        // Swap in a fresh writer so the returned bytes are owned outright
        // and never alias a buffer this reader will keep writing to.
        let full = mem::replace(&mut self.group, group_writer(self.delimiter));
        let bytes = full
            .into_inner()
            .map_err(|error| RecordError::Source(error.to_string()))?;
        debug!("flushed group of {count} csv rows");
        Ok(RecordGroup { bytes, count })
    }
}

fn classify(error: &csv::Error) -> RecordError {
    match error.kind() {
        csv::ErrorKind::Io(source) => RecordError::Source(source.to_string()),
        _ => RecordError::Parse(error.to_string()),
    }
}

fn group_writer(delimiter: u8) -> Writer<Vec<u8>> {
    WriterBuilder::new().delimiter(delimiter).from_writer(Vec::new())
}

/// A builder for configuring CSV record reading.
///
/// Defaults: comma delimiter, group size of
/// [`DEFAULT_GROUP_SIZE`](crate::core::group::DEFAULT_GROUP_SIZE) rows.
///
/// The first row of the stream is a record like any other; if the input
/// carries a header row it is counted and emitted as the first record of
/// the first group, which is what a bulk-upload payload wants.
pub struct CsvRecordReaderBuilder {
    /// The delimiter for both the parse side and the canonical writer.
    delimiter: u8,
    options: GroupOptions,
}

impl Default for CsvRecordReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRecordReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            options: GroupOptions::default(),
        }
    }

    /// Sets the field delimiter, for parsing and re-serializing alike.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the max number of rows per group; `0` keeps the default of 8.
    pub fn group_size(mut self, group_size: usize) -> Self {
        self.options.group_size = group_size;
        self
    }

    /// Applies a whole [`GroupOptions`] at once.
    pub fn options(mut self, options: GroupOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates a `CsvRecordReader` over any byte source: an in-memory
    /// buffer, a file, or an HTTP response body.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvRecordReader<R> {
        let rows = ReaderBuilder::new()
            .delimiter(self.delimiter)
            // Every row is a record, header included.
            .has_headers(false)
            // Strict row shapes, so a truncated final row is rejected.
            .flexible(false)
            .from_reader(rdr);

        CsvRecordReader {
            state: RefCell::new(CsvState {
                rows,
                row: ByteRecord::new(),
                group: group_writer(self.delimiter),
                rows_in_group: 0,
                delimiter: self.delimiter,
                stream: StreamState::Streaming,
            }),
            group_size: self.options.effective_group_size(),
        }
    }

    /// Creates a `CsvRecordReader` reading from a file.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be opened; failing to open the input is an
    /// initialization error, unlike the read errors reported through
    /// [`next_group`](crate::core::reader::RecordReader::next_group).
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> CsvRecordReader<File> {
        let file = File::open(path).expect("unable to open csv input file");
        self.from_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reader::read_all;

    #[test]
    fn empty_input_is_end_of_stream_at_once() {
        let reader = CsvRecordReaderBuilder::new().from_reader("".as_bytes());
        assert_eq!(reader.next_group(), Ok(None));
        assert_eq!(reader.next_group(), Ok(None));
    }

    #[test]
    fn rows_are_reencoded_canonically() {
        // Unnecessary quoting is dropped on re-serialization; cells that
        // need quoting keep it.
        let data = "a,\"b\"\n\"x,y\",z\n";
        let (group, error) = read_all(&CsvRecordReaderBuilder::new().from_reader(data.as_bytes()));
        assert_eq!(error, None);
        assert_eq!(group.count, 2);
        assert_eq!(group.bytes, b"a,b\n\"x,y\",z\n");
    }

    #[test]
    fn newline_inside_quoted_cell_stays_in_one_record() {
        let data = "a,\"line one\nline two\"\nb,c\n";
        let reader = CsvRecordReaderBuilder::new()
            .group_size(1)
            .from_reader(data.as_bytes());
        let first = reader.next_group().unwrap().unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.bytes, b"a,\"line one\nline two\"\n");
    }

    #[test]
    fn alternate_delimiter_round_trips() {
        let data = "a;b\n1;2\n";
        let (group, error) = read_all(
            &CsvRecordReaderBuilder::new()
                .delimiter(b';')
                .from_reader(data.as_bytes()),
        );
        assert_eq!(error, None);
        assert_eq!(group.count, 2);
        assert_eq!(group.bytes, b"a;b\n1;2\n");
    }

    #[test]
    fn short_final_row_is_discarded_and_reported_once() {
        let data = "a,b,c\n1,2,3\n4,\n";
        let reader = CsvRecordReaderBuilder::new().from_reader(data.as_bytes());
        let flushed = reader.next_group().unwrap().unwrap();
        assert_eq!(flushed.count, 2);
        assert_eq!(flushed.bytes, b"a,b,c\n1,2,3\n");
        let error = reader.next_group().unwrap_err();
        assert!(matches!(error, RecordError::Parse(_)));
        // The terminal error replays.
        assert_eq!(reader.next_group(), Err(error));
    }

    #[test]
    fn group_size_zero_batches_with_the_default() {
        let mut data = String::new();
        for i in 0..10 {
            data.push_str(&format!("{i},x\n"));
        }
        let reader = CsvRecordReaderBuilder::new()
            .group_size(0)
            .from_reader(data.as_bytes());
        let group = reader.next_group().unwrap().unwrap();
        assert_eq!(group.count, 8);
    }
}

use std::{
    cell::RefCell,
    fs::File,
    io::{BufRead, BufReader, Read},
    mem,
    path::Path,
};

use log::debug;

use crate::{
    core::{
        group::{GroupOptions, RecordGroup},
        reader::{RecordReader, RecordReaderResult},
    },
    error::RecordError,
    reader::StreamState,
};

const EXPECTED_RECORD_SIZE: usize = 2048;

/// A record reader that converts Apex-flavor pretty JSON arrays into
/// JSON-Lines records.
///
/// This is not a JSON parser. `[{}, {}]` cannot be split incrementally
/// without parsing the values, and parsing them would cost more than this
/// reader is allowed to; instead each input line is classified by its first
/// and last byte to decide where one object ends and the next begins. Only
/// the layout below, one key or brace per line as the exporter produces it,
/// is supported; compact or differently-indented JSON will misparse:
///
/// ```text
/// [ {
///   "Id" : "ID1"
/// }, {
///   "Id" : "ID2"
/// } ]
/// ```
///
/// The `}, {` separator line both completes one record and opens the next;
/// the fresh record starts from a bare `{`, so any exporter that varies the
/// separator layout is outside the supported contract.
///
/// Each completed object becomes one `\n`-terminated line in the group
/// buffer, content bytes untouched. As with the CSV reader, a terminal
/// condition is only reported once every completed record has been flushed,
/// and a record cut off before its closing marker is never emitted: it is
/// reported as [`RecordError::IncompleteRecord`].
pub struct JsonRecordReader<R: Read> {
    state: RefCell<JsonState<R>>,
    group_size: usize,
}

struct JsonState<R> {
    lines: BufReader<R>,
    /// Scratch for the current input line.
    line: Vec<u8>,
    /// The object being reconstructed, complete up to the last line seen.
    pending: Vec<u8>,
    /// Finished JSON-Lines records of the in-progress group.
    group: Vec<u8>,
    records_in_group: usize,
    stream: StreamState,
}

impl<R: Read> RecordReader for JsonRecordReader<R> {
    fn next_group(&self) -> RecordReaderResult {
        self.state.borrow_mut().next_group(self.group_size)
    }
}

impl<R: Read> JsonState<R> {
    fn next_group(&mut self, group_size: usize) -> RecordReaderResult {
        if let Some(outcome) = self.stream.replay() {
            return outcome.map(|()| None);
        }
        // Groups only flush on a completed record, so a call never starts
        // with half a record already committed.
        let mut finished_pending = true;
        loop {
            self.line.clear();
            let failure = match self.lines.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.stream = StreamState::Done(if finished_pending {
                        None
                    } else {
                        Some(RecordError::IncompleteRecord)
                    });
                    break;
                }
                Ok(_) => None,
                Err(error) => {
                    // A real source failure outranks an unterminated object.
                    // Bytes read before the failure still form a final line
                    // and may complete the pending record, so they are
                    // processed below before the failure is reported.
                    Some(RecordError::Source(error.to_string()))
                }
            };
            if let Some(error) = failure.clone() {
                self.stream = StreamState::Done(Some(error));
            }
            if self.line.last() == Some(&b'\n') {
                self.line.pop();
            }
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
            if self.line.is_empty() {
                if failure.is_some() {
                    break;
                }
                continue;
            }

            let first = self.line[0];
            let last = self.line[self.line.len() - 1];
            match (first, last) {
                (b'[', b'{') => {
                    // `[ {`: the array opens; keep only the object brace.
                    self.pending.extend_from_slice(&self.line[2..]);
                    finished_pending = false;
                }
                (b'}', b']') => {
                    // `} ]`: the array closes; keep only the object brace.
                    self.pending.extend_from_slice(&self.line[..self.line.len() - 2]);
                    finished_pending = true;
                }
                (b'}', b'{') => {
                    // `}, {`: one record ends, the next begins.
                    self.pending.push(b'}');
                    finished_pending = true;
                }
                _ => {
                    // Interior of the current object.
                    self.pending.extend_from_slice(&self.line);
                    finished_pending = false;
                }
            }

            if finished_pending {
                self.commit_pending();
                if failure.is_none() && self.records_in_group == group_size {
                    return Ok(Some(self.flush_group()));
                }
            }
            if failure.is_some() {
                break;
            }
        }
        // The stream stopped. Deliver completed records first; the
        // remembered condition is reported on the next call.
        if self.records_in_group > 0 {
            return Ok(Some(self.flush_group()));
        }
        match &self.stream {
            StreamState::Done(Some(error)) => Err(error.clone()),
            _ => Ok(None),
        }
    }

    fn commit_pending(&mut self) {
        self.records_in_group += 1;
        self.group.extend_from_slice(&self.pending);
        self.group.push(b'\n');
        // The next record starts from a bare opening brace.
        self.pending.clear();
        self.pending.push(b'{');
    }

    fn flush_group(&mut self) -> RecordGroup {
        let count = self.records_in_group;
        self.records_in_group = 0;
        let bytes = mem::take(&mut self.group);
        debug!("flushed group of {count} json records");
        RecordGroup { bytes, count }
    }
}

/// A builder for configuring Apex-flavor JSON record reading.
pub struct JsonRecordReaderBuilder {
    capacity: usize,
    options: GroupOptions,
}

impl Default for JsonRecordReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRecordReaderBuilder {
    pub fn new() -> Self {
        Self {
            capacity: 8 * 1024,
            options: GroupOptions::default(),
        }
    }

    /// Sets the buffer capacity of the underlying line reader.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the max number of records per group; `0` keeps the default of 8.
    pub fn group_size(mut self, group_size: usize) -> Self {
        self.options.group_size = group_size;
        self
    }

    /// Applies a whole [`GroupOptions`] at once.
    pub fn options(mut self, options: GroupOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates a `JsonRecordReader` over any byte source.
    pub fn from_reader<R: Read>(self, rdr: R) -> JsonRecordReader<R> {
        let group_size = self.options.effective_group_size();
        JsonRecordReader {
            state: RefCell::new(JsonState {
                lines: BufReader::with_capacity(self.capacity, rdr),
                line: Vec::new(),
                pending: Vec::with_capacity(EXPECTED_RECORD_SIZE),
                group: Vec::with_capacity(EXPECTED_RECORD_SIZE * group_size),
                records_in_group: 0,
                stream: StreamState::Streaming,
            }),
            group_size,
        }
    }

    /// Creates a `JsonRecordReader` reading from a file.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be opened; failing to open the input is an
    /// initialization error, unlike the read errors reported through
    /// [`next_group`](crate::core::reader::RecordReader::next_group).
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> JsonRecordReader<File> {
        let file = File::open(path).expect("unable to open json input file");
        self.from_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reader::read_all;

    const STREAM: &str = "[ {\n  \"Id\" : \"ID1\"\n}, {\n  \"Id\" : \"ID3\"\n} ]";
    const EXPECTED: &[u8] = b"{  \"Id\" : \"ID1\"}\n{  \"Id\" : \"ID3\"}\n";

    #[test]
    fn empty_input_is_end_of_stream_at_once() {
        let reader = JsonRecordReaderBuilder::new().from_reader("".as_bytes());
        assert_eq!(reader.next_group(), Ok(None));
        assert_eq!(reader.next_group(), Ok(None));
    }

    #[test]
    fn objects_become_json_lines() {
        let (group, error) = read_all(&JsonRecordReaderBuilder::new().from_reader(STREAM.as_bytes()));
        assert_eq!(error, None);
        assert_eq!(group.count, 2);
        assert_eq!(group.bytes, EXPECTED);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let spaced = "[ {\n\n  \"Id\" : \"ID1\"\n\n}, {\n  \"Id\" : \"ID3\"\n} ]\n";
        let (group, error) =
            read_all(&JsonRecordReaderBuilder::new().from_reader(spaced.as_bytes()));
        assert_eq!(error, None);
        assert_eq!(group.count, 2);
        assert_eq!(group.bytes, EXPECTED);
    }

    #[test]
    fn crlf_terminated_lines_are_trimmed() {
        let crlf = STREAM.replace('\n', "\r\n");
        let (group, error) = read_all(&JsonRecordReaderBuilder::new().from_reader(crlf.as_bytes()));
        assert_eq!(error, None);
        assert_eq!(group.bytes, EXPECTED);
    }

    #[test]
    fn truncated_object_is_discarded_and_reported_once() {
        let truncated = "[ {\n  \"Id\" : \"ID1\"\n}, {\n  \"Id\" :";
        let reader = JsonRecordReaderBuilder::new().from_reader(truncated.as_bytes());
        let flushed = reader.next_group().unwrap().unwrap();
        assert_eq!(flushed.count, 1);
        assert_eq!(flushed.bytes, b"{  \"Id\" : \"ID1\"}\n");
        assert_eq!(reader.next_group(), Err(RecordError::IncompleteRecord));
        assert_eq!(reader.next_group(), Err(RecordError::IncompleteRecord));
    }

    #[test]
    fn tiny_line_buffer_still_reassembles_records() {
        let reader = JsonRecordReaderBuilder::new()
            .capacity(4)
            .from_reader(STREAM.as_bytes());
        let (group, error) = read_all(&reader);
        assert_eq!(error, None);
        assert_eq!(group.bytes, EXPECTED);
    }
}

#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 <div align="center">
   <h1>Record Grouper</h1>
   <h3>📦 Incremental record-boundary detection for bulk data uploads</h3>

   [![crate](https://img.shields.io/crates/v/record-grouper.svg)](https://crates.io/crates/record-grouper)
   [![docs](https://docs.rs/record-grouper/badge.svg)](https://docs.rs/record-grouper)
   ![license](https://shields.io/badge/license-MIT%2FApache--2.0-blue)

  </div>

 # Record Grouper

 `record-grouper` turns an arbitrary byte stream into discrete groups of
 complete CSV or JSON records, without ever materializing the whole stream in
 memory and without ever emitting a partial record. It exists to feed bulk
 upload pipelines: a batch submitted to a remote service must contain only
 well-formed records, because one truncated record poisons the whole batch.

 ## Core Concepts

 - **RecordGroup:** a batch of N complete, newline-terminated records
   concatenated into one owned byte buffer. Handed to the caller as an
   atomic, directly-submittable unit.
 - **RecordReader:** the pull contract. Each `next_group` call performs just
   the blocking reads needed to produce one group, report end of stream, or
   report a terminal error. Memory use is bounded by
   `group_size × record size`, not by stream size.
 - **GroupOptions:** the batching knob. Group size only controls how many
   records are flushed at a time; splitting a stream with group size 1 or
   1000 yields byte-identical concatenated output.
 - **read_all:** drains a reader into one composite group, stopping at the
   first terminal condition and keeping the valid prefix alongside any error.

 A reader never loses records silently. Whether the input had a malformed
 trailing row or the connection dropped mid-object, every record that
 completed before the failure is flushed before the error is reported, and
 the error kind tells the caller whether the input was malformed
 ([`RecordError::Parse`], [`RecordError::IncompleteRecord`]) or the source
 broke ([`RecordError::Source`]).

 ## Features

| **Feature** | **Description**                                            |
|-------------|------------------------------------------------------------|
| csv         | Enables the CSV record reader (pulls in the `csv` crate)   |
| json        | Enables the Apex-flavor pretty JSON record reader          |
| full        | Enables all available features                             |

 ## Getting Started

 Make sure you activated the suitable features on Cargo.toml:

```toml
[dependencies]
record-grouper = { version = "<version>", features = ["<full|csv|json>"] }
```

 Then drive a reader group by group:

```rust
use record_grouper::{
    core::reader::RecordReader,
    reader::csv::CsvRecordReaderBuilder,
    RecordError,
};

fn main() -> Result<(), RecordError> {
    let csv = "year,make,model\n1948,Porsche,356\n1995,Peugeot,205\n2021,Mazda,CX-30\n";

    let reader = CsvRecordReaderBuilder::new()
        .group_size(2)
        .from_reader(csv.as_bytes());

    let mut upload_buffer: Vec<u8> = Vec::new();
    let mut uploaded_records = 0;
    while let Some(group) = reader.next_group()? {
        // Each group is a self-contained batch of complete rows.
        upload_buffer.extend(group.bytes);
        uploaded_records += group.count;
    }

    assert_eq!(uploaded_records, 4);
    assert_eq!(upload_buffer, csv.as_bytes());
    Ok(())
}
```

 The JSON reader consumes the pretty-printed array layout one specific
 exporter produces (one key or brace per line) and re-emits every object as
 one JSON-Lines record; see
 [`JsonRecordReader`](crate::reader::json::JsonRecordReader) for the exact
 supported layout.

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.

 ## Contribution
 Unless you explicitly state otherwise, any contribution intentionally submitted
 for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
 dual licensed as above, without any additional terms or conditions

 */

/// Core types for record grouping: groups, options, the reader contract
pub mod core;

/// Error types for record readers
pub mod error;

#[doc(inline)]
pub use error::*;

/// Format-specific record readers (for example: csv and json readers)
pub mod reader;

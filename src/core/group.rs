/// Default number of records accumulated before a group is flushed.
pub const DEFAULT_GROUP_SIZE: usize = 8;

/// A complete chunk of records read from a reader.
///
/// `bytes` is the exact concatenation of `count` complete, newline-terminated
/// records, in input order. The group owns its buffer outright: it never
/// aliases reader-internal scratch memory, so the caller is free to mutate it,
/// hand it to an upload buffer, or drop it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordGroup {
    /// The bytes of all the records in the group.
    pub bytes: Vec<u8>,
    /// The number of records present in the bytes.
    pub count: usize,
}

impl RecordGroup {
    /// Returns `true` if the group holds no records.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends another group's records after this group's.
    pub fn extend(&mut self, other: RecordGroup) {
        self.count += other.count;
        self.bytes.extend(other.bytes);
    }
}

/// Batching configuration for record readers.
///
/// # Examples
///
/// ```
/// use record_grouper::core::group::{GroupOptions, DEFAULT_GROUP_SIZE};
///
/// assert_eq!(GroupOptions::default().group_size, DEFAULT_GROUP_SIZE);
/// assert_eq!(GroupOptions { group_size: 0 }.effective_group_size(), 8);
/// assert_eq!(GroupOptions { group_size: 3 }.effective_group_size(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupOptions {
    /// The max number of records in a [`RecordGroup`].
    /// Higher numbers will use more memory.
    pub group_size: usize,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
        }
    }
}

impl GroupOptions {
    /// The group size to batch with; zero falls back to
    /// [`DEFAULT_GROUP_SIZE`].
    pub fn effective_group_size(&self) -> usize {
        if self.group_size == 0 {
            DEFAULT_GROUP_SIZE
        } else {
            self.group_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_reports_empty() {
        assert!(RecordGroup::default().is_empty());
        let group = RecordGroup {
            bytes: b"a,b\n".to_vec(),
            count: 1,
        };
        assert!(!group.is_empty());
    }

    #[test]
    fn extend_concatenates_in_order() {
        let mut composite = RecordGroup {
            bytes: b"a\n".to_vec(),
            count: 1,
        };
        composite.extend(RecordGroup {
            bytes: b"b\nc\n".to_vec(),
            count: 2,
        });
        assert_eq!(composite.bytes, b"a\nb\nc\n");
        assert_eq!(composite.count, 3);
    }

    #[test]
    fn zero_group_size_falls_back_to_default() {
        let options = GroupOptions { group_size: 0 };
        assert_eq!(options.effective_group_size(), DEFAULT_GROUP_SIZE);
    }
}

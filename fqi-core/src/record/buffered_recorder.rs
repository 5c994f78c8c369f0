use super::{Record, Recorder};

/// Buffered recorder.
///
/// Keeps every written record in memory, e.g. to inspect the sequence of
/// per-iteration records after training.
#[derive(Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
    n_flushes: usize,
}

impl BufferedRecorder {
    /// Construct the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.buf.iter()
    }

    /// Returns the number of records in the buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if no record has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns how many times [`Recorder::flush`] was called.
    pub fn n_flushes(&self) -> usize {
        self.n_flushes
    }
}

impl Recorder for BufferedRecorder {
    /// Write a [`Record`] to the buffer.
    fn write(&mut self, record: Record) {
        self.buf.push(record);
    }

    fn flush(&mut self, _iteration: i64) {
        self.n_flushes += 1;
    }
}

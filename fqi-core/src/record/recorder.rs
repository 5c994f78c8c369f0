use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);

    /// Flushes buffered records, if any.
    ///
    /// `iteration` is the number of iterations done so far.
    fn flush(&mut self, _iteration: i64) {}
}

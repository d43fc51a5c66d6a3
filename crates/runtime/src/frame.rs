/// Metadata for one display refresh.
///
/// `timestamp_ms` is the host's high-resolution frame timestamp; only
/// differences between timestamps are meaningful.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Host timestamp at the start of the frame (milliseconds).
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(index: u64, timestamp_ms: f64) -> Self {
        Self {
            index,
            timestamp_ms,
        }
    }

    /// Frame at a fixed `dt_ms` after this one.
    pub fn next(self, dt_ms: f64) -> Self {
        Self::new(self.index + 1, self.timestamp_ms + dt_ms)
    }
}

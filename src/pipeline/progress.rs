//! Progress reporting seam between the pipeline and its caller.

/// Observer the driver notifies as a stage advances. The CLI hooks a
/// progress bar in here; tests and library callers use [`NullProgress`].
pub trait Progress: Send + Sync {
    fn begin_stage(&self, stage: &str, total: Option<u64>);
    fn advance(&self, records: u64);
    fn end_stage(&self, stage: &str);
}

/// Discards all notifications.
pub struct NullProgress;

impl Progress for NullProgress {
    fn begin_stage(&self, _stage: &str, _total: Option<u64>) {}
    fn advance(&self, _records: u64) {}
    fn end_stage(&self, _stage: &str) {}
}

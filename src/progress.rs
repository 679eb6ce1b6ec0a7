use indicatif::ProgressBar;

/// Receives best-effort notifications while an image is written
pub trait ProgressSink {
    /// Called once before the first chunk with the image length
    fn begin(&mut self, _total_bytes: usize) {}

    /// Called after each acknowledged chunk with the bytes written so far
    fn advance(&mut self, written: usize);

    /// Called once after the last chunk was acknowledged
    fn finish(&mut self) {}
}

/// Discards all notifications
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&mut self, _written: usize) {}
}

impl ProgressSink for ProgressBar {
    fn begin(&mut self, total_bytes: usize) {
        self.set_length(total_bytes as u64);
        self.set_position(0);
    }

    fn advance(&mut self, written: usize) {
        self.set_position(written as u64);
    }

    fn finish(&mut self) {
        self.finish_with_message("Done");
    }
}

/// Advisory progress reporting. Both coders call `start` with the number of
/// vertex emissions, `tick` once per emitted vertex, and `end` when the
/// attribute pass finishes. Implementations cannot abort the codec.
pub trait Progress {
    fn start(&mut self, total: usize);
    fn tick(&mut self, i: usize);
    fn end(&mut self);
}

/// Progress sink that discards all reports.
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _total: usize) {}
    fn tick(&mut self, _i: usize) {}
    fn end(&mut self) {}
}

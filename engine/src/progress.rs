//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which decouples the copy
//! engine from whatever drives it (a terminal, a display loop on another
//! thread, a test).
//!
//! Cancellation goes through the same object: the engine asks `should_stop`
//! at the top of every iteration, before it makes any decision about the
//! next file. A file that has started is always finished.

/// Trait for receiving progress updates from a copy run.
///
/// All methods are called synchronously on the thread running the engine.
pub trait ProgressCallback: Send {
    /// Called once after enumeration, with the number of files to process.
    fn on_run_started(&self, _total: usize) {}

    /// Called after each file, success or failure.
    ///
    /// `index` counts from 1; `total` is the number of files in this run.
    fn on_file_processed(&self, index: usize, total: usize);

    /// Polled before each file. Returning true ends the run early.
    fn should_stop(&self) -> bool {
        false
    }
}

impl<F> ProgressCallback for F
where
    F: Fn(usize, usize) + Send,
{
    fn on_file_processed(&self, index: usize, total: usize) {
        self(index, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_is_a_callback() {
        let calls = Mutex::new(Vec::new());
        let callback = |i: usize, t: usize| calls.lock().unwrap().push((i, t));

        let dyn_callback: &dyn ProgressCallback = &callback;
        dyn_callback.on_run_started(2);
        dyn_callback.on_file_processed(1, 2);
        dyn_callback.on_file_processed(2, 2);

        assert!(!dyn_callback.should_stop());
        assert_eq!(*calls.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }
}

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A single cancellable delayed action.
///
/// Scheduling again replaces the pending action; dropping the task cancels it.
#[derive(Debug, Default)]
pub struct DebouncedTask {
    handle: Option<JoinHandle<()>>,
}

impl DebouncedTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&mut self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// Returns true if an action was still waiting to run.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for DebouncedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

use std::future::Future;
use std::io;
use std::thread::JoinHandle;

use tokio_util::sync::CancellationToken;

/// A dedicated OS thread driving a single-threaded tokio runtime.
///
/// The task receives a cancellation token; `shutdown` cancels it and joins
/// the thread. Dropping the handle does the same.
#[derive(Debug)]
pub struct NetworkThread {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl NetworkThread {
    pub fn spawn<F, Fut>(name: &str, task: F) -> io::Result<Self>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let thread_name = name.to_string();

        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                runtime.block_on(task(task_cancel));
                log::debug!("Network thread '{}' finished", thread_name);
            })?;

        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Network thread panicked");
            }
        }
    }
}

impl Drop for NetworkThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

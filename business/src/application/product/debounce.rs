use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default quiescence window for the filter input.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Trailing-edge debouncer.
///
/// Values pushed within `window` of each other collapse into one output
/// carrying the latest value; the timer restarts on every push. After
/// [`cancel`](Self::cancel) (or drop) nothing is emitted anymore, including
/// a value that was still waiting for its window to elapse.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    output: Arc<Mutex<Option<mpsc::UnboundedSender<T>>>>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input, mut inbox) = mpsc::unbounded_channel::<T>();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let output = Arc::new(Mutex::new(Some(out_tx)));

        let task_output = output.clone();
        let task = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                match pending.take() {
                    None => match inbox.recv().await {
                        Some(value) => pending = Some(value),
                        None => return,
                    },
                    Some(value) => {
                        tokio::select! {
                            next = inbox.recv() => match next {
                                Some(newer) => pending = Some(newer),
                                None => return,
                            },
                            _ = tokio::time::sleep(window) => {
                                let guard = task_output.lock().unwrap_or_else(PoisonError::into_inner);
                                let delivered = match guard.as_ref() {
                                    Some(sender) => sender.send(value).is_ok(),
                                    None => false,
                                };
                                if !delivered {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });

        (
            Self {
                input,
                output,
                task,
            },
            out_rx,
        )
    }

    pub fn push(&self, value: T) {
        let _ = self.input.send(value);
    }

    /// Discards any pending value and closes the output. Idempotent.
    pub fn cancel(&self) {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.task.abort();
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.task.abort();
    }
}

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::cancel::CancelReason;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("coroutine faulted: {0}")]
    Faulted(#[source] anyhow::Error),
    #[error("coroutine was cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("coroutine finished without a result value as its last step")]
    MissingResult,
    #[error("coroutine was dropped before it completed")]
    Abandoned,
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled(_))
    }
    pub fn fault(&self) -> Option<&anyhow::Error> {
        match self {
            TaskError::Faulted(e) => Some(e),
            _ => None,
        }
    }
}

pub type Outcome<T> = Result<T, TaskError>;

/// Single-assignment result slot shared by every frame of one coroutine tree.
///
/// The first `set_*` call wins and later ones return `false` without touching
/// the stored outcome. Dropping every clone unresolved wakes the handle with
/// [`TaskError::Abandoned`].
pub struct CompletionCell<T>(Rc<RefCell<Option<oneshot::Sender<Outcome<T>>>>>);

impl<T> Clone for CompletionCell<T> {
    fn clone(&self) -> Self {
        CompletionCell(Rc::clone(&self.0))
    }
}

impl<T> CompletionCell<T> {
    pub fn new() -> (Self, TaskHandle<T>) {
        let (tx, rx) = oneshot::channel();
        (CompletionCell(Rc::new(RefCell::new(Some(tx)))), TaskHandle { rx: Some(rx), ready: None })
    }

    pub fn is_resolved(&self) -> bool {
        self.0.borrow().is_none()
    }

    pub fn set_value(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }
    pub fn set_fault(&self, fault: anyhow::Error) -> bool {
        self.resolve(Err(TaskError::Faulted(fault)))
    }
    pub fn set_cancelled(&self, reason: CancelReason) -> bool {
        self.resolve(Err(TaskError::Cancelled(reason)))
    }

    pub fn resolve(&self, outcome: Outcome<T>) -> bool {
        let sender = self.0.borrow_mut().take();
        match sender {
            Some(tx) => {
                // Handle may already be gone; the cell still counts as resolved.
                tx.send(outcome).ok();
                true
            },
            None => false,
        }
    }
}

/// Awaitable side of a [`CompletionCell`].
#[must_use]
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: Option<oneshot::Receiver<Outcome<T>>>,
    ready: Option<Outcome<T>>,
}

// Neither field is ever pinned.
impl<T> Unpin for TaskHandle<T> {}

impl<T> TaskHandle<T> {
    /// Handle that is already resolved, used when a task can't even be started.
    pub fn resolved(outcome: Outcome<T>) -> Self {
        TaskHandle { rx: None, ready: Some(outcome) }
    }

    fn fetch(&mut self) {
        let Some(rx) = self.rx.as_mut() else { return };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => Err(TaskError::Abandoned),
        };
        self.rx = None;
        self.ready = Some(outcome);
    }

    /// True once the outcome is available (or has already been taken).
    pub fn is_resolved(&mut self) -> bool {
        self.fetch();
        self.rx.is_none()
    }

    /// Takes the outcome if it is already available, without waiting.
    ///
    /// Returns `None` while pending. Once an outcome is returned, the handle
    /// is spent and must not be polled again.
    pub fn try_outcome(&mut self) -> Option<Outcome<T>> {
        self.fetch();
        self.ready.take()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Outcome<T>;
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.ready.take() {
            return Poll::Ready(outcome);
        }
        let Some(rx) = self.rx.as_mut() else {
            panic!("TaskHandle polled after its outcome was taken");
        };
        let res = match Pin::new(rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(_)) => Err(TaskError::Abandoned),
        };
        self.rx = None;
        Poll::Ready(res)
    }
}

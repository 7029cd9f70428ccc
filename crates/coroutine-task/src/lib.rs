//! Await the result of a step-driven coroutine.
//!
//! A host (game loop, tick scheduler, ...) pumps [`StepProducer`]s once per
//! tick. [`drive_to_completion`] wraps a [`StepSequence`] in a [`StepDriver`],
//! registers it with the host, and hands back a [`TaskHandle`] that resolves
//! exactly once: with the last value the root sequence produced, with the
//! fault raised at any nesting depth, or as cancelled.

#[allow(unused)]
#[macro_use]
extern crate tracing;

use std::panic::{catch_unwind, AssertUnwindSafe};

pub mod cancel;
pub mod completion;
pub mod driver;
pub mod routine;
pub mod sequence;
pub mod step;

pub use cancel::{CancelReason, CancelSignal};
pub use completion::{CompletionCell, Outcome, TaskError, TaskHandle};
pub use driver::{Interrupt, StepDriver};
pub use routine::{routine, Routine, Yielder};
pub use step::{HostStep, Scheduler, Step, StepProducer, StepSequence};

/// Start driving `root` on `scheduler` and return a handle to its outcome.
///
/// Never blocks. If the scheduler refuses the driver, the handle comes back
/// already resolved with [`TaskError::Faulted`].
pub fn drive_to_completion<D, T, S, Q>(
    scheduler: &mut S,
    root: Q,
    cancel: Option<CancelSignal>,
) -> TaskHandle<T>
    where S: Scheduler<D> + ?Sized,
        Q: StepSequence<D, T> + 'static,
        D: 'static,
        T: 'static,
{
    let (cell, handle) = CompletionCell::new();
    let interrupt = Interrupt::new();
    let driver = StepDriver::root(Box::new(root), interrupt.clone(), cell.clone(), cancel);

    let registered = catch_unwind(AssertUnwindSafe(|| scheduler.register(Box::new(driver))));
    let fault = match registered {
        Ok(Ok(())) => return handle,
        Ok(Err(e)) => anyhow::Error::new(e).context("failed to register coroutine"),
        Err(_) => anyhow::anyhow!("scheduler panicked while registering coroutine"),
    };
    warn!("{fault:#}");
    interrupt.set();
    cell.set_fault(fault);
    handle
}

/// Start-a-task calls on any [`Scheduler`].
pub trait StartTaskExt<D>: Scheduler<D> {
    fn start_task<T, Q>(&mut self, root: Q) -> TaskHandle<T>
        where Q: StepSequence<D, T> + 'static, D: 'static, T: 'static,
    {
        drive_to_completion(self, root, None)
    }

    fn start_task_with_cancel<T, Q>(&mut self, root: Q, cancel: CancelSignal) -> TaskHandle<T>
        where Q: StepSequence<D, T> + 'static, D: 'static, T: 'static,
    {
        drive_to_completion(self, root, Some(cancel))
    }
}

impl<D, S> StartTaskExt<D> for S where S: Scheduler<D> + ?Sized {}

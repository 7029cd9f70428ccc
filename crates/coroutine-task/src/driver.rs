use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::cancel::CancelSignal;
use crate::completion::{CompletionCell, TaskError};
use crate::step::{HostStep, Step, StepProducer, StepSequence};

/// Halt flag shared by every frame of one coroutine tree.
///
/// Only ever goes from unset to set. Once set, no frame advances its
/// sequence or touches the completion cell.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Rc<Cell<bool>>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_set(&self) -> bool {
        self.0.get()
    }
    /// Sets the flag, returning `true` if this call was the one that set it.
    pub fn set(&self) -> bool {
        !self.0.replace(true)
    }
}

/// State shared across the recursion depth of one tree.
struct Shared<T> {
    interrupt: Interrupt,
    cell: CompletionCell<T>,
    cancel: Option<CancelSignal>,
}

/// Drives a [`StepSequence`] one step per pump, resolving the shared
/// [`CompletionCell`] when the tree finishes, faults, or is cancelled.
///
/// Nested sequences are handed back to the host wrapped in their own driver
/// one level deeper, so the host's plain pump loop descends into them.
pub struct StepDriver<D, T> {
    sequence: Box<dyn StepSequence<D, T>>,
    shared: Rc<Shared<T>>,
    level: usize,
    last: Option<T>,
}

impl<D: 'static, T: 'static> StepDriver<D, T> {
    pub fn root(
        sequence: Box<dyn StepSequence<D, T>>,
        interrupt: Interrupt,
        cell: CompletionCell<T>,
        cancel: Option<CancelSignal>,
    ) -> Self {
        StepDriver {
            sequence,
            shared: Rc::new(Shared { interrupt, cell, cancel }),
            level: 0,
            last: None,
        }
    }

    fn nested(&self, sequence: Box<dyn StepSequence<D, T>>) -> Self {
        StepDriver {
            sequence,
            shared: Rc::clone(&self.shared),
            level: self.level + 1,
            last: None,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    fn advance(&mut self) -> Result<Option<Step<D, T>>, anyhow::Error> {
        let sequence = &mut self.sequence;
        catch_unwind(AssertUnwindSafe(|| sequence.advance()))
            .unwrap_or_else(|payload| Err(panic_fault(payload)))
    }

    fn finish(&mut self) {
        // Nested exhaustion resolves nothing; only the root reports a result.
        if self.level != 0 || !self.shared.interrupt.set() {
            return;
        }
        // A pending cancellation still wins over a natural finish.
        if let Some(reason) = self.shared.cancel.as_ref().and_then(CancelSignal::reason) {
            debug!("coroutine cancelled at exhaustion: {reason}");
            self.shared.cell.set_cancelled(reason);
            return;
        }
        match self.last.take() {
            Some(value) => {
                debug!("coroutine completed");
                self.shared.cell.set_value(value);
            },
            None => {
                debug!("coroutine completed without a result value");
                self.shared.cell.resolve(Err(TaskError::MissingResult));
            },
        }
    }
}

impl<D: 'static, T: 'static> StepProducer<D> for StepDriver<D, T> {
    fn pump(&mut self) -> Option<HostStep<D>> {
        if self.shared.interrupt.is_set() {
            return None;
        }

        let step = match self.advance() {
            Ok(Some(step)) => step,
            Ok(None) => {
                trace!(level = self.level, "sequence exhausted");
                self.finish();
                return None;
            },
            Err(fault) => {
                debug!(level = self.level, "coroutine faulted: {fault:#}");
                self.shared.interrupt.set();
                self.shared.cell.set_fault(fault);
                return None;
            },
        };

        if let Some(reason) = self.shared.cancel.as_ref().and_then(CancelSignal::reason) {
            debug!(level = self.level, "coroutine cancelled: {reason}");
            self.shared.interrupt.set();
            self.shared.cell.set_cancelled(reason);
            return None;
        }

        Some(match step {
            Step::Nested(sequence) => {
                self.last = None;
                trace!(level = self.level, "descending into nested sequence");
                HostStep::Nested(Box::new(self.nested(sequence)))
            },
            Step::Directive(directive) => {
                self.last = None;
                HostStep::Directive(directive)
            },
            Step::Value(value) => {
                self.last = Some(value);
                HostStep::Frame
            },
        })
    }
}

fn panic_fault(payload: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    let msg = payload.downcast_ref::<&str>().map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into());
    anyhow::anyhow!("step panicked: {msg}")
}


use corosensei::{Coroutine, CoroutineResult};

use crate::step::{Step, StepSequence};

/// Write a step sequence as straight-line code.
///
/// The body runs on its own stack and is suspended at every yield, so
/// control flow between steps is ordinary Rust. Returning `Err` faults the
/// sequence; returning `Ok(())` exhausts it.
///
/// ```ignore
/// let seq = routine(|y| {
///     y.wait(Wait::For(Duration::from_secs(1)));
///     y.nested(other_routine());
///     y.value(51);
///     Ok(())
/// });
/// ```
#[must_use]
pub fn routine<D, T, F>(f: F) -> Routine<D, T>
    where F: FnOnce(&Yielder<'_, D, T>) -> Result<(), anyhow::Error> + 'static,
        D: 'static,
        T: 'static,
{
    let coroutine = Coroutine::new(move |yielder, ()| {
        f(&Yielder { inner: yielder })
    });
    Routine { coroutine }
}

pub struct Routine<D: 'static, T: 'static> {
    coroutine: Coroutine<(), Step<D, T>, Result<(), anyhow::Error>>,
}

impl<D: 'static, T: 'static> StepSequence<D, T> for Routine<D, T> {
    fn advance(&mut self) -> Result<Option<Step<D, T>>, anyhow::Error> {
        if self.coroutine.done() {
            return Ok(None);
        }
        match self.coroutine.resume(()) {
            CoroutineResult::Yield(step) => Ok(Some(step)),
            CoroutineResult::Return(res) => res.map(|()| None),
        }
    }
}

/// Handed to a [`routine`] body to produce steps.
pub struct Yielder<'a, D, T> {
    inner: &'a corosensei::Yielder<(), Step<D, T>>,
}

impl<D, T> Yielder<'_, D, T> {
    pub fn step(&self, step: Step<D, T>) {
        self.inner.suspend(step)
    }
    pub fn value(&self, value: T) {
        self.step(Step::Value(value))
    }
    pub fn wait(&self, directive: D) {
        self.step(Step::Directive(directive))
    }
    pub fn nested(&self, sequence: impl StepSequence<D, T> + 'static) {
        self.step(Step::Nested(Box::new(sequence)))
    }
}

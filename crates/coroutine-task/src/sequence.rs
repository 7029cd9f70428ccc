//! Adapters for building step sequences out of iterators and closures.

use crate::step::{Step, StepSequence};

pub struct FromFn<F>(F);

/// Sequence that calls `f` once per advance.
pub fn from_fn<D, T, F>(f: F) -> FromFn<F>
    where F: FnMut() -> Result<Option<Step<D, T>>, anyhow::Error>
{
    FromFn(f)
}

impl<D, T, F> StepSequence<D, T> for FromFn<F>
    where F: FnMut() -> Result<Option<Step<D, T>>, anyhow::Error>
{
    fn advance(&mut self) -> Result<Option<Step<D, T>>, anyhow::Error> {
        (self.0)()
    }
}

pub struct FromIter<I>(I);

/// Infallible sequence over the steps of an iterator.
pub fn from_iter<D, T, I>(iter: I) -> FromIter<I::IntoIter>
    where I: IntoIterator<Item = Step<D, T>>
{
    FromIter(iter.into_iter())
}

impl<D, T, I> StepSequence<D, T> for FromIter<I> where I: Iterator<Item = Step<D, T>> {
    fn advance(&mut self) -> Result<Option<Step<D, T>>, anyhow::Error> {
        Ok(self.0.next())
    }
}

pub struct TryFromIter<I> {
    iter: I,
    failed: bool,
}

/// Sequence over an iterator of fallible steps. The first `Err` is the fault;
/// nothing after it is pulled.
pub fn try_from_iter<D, T, E, I>(iter: I) -> TryFromIter<I::IntoIter>
    where I: IntoIterator<Item = Result<Step<D, T>, E>>,
        E: Into<anyhow::Error>,
{
    TryFromIter { iter: iter.into_iter(), failed: false }
}

impl<D, T, E, I> StepSequence<D, T> for TryFromIter<I>
    where I: Iterator<Item = Result<Step<D, T>, E>>,
        E: Into<anyhow::Error>,
{
    fn advance(&mut self) -> Result<Option<Step<D, T>>, anyhow::Error> {
        if self.failed {
            return Ok(None);
        }
        match self.iter.next().transpose() {
            Err(e) => {
                self.failed = true;
                Err(e.into())
            },
            res => res.map_err(Into::into),
        }
    }
}

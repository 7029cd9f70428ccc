
/// One value produced by a [`StepSequence`].
///
/// Only `Nested` gets special treatment from the driver. Directives are handed
/// to the host as-is, and values are remembered as the candidate result.
pub enum Step<D, T> {
    Nested(Box<dyn StepSequence<D, T>>),
    Directive(D),
    Value(T),
}

impl<D, T> Step<D, T> {
    pub fn nested(sequence: impl StepSequence<D, T> + 'static) -> Self {
        Step::Nested(Box::new(sequence))
    }
}

impl<D, T> std::fmt::Debug for Step<D, T> where D: std::fmt::Debug, T: std::fmt::Debug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Nested(_) => f.write_str("Nested(..)"),
            Step::Directive(d) => f.debug_tuple("Directive").field(d).finish(),
            Step::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// A coroutine body that is advanced one step at a time.
///
/// `Ok(Some(_))` is the new current step, `Ok(None)` means the sequence is
/// exhausted, and `Err(_)` is a fault. Sequences are never rewound.
pub trait StepSequence<D, T> {
    fn advance(&mut self) -> Result<Option<Step<D, T>>, anyhow::Error>;
}

impl<D, T, S> StepSequence<D, T> for Box<S> where S: StepSequence<D, T> + ?Sized {
    fn advance(&mut self) -> Result<Option<Step<D, T>>, anyhow::Error> {
        (**self).advance()
    }
}

/// What the host scheduler sees after pumping a producer.
pub enum HostStep<D> {
    /// Resume on the next tick.
    Frame,
    /// Host-specific wait, passed through untouched.
    Directive(D),
    /// Pump this producer until it finishes, then resume the current one.
    Nested(Box<dyn StepProducer<D>>),
}

impl<D> std::fmt::Debug for HostStep<D> where D: std::fmt::Debug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostStep::Frame => f.write_str("Frame"),
            HostStep::Directive(d) => f.debug_tuple("Directive").field(d).finish(),
            HostStep::Nested(_) => f.write_str("Nested(..)"),
        }
    }
}

/// Anything the host can pump once per tick. `None` means finished.
pub trait StepProducer<D> {
    fn pump(&mut self) -> Option<HostStep<D>>;
}

/// The one call a host has to provide: accept a producer for per-tick pumping.
pub trait Scheduler<D> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn register(&mut self, producer: Box<dyn StepProducer<D>>) -> Result<(), Self::Error>;
}

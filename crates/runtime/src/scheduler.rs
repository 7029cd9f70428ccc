use std::time::Duration;

use coroutine_task::{HostStep, Scheduler, StepProducer};

/// How long a routine has been parked on its current directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Waited {
    pub frames: u64,
    pub time: Duration,
}

/// A host-side wait condition yielded by a coroutine.
pub trait Directive {
    fn is_ready(&mut self, waited: &Waited) -> bool;
}

/// The built-in waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    NextFrame,
    Frames(u64),
    For(Duration),
}

impl Directive for Wait {
    fn is_ready(&mut self, waited: &Waited) -> bool {
        match *self {
            Wait::NextFrame => waited.frames >= 1,
            Wait::Frames(n) => waited.frames >= n,
            Wait::For(d) => waited.time >= d,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Interval between ticks in [`crate::run`].
    pub tick_interval: Duration,
    /// Maximum number of live routines, `None` for unbounded.
    pub max_routines: Option<usize>,
    /// Stop [`crate::run`] once no routines are left.
    pub exit_when_idle: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        TickConfig {
            tick_interval: Duration::from_millis(16),
            max_routines: None,
            exit_when_idle: true,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Scheduler is closed")]
    Closed,
    #[error("Scheduler is full ({} routines)", .0)]
    Full(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutineId(u64);

struct Parked<D> {
    directive: D,
    since_frame: u64,
    since_time: Duration,
}

struct Routine<D> {
    id: RoutineId,
    stack: Vec<Box<dyn StepProducer<D>>>,
    parked: Option<Parked<D>>,
}

/// Reference host: pumps each registered routine once per tick.
///
/// A routine is a stack of producers. Nested producers are pushed and pumped
/// in the same tick; a finished producer is popped and its parent resumed in
/// the same tick. `Frame` parks the routine until the next tick, a directive
/// parks it until the directive reports ready.
pub struct TickScheduler<D> {
    routines: Vec<Routine<D>>,
    frame: u64,
    time: Duration,
    next_id: u64,
    max_routines: Option<usize>,
    closed: bool,
}

impl<D: Directive> TickScheduler<D> {
    pub fn new(config: &TickConfig) -> Self {
        TickScheduler {
            routines: Vec::new(),
            frame: 0,
            time: Duration::ZERO,
            next_id: 0,
            max_routines: config.max_routines,
            closed: false,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
    pub fn elapsed(&self) -> Duration {
        self.time
    }
    pub fn len(&self) -> usize {
        self.routines.len()
    }
    pub fn is_idle(&self) -> bool {
        self.routines.is_empty()
    }

    /// Refuse new routines from now on. Running ones keep going.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Drop every routine without pumping it further.
    pub fn clear(&mut self) {
        if !self.routines.is_empty() {
            debug!("dropping {} unfinished routines", self.routines.len());
        }
        self.routines.clear();
    }

    pub fn spawn(&mut self, producer: Box<dyn StepProducer<D>>) -> Result<RoutineId, ScheduleError> {
        if self.closed {
            return Err(ScheduleError::Closed);
        }
        if let Some(max) = self.max_routines {
            if self.routines.len() >= max {
                return Err(ScheduleError::Full(max));
            }
        }
        let id = RoutineId(self.next_id);
        self.next_id += 1;
        self.routines.push(Routine {
            id,
            stack: vec![producer],
            parked: None,
        });
        trace!(routine = id.0, "routine registered");
        Ok(id)
    }

    /// Advance the clock by `dt` and pump every routine that is ready.
    /// Returns the number of routines still alive.
    pub fn tick(&mut self, dt: Duration) -> usize {
        self.frame += 1;
        self.time += dt;
        let (frame, time) = (self.frame, self.time);

        self.routines.retain_mut(|routine| {
            if let Some(parked) = &mut routine.parked {
                let waited = Waited {
                    frames: frame - parked.since_frame,
                    time: time - parked.since_time,
                };
                if !parked.directive.is_ready(&waited) {
                    return true;
                }
                routine.parked = None;
            }
            let alive = resume(routine, frame, time);
            if !alive {
                trace!(routine = routine.id.0, "routine finished");
            }
            alive
        });
        self.routines.len()
    }

    /// Tick with a fixed `dt` until idle or `max_ticks` have run.
    /// Returns the number of ticks run.
    pub fn run_until_idle(&mut self, dt: Duration, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while !self.is_idle() && ticks < max_ticks {
            self.tick(dt);
            ticks += 1;
        }
        ticks
    }
}

/// Pump the routine until it parks or finishes. Returns whether it is alive.
fn resume<D>(routine: &mut Routine<D>, frame: u64, time: Duration) -> bool {
    while let Some(top) = routine.stack.last_mut() {
        match top.pump() {
            None => { routine.stack.pop(); },
            Some(HostStep::Nested(child)) => routine.stack.push(child),
            Some(HostStep::Frame) => return true,
            Some(HostStep::Directive(directive)) => {
                routine.parked = Some(Parked {
                    directive,
                    since_frame: frame,
                    since_time: time,
                });
                return true;
            },
        }
    }
    false
}

impl<D: Directive> Scheduler<D> for TickScheduler<D> {
    type Error = ScheduleError;

    fn register(&mut self, producer: Box<dyn StepProducer<D>>) -> Result<(), ScheduleError> {
        self.spawn(producer).map(|_| ())
    }
}

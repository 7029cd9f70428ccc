#[allow(unused)]
#[macro_use]
extern crate tracing;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

pub mod log;
pub mod scheduler;
pub mod utils;

pub use scheduler::{Directive, RoutineId, ScheduleError, TickConfig, TickScheduler, Wait, Waited};


struct RunHandleInner {
    shutdown_channel: (flume::Sender<()>, flume::Receiver<()>),
}

/// Lets other parts of the program stop a running [`run`] loop.
#[derive(Clone)]
pub struct RunHandle(std::sync::Arc<RunHandleInner>);
impl RunHandle {
    pub fn new() -> Self {
        RunHandle(std::sync::Arc::new(RunHandleInner {
            shutdown_channel: flume::unbounded(),
        }))
    }
    pub fn signal_shutdown(&self) {
        self.0.shutdown_channel.0.send(()).ok();
    }
}
impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// No routines left.
    Idle,
    /// The cancellation token fired.
    Cancelled,
    /// A signal or shutdown request.
    Shutdown(&'static str),
}

/// Tick `scheduler` on a timer until it goes idle or is told to stop.
///
/// Each tick passes the real time since the previous one. Routines that are
/// still alive on exit are left in the scheduler.
#[tracing::instrument(skip_all)]
pub async fn run<D: Directive>(
    handle: RunHandle,
    scheduler: &mut TickScheduler<D>,
    config: &TickConfig,
    cancel: CancellationToken,
) -> Result<RunExit, std::io::Error> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let shutdown_rx = &handle.0.shutdown_channel.1;

    let mut interval = tokio::time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_tick = tokio::time::Instant::now();

    enum Action {
        Exit(RunExit),
        Tick(tokio::time::Instant),
    }

    let exit = loop {
        if config.exit_when_idle && scheduler.is_idle() {
            break RunExit::Idle;
        }

        let action = tokio::select! {
            // Signal handlers
            _ = sigint.recv()  => Action::Exit(RunExit::Shutdown("Received SIGINT")),
            _ = sigterm.recv() => Action::Exit(RunExit::Shutdown("Received SIGTERM")),

            // Requests through RunHandle
            _ = shutdown_rx.recv_async() => Action::Exit(RunExit::Shutdown("Received shutdown request")),
            _ = cancel.cancelled() => Action::Exit(RunExit::Cancelled),

            now = interval.tick() => Action::Tick(now),
        };

        match action {
            Action::Tick(now) => {
                scheduler.tick(now.saturating_duration_since(last_tick));
                last_tick = now;
            },
            Action::Exit(exit) => break exit,
        }
    };

    match exit {
        RunExit::Idle => info!("all routines finished after {} frames", scheduler.frame()),
        RunExit::Cancelled => warn!("run cancelled with {} routines alive", scheduler.len()),
        RunExit::Shutdown(msg) => warn!("{msg}, stopping with {} routines alive", scheduler.len()),
    }

    Ok(exit)
}

pub async fn cancellable<F, T>(cancel: &tokio_util::sync::CancellationToken, f: F) -> Option<T>
    where F: std::future::Future<Output = T>
{
    tokio::select! {
        v = f => Some(v),
        _ = cancel.cancelled() => None,
    }
}
